//! Per-status handler table
//!
//! Every fetch outcome, cached or not, is dispatched to exactly one handler:
//! the one registered for its status code, else the default handler.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// One fetch outcome as seen by a handler
#[derive(Debug, Clone, Copy)]
pub struct Visit<'a> {
    /// Page the link was found on (`"start"` for the root URL)
    pub linked_from: &'a str,
    /// Normalized URL that was visited
    pub url: &'a str,
    pub status: u16,
    /// Page body; empty for cached visits and for pages whose body was withheld
    pub body: &'a str,
    /// True when the status came from the visited store instead of a fetch
    pub cached: bool,
}

pub type Handler = Arc<dyn Fn(&Visit<'_>) + Send + Sync>;

#[derive(Clone, Default)]
pub struct HandlerRegistry {
    default: Option<Handler>,
    by_status: HashMap<u16, Handler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the handler for statuses without their own. Replaces any previous one.
    pub fn set_default<F>(&mut self, handler: F)
    where
        F: Fn(&Visit<'_>) + Send + Sync + 'static,
    {
        self.default = Some(Arc::new(handler));
    }

    /// Set the handler for one status. Replaces any previous one.
    pub fn set<F>(&mut self, status: u16, handler: F)
    where
        F: Fn(&Visit<'_>) + Send + Sync + 'static,
    {
        self.by_status.insert(status, Arc::new(handler));
    }

    pub fn is_empty(&self) -> bool {
        self.default.is_none() && self.by_status.is_empty()
    }

    /// Run the matching handler. Returns false if none matched.
    pub fn dispatch(&self, visit: &Visit<'_>) -> bool {
        match self.by_status.get(&visit.status).or(self.default.as_ref()) {
            Some(handler) => {
                handler(visit);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut statuses: Vec<_> = self.by_status.keys().copied().collect();
        statuses.sort_unstable();
        f.debug_struct("HandlerRegistry")
            .field("default", &self.default.is_some())
            .field("statuses", &statuses)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn visit(status: u16) -> Visit<'static> {
        Visit {
            linked_from: "start",
            url: "http://x.test/",
            status,
            body: "",
            cached: false,
        }
    }

    #[test]
    fn test_status_handler_wins_over_default() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HandlerRegistry::new();

        let log = Arc::clone(&seen);
        registry.set_default(move |v| log.lock().unwrap().push(("default", v.status)));
        let log = Arc::clone(&seen);
        registry.set(404, move |v| log.lock().unwrap().push(("404", v.status)));

        assert!(registry.dispatch(&visit(200)));
        assert!(registry.dispatch(&visit(404)));

        assert_eq!(*seen.lock().unwrap(), vec![("default", 200), ("404", 404)]);
    }

    #[test]
    fn test_later_registration_replaces_earlier() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HandlerRegistry::new();

        let log = Arc::clone(&seen);
        registry.set(200, move |_| log.lock().unwrap().push("first"));
        let log = Arc::clone(&seen);
        registry.set(200, move |_| log.lock().unwrap().push("second"));

        registry.dispatch(&visit(200));
        assert_eq!(*seen.lock().unwrap(), vec!["second"]);
    }

    #[test]
    fn test_unmatched_status_without_default() {
        let mut registry = HandlerRegistry::new();
        assert!(registry.is_empty());

        registry.set(200, |_| {});
        assert!(!registry.is_empty());
        assert!(!registry.dispatch(&visit(500)));
    }
}
