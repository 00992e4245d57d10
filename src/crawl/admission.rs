//! Domain and path admission
//!
//! A page on a domain outside the allow list is still fetched far enough to
//! learn its status, so handlers hear about it, but its body is never read
//! and its links are never followed. A page whose path is forbidden is read
//! and reported but likewise never expanded.

use super::normalize::{parse_absolute, scheme_and_host};
use crate::error::Result;
use crate::store::ConcurrentStore;
use tracing::debug;

#[derive(Debug, Default)]
pub struct AdmissionPolicy {
    /// `scheme://host[:port]` origins the crawler may traverse. Append-only
    /// for the lifetime of a crawl.
    allowed_domains: ConcurrentStore,
    /// Path substrings that stop link expansion
    forbidden_paths: ConcurrentStore,
}

impl AdmissionPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow the origin of `domain`, which may be any absolute URL
    pub fn allow_domain(&self, domain: &str) -> Result<()> {
        let origin = scheme_and_host(domain)?;
        debug!("Allowing domain {}", origin);
        self.allowed_domains.store_key(origin);
        Ok(())
    }

    pub fn forbid_path(&self, path: impl Into<String>) {
        self.forbidden_paths.store_key(path);
    }

    /// True iff `domain` (in `scheme://host` form) is allowed
    pub fn domain_allowed(&self, domain: &str) -> bool {
        self.allowed_domains.contains(domain)
    }

    /// True iff the path of `url` contains any forbidden substring
    pub fn path_forbidden(&self, url: &str) -> bool {
        if self.forbidden_paths.is_empty() {
            return false;
        }
        match parse_absolute(url) {
            Ok(parsed) => self.forbidden_paths.any_key_within(parsed.path()),
            Err(_) => false,
        }
    }

    pub fn allowed_domain_count(&self) -> usize {
        self.allowed_domains.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_domain_stores_origin() {
        let policy = AdmissionPolicy::new();
        policy.allow_domain("https://www.liferay.com/web/guest/home").unwrap();

        assert!(policy.domain_allowed("https://www.liferay.com"));
        assert!(!policy.domain_allowed("http://www.liferay.com"));
        assert!(!policy.domain_allowed("https://liferay.com"));
    }

    #[test]
    fn test_allow_domain_rejects_malformed() {
        let policy = AdmissionPolicy::new();
        assert!(policy.allow_domain("www.liferay.com").is_err());
        assert_eq!(policy.allowed_domain_count(), 0);
    }

    #[test]
    fn test_path_forbidden_substring() {
        let policy = AdmissionPolicy::new();
        policy.forbid_path("forbidden");
        policy.forbid_path("control_panel");

        assert!(policy.path_forbidden("https://x.com/a/forbidden/b"));
        assert!(policy.path_forbidden("https://x.com/forbidden"));
        assert!(policy.path_forbidden("https://x.com/group/control_panel/manage?p=1"));
        assert!(!policy.path_forbidden("https://x.com/allowed/path"));
    }

    #[test]
    fn test_path_forbidden_ignores_query_and_host() {
        let policy = AdmissionPolicy::new();
        policy.forbid_path("logout");

        assert!(!policy.path_forbidden("https://logout.example.com/home"));
        assert!(!policy.path_forbidden("https://x.com/home?next=logout"));
        assert!(policy.path_forbidden("https://x.com/c/portal/logout"));
    }

    #[test]
    fn test_nothing_forbidden_by_default() {
        let policy = AdmissionPolicy::new();
        assert!(!policy.path_forbidden("https://x.com/a/forbidden/b"));
    }
}
