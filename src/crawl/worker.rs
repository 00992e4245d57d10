//! Worker pool
//!
//! Each worker pops a link, normalizes it, answers from the visited store
//! or fetches it, dispatches the outcome to a handler, and on a 200 for an
//! allowed, non-forbidden page queues every link the page contains.

use super::admission::AdmissionPolicy;
use super::handler::{HandlerRegistry, Visit};
use super::monitor::{ActivityGuard, Lifecycle};
use super::normalize::{scheme_and_host, UrlNormalizer};
use super::visited::VisitedStore;
use crate::error::Result;
use crate::fetch::Fetch;
use crate::parse::{ExtractLinks, Link};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Everything a worker needs, shared by the whole pool
pub(crate) struct Engine {
    pub(crate) lifecycle: Arc<Lifecycle>,
    pub(crate) normalizer: Arc<UrlNormalizer>,
    pub(crate) policy: Arc<AdmissionPolicy>,
    pub(crate) visited: Arc<VisitedStore>,
    pub(crate) fetcher: Arc<dyn Fetch>,
    pub(crate) extractor: Arc<dyn ExtractLinks>,
    pub(crate) handlers: HandlerRegistry,
}

impl Engine {
    /// Queue a link, counting it as in flight until a worker is done with it
    pub(crate) async fn enqueue(&self, link: Link) -> Result<()> {
        self.lifecycle.work_added();
        let pushed = self.lifecycle.frontier.push(link).await;
        if pushed.is_err() {
            self.lifecycle.work_done();
        }
        pushed
    }

    /// Drain the frontier until it is closed and empty
    pub(crate) async fn run_worker(self: Arc<Self>, id: usize) {
        let name = format!("worker-{}", id + 1);

        while let Some(link) = self.lifecycle.frontier.pop().await {
            let _busy = ActivityGuard::new(&self.lifecycle, id);
            self.process(&name, link).await;
        }

        debug!("{}: frontier closed, exiting", name);
    }

    async fn process(&self, name: &str, link: Link) {
        let url = match self.normalizer.normalize(&link.href) {
            Ok(url) => url,
            Err(e) => {
                debug!("{}: failed normalize: {}", name, e);
                return;
            }
        };

        if let Some(status) = self.visited.load_status(&url) {
            self.dispatch(&link.linked_from, &url, status, "", true);
            return;
        }

        let page = match self.fetcher.fetch(&url).await {
            Ok(page) => page,
            Err(e) => {
                match e.status() {
                    Some(status) => {
                        debug!("{}: {} ({})", name, e, status);
                        self.visited.store(&url, status);
                        self.dispatch(&link.linked_from, &url, status, "", false);
                    }
                    None => debug!("{}: failed fetch of {}: {}", name, url, e),
                }
                return;
            }
        };

        self.visited.store(&url, page.status);
        let body = String::from_utf8_lossy(&page.body);
        self.dispatch(&link.linked_from, &url, page.status, &body, false);

        if page.status == 200 && self.expandable(&url) {
            self.expand(name, &url, &body).await;
        }
    }

    fn dispatch(&self, linked_from: &str, url: &str, status: u16, body: &str, cached: bool) {
        let visit = Visit {
            linked_from,
            url,
            status,
            body,
            cached,
        };
        // A panicking handler must not take its worker down with it
        match panic::catch_unwind(AssertUnwindSafe(|| self.handlers.dispatch(&visit))) {
            Ok(true) => {}
            Ok(false) => trace!("No handler for status {} of {}", status, url),
            Err(_) => warn!("Handler panicked on {} ({})", url, status),
        }
    }

    fn expandable(&self, url: &str) -> bool {
        if self.policy.path_forbidden(url) {
            debug!("Not expanding forbidden path {}", url);
            return false;
        }
        // Custom fetchers may not check admission themselves
        match scheme_and_host(url) {
            Ok(domain) => self.policy.domain_allowed(&domain),
            Err(_) => false,
        }
    }

    async fn expand(&self, name: &str, url: &str, body: &str) {
        let links = match self.extractor.extract_links(url, body) {
            Ok(links) => links,
            Err(e) => {
                debug!("{}: failed extracting links from {}: {}", name, url, e);
                return;
            }
        };

        for link in links {
            if link.href.is_empty() {
                continue;
            }
            if self.lifecycle.is_stopping() {
                debug!("{}: stopping, abandoning links from {}", name, url);
                break;
            }
            if self.enqueue(link).await.is_err() {
                break;
            }
        }
    }
}
