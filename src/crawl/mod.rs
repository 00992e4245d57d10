//! Bounded-concurrency crawl engine
//!
//! This module provides:
//! - URL normalization for deduplication
//! - Domain and path admission
//! - The visited store and bounded frontier
//! - A worker pool dispatching every fetch outcome to per-status handlers
//! - Idle detection and graceful shutdown

pub mod admission;
pub mod frontier;
pub mod handler;
pub mod monitor;
pub mod normalize;
pub mod visited;
mod worker;

pub use admission::AdmissionPolicy;
pub use frontier::Frontier;
pub use handler::{Handler, HandlerRegistry, Visit};
pub use monitor::{CrawlState, StopHandle};
pub use normalize::UrlNormalizer;
pub use visited::VisitedStore;

use crate::config::CrawlConfig;
use crate::error::{Error, Result};
use crate::fetch::{Fetch, HttpFetcher};
use crate::parse::{ExtractLinks, HtmlLinkExtractor, Link};
use monitor::{IdleMonitor, Lifecycle};
use normalize::{origin_of, parse_absolute};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use worker::Engine;

/// What a finished crawl did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Distinct normalized URLs with a known status
    pub visited: usize,
    pub duration: Duration,
}

/// Web crawler rooted at one URL
pub struct Crawler {
    config: CrawlConfig,
    root_url: String,
    root_domain: String,
    lifecycle: Arc<Lifecycle>,
    normalizer: Arc<UrlNormalizer>,
    policy: Arc<AdmissionPolicy>,
    visited: Arc<VisitedStore>,
    fetcher: Arc<dyn Fetch>,
    extractor: Arc<dyn ExtractLinks>,
    handlers: HandlerRegistry,
}

impl Crawler {
    /// Create a crawler for `root_url` with default options
    pub fn new(root_url: &str) -> Result<Self> {
        Self::with_config(root_url, CrawlConfig::default())
    }

    /// Create a crawler for `root_url`
    ///
    /// The root's `scheme://host` is always allowed; `config.allowed_domains`
    /// are added on top.
    pub fn with_config(root_url: &str, config: CrawlConfig) -> Result<Self> {
        config.validate()?;

        let root = parse_absolute(root_url)
            .map_err(|e| Error::Config(format!("Invalid root URL: {}", e)))?;
        let root_domain = origin_of(&root);

        let policy = Arc::new(AdmissionPolicy::new());
        policy.allow_domain(&root_domain)?;
        for domain in &config.allowed_domains {
            policy
                .allow_domain(domain)
                .map_err(|e| Error::Config(format!("Invalid allowed domain: {}", e)))?;
        }
        for path in &config.forbidden_paths {
            policy.forbid_path(path.as_str());
        }

        let normalizer = Arc::new(UrlNormalizer::new(
            config.ignore_get_parameters.iter().cloned(),
            config.fuzzy_get_parameter_checks,
        ));
        let fetcher: Arc<dyn Fetch> = Arc::new(HttpFetcher::new(&config, Arc::clone(&policy))?);
        let lifecycle = Arc::new(Lifecycle::new(
            Frontier::new(config.url_buffer_size),
            config.worker_count,
        ));

        Ok(Self {
            root_url: root_url.trim().to_string(),
            root_domain,
            lifecycle,
            normalizer,
            policy,
            visited: Arc::new(VisitedStore::new()),
            fetcher,
            extractor: Arc::new(HtmlLinkExtractor::default()),
            handlers: HandlerRegistry::new(),
            config,
        })
    }

    /// Create a crawler from a TOML file whose `entrypoint` is the root URL
    pub fn from_config_file(path: &Path) -> Result<Self> {
        let config = CrawlConfig::load(path)?;
        let entrypoint = config
            .entrypoint
            .clone()
            .ok_or_else(|| Error::Config("entrypoint not specified".to_string()))?;
        Self::with_config(&entrypoint, config)
    }

    /// Replace the HTTP fetcher
    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetch>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Replace the HTML link extractor
    pub fn with_link_extractor(mut self, extractor: Arc<dyn ExtractLinks>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Handle every status without a handler of its own
    pub fn handle_default<F>(&mut self, handler: F)
    where
        F: Fn(&Visit<'_>) + Send + Sync + 'static,
    {
        self.handlers.set_default(handler);
    }

    /// Handle one status
    pub fn handle<F>(&mut self, status: u16, handler: F)
    where
        F: Fn(&Visit<'_>) + Send + Sync + 'static,
    {
        self.handlers.set(status, handler);
    }

    /// Allow more domains to be traversed. Pages on other domains are still
    /// reported with their status but never read or expanded.
    pub fn allow_domains<I, S>(&self, domains: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for domain in domains {
            self.policy.allow_domain(domain.as_ref())?;
        }
        Ok(())
    }

    /// Admission policy shared with the default fetcher, for custom fetchers
    pub fn admission(&self) -> Arc<AdmissionPolicy> {
        Arc::clone(&self.policy)
    }

    pub fn root_url(&self) -> &str {
        &self.root_url
    }

    /// `scheme://host[:port]` of the root URL
    pub fn root_domain(&self) -> &str {
        &self.root_domain
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    pub fn state(&self) -> CrawlState {
        self.lifecycle.state()
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle::new(Arc::clone(&self.lifecycle))
    }

    /// Stop the crawl, letting queued links drain. Idempotent.
    pub fn stop(&self) {
        self.stop_handle().stop();
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Status last seen for a normalized URL
    pub fn visited_status(&self, normalized_url: &str) -> Option<u16> {
        self.visited.load_status(normalized_url)
    }

    /// Crawl from the root URL until no work is left or the crawl is stopped.
    ///
    /// Returns once every worker has exited. A crawler runs once; calling
    /// this again, or after `stop`, is a configuration error.
    pub async fn start(&self) -> Result<CrawlSummary> {
        if self.handlers.is_empty() {
            return Err(Error::Config("no handlers specified".to_string()));
        }
        if !self.lifecycle.begin() {
            return Err(Error::Config(format!(
                "crawler cannot start from state {:?}",
                self.lifecycle.state()
            )));
        }

        let started = Instant::now();
        let engine = Arc::new(Engine {
            lifecycle: Arc::clone(&self.lifecycle),
            normalizer: Arc::clone(&self.normalizer),
            policy: Arc::clone(&self.policy),
            visited: Arc::clone(&self.visited),
            fetcher: Arc::clone(&self.fetcher),
            extractor: Arc::clone(&self.extractor),
            handlers: self.handlers.clone(),
        });

        let workers: Vec<_> = (0..self.config.worker_count)
            .map(|id| {
                info!("Spawning worker-{}", id + 1);
                tokio::spawn(Arc::clone(&engine).run_worker(id))
            })
            .collect();

        if let Err(e) = engine.enqueue(Link::new("start", self.root_url.as_str())).await {
            warn!("Could not queue root URL {}: {}", self.root_url, e);
        }

        let monitor = tokio::spawn(
            IdleMonitor::new(Arc::clone(&self.lifecycle), self.config.idle_check_interval()).run(),
        );

        for (id, result) in futures::future::join_all(workers).await.into_iter().enumerate() {
            if let Err(e) = result {
                warn!("worker-{} failed: {}", id + 1, e);
            }
        }

        monitor.abort();
        self.lifecycle.finish();

        let summary = CrawlSummary {
            visited: self.visited.len(),
            duration: started.elapsed(),
        };
        info!(
            "Crawl finished: {} URLs visited in {:.1}s",
            summary.visited,
            summary.duration.as_secs_f64()
        );
        Ok(summary)
    }
}
