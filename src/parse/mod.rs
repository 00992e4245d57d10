//! Link extraction from fetched pages
//!
//! This module handles:
//! - The `Link` record passed through the frontier
//! - The `ExtractLinks` seam the crawl engine expands pages through
//! - A default HTML extractor built on `scraper`

mod links;

pub use links::*;

use crate::error::Result;

/// A hyperlink found on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Page the link was found on (`"start"` for the root URL)
    pub linked_from: String,
    /// Link target; absolute once it reaches the frontier, except for
    /// relative forms the extractor does not resolve
    pub href: String,
    /// Value of the anchor's `target` attribute, empty if absent
    pub target: String,
}

impl Link {
    pub fn new(linked_from: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            linked_from: linked_from.into(),
            href: href.into(),
            target: String::new(),
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }
}

/// Finds the links on a fetched page
pub trait ExtractLinks: Send + Sync {
    /// Extract the links in `body`, resolving root- and protocol-relative
    /// hrefs against `page_url`. Every returned link has `linked_from`
    /// set to `page_url`.
    fn extract_links(&self, page_url: &str, body: &str) -> Result<Vec<Link>>;
}
