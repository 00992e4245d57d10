//! HTML anchor extraction

use super::{ExtractLinks, Link};
use crate::crawl::normalize::parse_absolute;
use crate::error::Result;
use scraper::{Html, Selector};
use tracing::debug;

/// Extracts `<a href>` links from HTML with `scraper`
#[derive(Debug, Clone)]
pub struct HtmlLinkExtractor {
    /// Skip links such as `#section` that only move within the page
    pub ignore_fragment_only: bool,
}

impl Default for HtmlLinkExtractor {
    fn default() -> Self {
        Self {
            ignore_fragment_only: true,
        }
    }
}

impl HtmlLinkExtractor {
    pub fn new(ignore_fragment_only: bool) -> Self {
        Self {
            ignore_fragment_only,
        }
    }

    fn skip(&self, href: &str) -> bool {
        href.is_empty()
            || href.starts_with("javascript:")
            || (self.ignore_fragment_only && href.starts_with('#'))
    }
}

impl ExtractLinks for HtmlLinkExtractor {
    fn extract_links(&self, page_url: &str, body: &str) -> Result<Vec<Link>> {
        let base = parse_absolute(page_url)?;
        let document = Html::parse_document(body);
        let mut links = Vec::new();

        if let Ok(selector) = Selector::parse("a[href]") {
            for elem in document.select(&selector) {
                let Some(raw) = elem.value().attr("href") else {
                    continue;
                };
                let raw = raw.trim();
                if self.skip(raw) {
                    continue;
                }

                // Only root- and protocol-relative hrefs are rebased on the page
                let href = if raw.starts_with('/') {
                    match base.join(raw) {
                        Ok(resolved) => resolved.to_string(),
                        Err(e) => {
                            debug!("Could not resolve {} against {}: {}", raw, page_url, e);
                            continue;
                        }
                    }
                } else {
                    raw.to_string()
                };

                let mut link = Link::new(page_url, href);
                if let Some(target) = elem.value().attr("target") {
                    link = link.with_target(target);
                }
                links.push(link);
            }
        }

        Ok(links)
    }
}
