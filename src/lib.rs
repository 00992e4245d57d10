//! driftnet: a bounded-concurrency web crawler
//!
//! A [`Crawler`] starts from one URL, fetches pages with a fixed pool of
//! workers, and follows links within an allow-listed set of domains. Every
//! fetch outcome, including visits answered from the visited store, is
//! handed to a caller-supplied handler chosen by HTTP status.

pub mod config;
pub mod crawl;
pub mod error;
pub mod fetch;
pub mod parse;
pub mod progress;
pub mod store;

pub use config::CrawlConfig;
pub use crawl::{CrawlState, CrawlSummary, Crawler, StopHandle, Visit};
pub use error::{Error, Result};
pub use fetch::{Fetch, FetchedPage, HttpFetcher};
pub use parse::{ExtractLinks, HtmlLinkExtractor, Link};
