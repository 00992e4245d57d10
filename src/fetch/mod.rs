//! Page fetching
//!
//! This module provides:
//! - The `Fetch` trait the crawl engine retrieves pages through
//! - An HTTP implementation with cookies, basic auth and size limits

mod http;

pub use http::*;

use crate::error::Result;
use async_trait::async_trait;

/// A page the server answered with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Retrieves pages for the crawl engine
///
/// Implementations must report a page on a domain the crawl may not
/// traverse as [`Error::NotAllowed`](crate::Error::NotAllowed) and a page
/// over the size limit as
/// [`Error::ContentTooLarge`](crate::Error::ContentTooLarge), both carrying
/// the status the server answered with. Any other error is treated as a
/// transport failure.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;
}
