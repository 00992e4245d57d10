//! URL normalization for deduplication
//!
//! Two links that point at the same page must produce the same key. The key
//! is `scheme://host[:port]/path[?sorted-query]`: fragments are dropped,
//! ignored GET parameters are removed, and the surviving `key[=value]`
//! tokens are sorted so parameter order never matters.

use crate::error::{Error, Result};
use crate::store::ConcurrentStore;
use url::{form_urlencoded, Url};

/// Parse an absolute URL that has a host, trimming surrounding whitespace
pub fn parse_absolute(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).map_err(|e| Error::malformed(trimmed, e))?;
    if url.host_str().is_none() {
        return Err(Error::malformed(trimmed, "URL has no host"));
    }
    Ok(url)
}

/// `scheme://host[:port]` of a parsed URL
pub fn origin_of(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    }
}

/// `scheme://host[:port]` of a raw URL string
pub fn scheme_and_host(raw: &str) -> Result<String> {
    parse_absolute(raw).map(|url| origin_of(&url))
}

/// Canonicalizes URLs into visited-store keys.
///
/// The ignore list is fixed at construction; normalizing never mutates it.
#[derive(Debug, Default)]
pub struct UrlNormalizer {
    /// GET parameter names that do not distinguish one page from another
    ignored_params: ConcurrentStore,
    /// Also ignore any parameter whose name contains an ignored entry
    fuzzy: bool,
}

impl UrlNormalizer {
    pub fn new<I, S>(ignored_params: I, fuzzy: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ignored_params: ignored_params.into_iter().collect(),
            fuzzy,
        }
    }

    /// Normalize `raw` into its dedup key
    pub fn normalize(&self, raw: &str) -> Result<String> {
        let url = parse_absolute(raw)?;

        let mut tokens: Vec<String> = url
            .query_pairs()
            .filter(|(key, _)| !self.is_ignored(key))
            .map(|(key, value)| {
                let key = encode(&key);
                if value.is_empty() {
                    key
                } else {
                    format!("{}={}", key, encode(&value))
                }
            })
            .collect();
        tokens.sort();

        let mut normalized = format!("{}{}", origin_of(&url), url.path());
        if !tokens.is_empty() {
            normalized.push('?');
            normalized.push_str(&tokens.join("&"));
        }
        Ok(normalized)
    }

    fn is_ignored(&self, key: &str) -> bool {
        if self.ignored_params.is_empty() {
            return false;
        }
        self.ignored_params.contains(key) || (self.fuzzy && self.ignored_params.any_key_within(key))
    }
}

// Re-encoding keeps `&` and `=` inside decoded values from splitting tokens
// on the next parse, which is what makes normalization idempotent.
fn encode(component: &str) -> String {
    form_urlencoded::byte_serialize(component.as_bytes()).collect()
}
