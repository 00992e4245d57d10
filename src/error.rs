//! Custom error types for driftnet

use thiserror::Error;

/// Main error type for crawl operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed URL '{url}': {reason}")]
    MalformedUrl { url: String, reason: String },

    #[error("Domain not allowed: {domain}")]
    NotAllowed { domain: String, status: u16 },

    #[error("Content-length too large of url: {url}")]
    ContentTooLarge { url: String, status: u16 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Frontier is closed")]
    FrontierClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub(crate) fn malformed(url: &str, reason: impl ToString) -> Self {
        Error::MalformedUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// HTTP status carried by the error, if the server answered at all.
    ///
    /// Admission and size failures happen after the response status is known,
    /// so handlers can still be told about them. Transport failures have none.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::NotAllowed { status, .. } | Error::ContentTooLarge { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

/// Result type alias for driftnet
pub type Result<T> = std::result::Result<T, Error>;
