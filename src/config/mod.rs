//! Configuration management for driftnet
//!
//! Handles loading and validating crawl options from TOML files. Every key
//! is optional; missing keys fall back to the values in [`defaults`].

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// How requests authenticate against the crawled site
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    #[default]
    None,
    Basic,
}

/// A cookie sent with every request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieConfig {
    pub name: String,
    pub value: String,

    /// Informational only; cookies are sent to every crawled host
    #[serde(default)]
    pub domain: Option<String>,

    #[serde(default)]
    pub path: Option<String>,
}

/// Crawl configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlConfig {
    /// First URL fetched when building a crawler from a file
    #[serde(default)]
    pub entrypoint: Option<String>,

    #[serde(default)]
    pub auth_type: AuthType,

    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub pass: String,

    /// Number of links that can be waiting to be visited
    #[serde(default = "default_url_buffer_size")]
    pub url_buffer_size: usize,

    /// Number of concurrent workers
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// How often (milliseconds) the idle monitor re-checks for quiescence.
    /// 0 selects the default.
    #[serde(default = "default_idle_work_check_interval")]
    pub idle_work_check_interval: u64,

    /// Maximum page size in bytes. 0 selects 512 KiB, -1 disables the limit.
    #[serde(default = "default_max_content_length")]
    pub max_content_length: i64,

    /// Domains besides the root that may be traversed
    #[serde(default)]
    pub allowed_domains: Vec<String>,

    #[serde(default)]
    pub cookies: Vec<CookieConfig>,

    /// Cookie names that identify an authenticated session. Sending one of
    /// them drops the basic auth header.
    #[serde(default)]
    pub session_cookie_names: Vec<String>,

    /// Extra headers added to every request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// GET parameters ignored when deciding whether a URL was visited
    #[serde(default)]
    pub ignore_get_parameters: Vec<String>,

    /// Match ignored GET parameters by substring instead of exactly
    #[serde(default)]
    pub fuzzy_get_parameter_checks: bool,

    /// Path substrings whose pages are reported but never expanded
    #[serde(default)]
    pub forbidden_paths: Vec<String>,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            entrypoint: None,
            auth_type: AuthType::None,
            user: String::new(),
            pass: String::new(),
            url_buffer_size: default_url_buffer_size(),
            worker_count: default_worker_count(),
            idle_work_check_interval: default_idle_work_check_interval(),
            max_content_length: default_max_content_length(),
            allowed_domains: Vec::new(),
            cookies: Vec::new(),
            session_cookie_names: Vec::new(),
            headers: BTreeMap::new(),
            ignore_get_parameters: Vec::new(),
            fuzzy_get_parameter_checks: false,
            forbidden_paths: Vec::new(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl CrawlConfig {
    /// Load configuration from a TOML file
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: CrawlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Effective byte limit for page bodies, `None` meaning unlimited
    pub fn resolved_max_content_length(&self) -> Option<u64> {
        match self.max_content_length {
            0 => Some(DEFAULT_MAX_CONTENT_LENGTH),
            -1 => None,
            n => Some(n.max(0) as u64),
        }
    }

    /// Effective idle check interval
    pub fn idle_check_interval(&self) -> Duration {
        let millis = if self.idle_work_check_interval == 0 {
            default_idle_work_check_interval()
        } else {
            self.idle_work_check_interval
        };
        Duration::from_millis(millis)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(Error::Config("worker-count must be at least 1".to_string()));
        }

        if self.url_buffer_size == 0 {
            return Err(Error::Config(
                "url-buffer-size must be at least 1".to_string(),
            ));
        }

        if self.max_content_length < -1 {
            return Err(Error::Config(format!(
                "max-content-length must be -1, 0 or positive, got {}",
                self.max_content_length
            )));
        }

        if self.auth_type == AuthType::Basic && self.user.is_empty() {
            return Err(Error::Config(
                "auth-type = \"basic\" requires a user".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = CrawlConfig::default();
        assert_eq!(config.url_buffer_size, 10_000);
        assert_eq!(config.worker_count, 10);
        assert_eq!(config.idle_check_interval(), Duration::from_millis(5_000));
        assert_eq!(
            config.resolved_max_content_length(),
            Some(DEFAULT_MAX_CONTENT_LENGTH)
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_content_length_resolution() {
        let mut config = CrawlConfig::default();

        config.max_content_length = 0;
        assert_eq!(config.resolved_max_content_length(), Some(512 * 1024));

        config.max_content_length = -1;
        assert_eq!(config.resolved_max_content_length(), None);

        config.max_content_length = 512_000;
        assert_eq!(config.resolved_max_content_length(), Some(512_000));
    }

    #[test]
    fn test_zero_idle_interval_uses_default() {
        let config = CrawlConfig {
            idle_work_check_interval: 0,
            ..Default::default()
        };
        assert_eq!(config.idle_check_interval(), Duration::from_millis(5_000));
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = CrawlConfig::from_toml_str("").unwrap();
        assert_eq!(config.worker_count, default_worker_count());
        assert_eq!(config.auth_type, AuthType::None);
        assert!(config.entrypoint.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("crawl.toml");
        std::fs::write(
            &path,
            r#"
entrypoint = "http://example.com"
auth-type = "basic"
user = "testUser"
pass = "testPassword"
url-buffer-size = 5000
worker-count = 2
max-content-length = 10000
allowed-domains = ["http://www.example.com"]
ignore-get-parameters = ["redirect"]
fuzzy-get-parameter-checks = true
idle-work-check-interval = 2000
forbidden-paths = ["/logout"]
session-cookie-names = ["JSESSIONID"]

[[cookies]]
name = "Cookie Name"
value = "Cookie Value"
path = "/"
domain = "http://example.com"

[headers]
header-name = "header-value"
"#,
        )
        .unwrap();

        let config = CrawlConfig::load(&path).unwrap();
        assert_eq!(config.entrypoint.as_deref(), Some("http://example.com"));
        assert_eq!(config.auth_type, AuthType::Basic);
        assert_eq!(config.user, "testUser");
        assert_eq!(config.pass, "testPassword");
        assert_eq!(config.url_buffer_size, 5000);
        assert_eq!(config.worker_count, 2);
        assert_eq!(config.resolved_max_content_length(), Some(10_000));
        assert_eq!(config.allowed_domains, vec!["http://www.example.com"]);
        assert_eq!(config.ignore_get_parameters, vec!["redirect"]);
        assert!(config.fuzzy_get_parameter_checks);
        assert_eq!(config.idle_check_interval(), Duration::from_millis(2000));
        assert_eq!(config.forbidden_paths, vec!["/logout"]);
        assert_eq!(config.session_cookie_names, vec!["JSESSIONID"]);
        assert_eq!(config.cookies.len(), 1);
        assert_eq!(config.cookies[0].name, "Cookie Name");
        assert_eq!(config.cookies[0].path.as_deref(), Some("/"));
        assert_eq!(
            config.headers.get("header-name").map(String::as_str),
            Some("header-value")
        );
    }

    #[test]
    fn test_load_missing_file() {
        let tmp = TempDir::new().unwrap();
        let err = CrawlConfig::load(&tmp.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_config_validation() {
        let mut config = CrawlConfig::default();

        config.worker_count = 0;
        assert!(config.validate().is_err());
        config.worker_count = 1;

        config.url_buffer_size = 0;
        assert!(config.validate().is_err());
        config.url_buffer_size = 1;

        config.max_content_length = -2;
        assert!(config.validate().is_err());
        config.max_content_length = -1;

        config.auth_type = AuthType::Basic;
        assert!(config.validate().is_err());
        config.user = "someone".to_string();

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let err = CrawlConfig::from_toml_str("worker-count = \"many\"").unwrap_err();
        assert!(matches!(err, Error::TomlParse(_)));
    }
}
