use super::{Fetch, FetchedPage};
use crate::config::{AuthType, CookieConfig, CrawlConfig};
use crate::crawl::admission::AdmissionPolicy;
use crate::crawl::normalize::{origin_of, parse_absolute};
use crate::error::{Error, Result};
use crate::store::ConcurrentStore;
use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderName, HeaderValue, COOKIE, SET_COOKIE};
use reqwest::{Client, Response};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Fetches pages over HTTP with `reqwest`.
///
/// Cookies live in a `reqwest` cookie jar, scoped by domain and path the
/// way a browser scopes them. Cookies and basic auth only go to allowed
/// domains, and only allowed domains may set cookies. Once a session
/// cookie is sent, basic auth is dropped for the rest of the run.
pub struct HttpFetcher {
    client: Client,
    policy: Arc<AdmissionPolicy>,
    /// Extra request headers, validated at construction
    headers: ConcurrentStore<String>,
    jar: Jar,
    configured_cookies: Vec<CookieConfig>,
    /// Origins the configured cookies have been added to the jar for
    seeded_origins: ConcurrentStore,
    /// Lowercased names of cookies that carry an authenticated session
    session_cookie_names: Vec<String>,
    credentials: Option<(String, String)>,
    session_active: AtomicBool,
    max_content_length: Option<u64>,
}

impl HttpFetcher {
    /// Build a fetcher for `config`, checking domains against `policy`
    pub fn new(config: &CrawlConfig, policy: Arc<AdmissionPolicy>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        let headers = ConcurrentStore::new();
        for (name, value) in &config.headers {
            HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::Config(format!("Invalid header name '{}': {}", name, e)))?;
            HeaderValue::from_str(value).map_err(|e| {
                Error::Config(format!("Invalid value for header '{}': {}", name, e))
            })?;
            headers.store(name.as_str(), value.clone());
        }

        let credentials = match config.auth_type {
            AuthType::Basic => Some((config.user.clone(), config.pass.clone())),
            AuthType::None => None,
        };

        Ok(Self {
            client,
            policy,
            headers,
            jar: Jar::default(),
            configured_cookies: config.cookies.clone(),
            seeded_origins: ConcurrentStore::new(),
            session_cookie_names: config
                .session_cookie_names
                .iter()
                .map(|name| name.to_lowercase())
                .collect(),
            credentials,
            session_active: AtomicBool::new(false),
            max_content_length: config.resolved_max_content_length(),
        })
    }

    /// `Cookie` header the jar holds for `url`, if any
    pub fn cookies_for(&self, url: &str) -> Option<String> {
        let url = Url::parse(url).ok()?;
        self.jar
            .cookies(&url)
            .and_then(|value| value.to_str().ok().map(str::to_string))
    }

    /// True once a session cookie has replaced basic auth
    pub fn session_active(&self) -> bool {
        self.session_active.load(Ordering::SeqCst)
    }

    /// Add the configured cookies to the jar the first time an allowed
    /// origin is requested. Domains allowed after construction get them too.
    fn seed_cookies(&self, origin: &str, url: &Url) {
        if self.configured_cookies.is_empty() || self.seeded_origins.contains(origin) {
            return;
        }
        self.seeded_origins.store_key(origin);

        for cookie in &self.configured_cookies {
            let path = cookie.path.as_deref().unwrap_or("/");
            self.jar
                .add_cookie_str(&format!("{}={}; Path={}", cookie.name, cookie.value, path), url);
        }
        debug!("Seeded {} cookies for {}", self.configured_cookies.len(), origin);
    }

    /// `Cookie` header for a request to `url`, noting any session cookie in it
    fn cookie_header(&self, url: &Url) -> Option<HeaderValue> {
        let header = self.jar.cookies(url)?;

        if let Ok(pairs) = header.to_str() {
            for name in pairs.split(';').filter_map(|pair| pair.split('=').next()) {
                let name = name.trim();
                if self.session_cookie_names.contains(&name.to_lowercase())
                    && !self.session_active.swap(true, Ordering::SeqCst)
                {
                    info!("Session cookie {} present, dropping basic auth", name);
                }
            }
        }

        Some(header)
    }

    async fn read_body(&self, url: &str, status: u16, mut response: Response) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            body.extend_from_slice(&chunk);
            if let Some(limit) = self.max_content_length {
                if body.len() as u64 > limit {
                    return Err(Error::ContentTooLarge {
                        url: url.to_string(),
                        status,
                    });
                }
            }
        }
        Ok(body)
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let parsed = parse_absolute(url)?;
        let domain = origin_of(&parsed);
        let allowed = self.policy.domain_allowed(&domain);

        let mut request = self.client.get(parsed.as_str());
        for (name, value) in self.headers.snapshot() {
            request = request.header(name, value);
        }

        // Outside domains never see our cookies or credentials
        if allowed {
            self.seed_cookies(&domain, &parsed);
            if let Some(cookie) = self.cookie_header(&parsed) {
                request = request.header(COOKIE, cookie);
            }
            if let Some((user, pass)) = &self.credentials {
                if !self.session_active() {
                    request = request.basic_auth(user, Some(pass));
                }
            }
        }

        debug!("Fetching: {}", url);
        let response = request.send().await?;
        let status = response.status().as_u16();

        // Outside domains only report their status
        if !allowed {
            return Err(Error::NotAllowed { domain, status });
        }

        let mut set_cookies = response.headers().get_all(SET_COOKIE).iter();
        self.jar.set_cookies(&mut set_cookies, &parsed);

        if let Some(limit) = self.max_content_length {
            match response.content_length() {
                Some(length) if length <= limit => {}
                _ => {
                    return Err(Error::ContentTooLarge {
                        url: url.to_string(),
                        status,
                    })
                }
            }
        }

        let body = self.read_body(url, status, response).await?;
        Ok(FetchedPage { status, body })
    }
}
