//! Single-purpose HTTP fetch with a uniform result.
//!
//! A [`FetchClient`] wraps one pooled `reqwest::Client` with a cookie store,
//! so a burst of requests (a login followed by listing pages, or the four
//! concurrent grid lookups) shares connections and session cookies. Every
//! fault is mapped onto [`ScraperError`]; nothing here panics.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use pricewatch_core::AppConfig;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, Url};

use crate::decode::charset;
use crate::error::{DiscoveryResult, ScraperError};
use crate::rate_limit::retry_with_backoff;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_USER_AGENT: &str = "pricewatch/0.1 (price-transparency)";

/// Longest error body kept on [`ScraperError::HttpStatus`].
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub user_agent: String,
    /// Applied when a request does not carry its own timeout.
    pub timeout: Duration,
    pub accept_invalid_certs: bool,
    pub max_retries: u32,
    pub backoff_base_secs: u64,
}

impl FetchOptions {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: Duration::from_secs(config.fetch_timeout_secs),
            accept_invalid_certs: config.accept_invalid_certs,
            max_retries: config.max_retries,
            backoff_base_secs: config.retry_backoff_base_secs,
        }
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            timeout: DEFAULT_TIMEOUT,
            accept_invalid_certs: false,
            max_retries: 2,
            backoff_base_secs: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
}

#[derive(Debug, Clone, Default)]
pub struct FetchRequest {
    pub url: String,
    pub method: Method,
    /// Form-encoded body, sent only with [`Method::Post`].
    pub form: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    /// Sent as an explicit `Cookie` header, ahead of the client's jar.
    pub cookies: BTreeMap<String, String>,
    pub timeout: Option<Duration>,
}

impl FetchRequest {
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn post_form<K, V>(url: impl Into<String>, form: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            url: url.into(),
            method: Method::Post,
            form: form
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn cookies(mut self, cookies: &BTreeMap<String, String>) -> Self {
        self.cookies.extend(cookies.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Downloaded content handed to the decode pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawContent {
    /// Raw body plus the charset declared in `Content-Type`, if any.
    Bytes {
        bytes: Vec<u8>,
        charset: Option<String>,
    },
    /// Content that already arrived as text.
    Text(String),
}

impl RawContent {
    #[must_use]
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        RawContent::Bytes {
            bytes: bytes.into(),
            charset: None,
        }
    }

    /// Decode to text using the declared charset, the XML prolog, or a
    /// statistical guess, in that order.
    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            RawContent::Text(text) => text,
            RawContent::Bytes { bytes, charset } => {
                charset::decode_bytes(&bytes, charset.as_deref())
            }
        }
    }
}

/// Pooled HTTP client shared across one discovery call.
#[derive(Debug, Clone)]
pub struct FetchClient {
    client: Client,
    jar: Arc<Jar>,
    options: FetchOptions,
}

impl FetchClient {
    /// # Errors
    ///
    /// Returns [`ScraperError::Transport`] if the TLS backend cannot be
    /// initialised.
    pub fn new(options: FetchOptions) -> DiscoveryResult<Self> {
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(options.user_agent.clone())
            .cookie_provider(Arc::clone(&jar))
            .danger_accept_invalid_certs(options.accept_invalid_certs)
            .build()
            .map_err(|e| ScraperError::transport("<client>", &e))?;
        Ok(Self {
            client,
            jar,
            options,
        })
    }

    /// Cookies the session jar would send to `url`.
    #[must_use]
    pub fn cookies_for(&self, url: &str) -> BTreeMap<String, String> {
        let Ok(url) = Url::parse(url) else {
            return BTreeMap::new();
        };
        let Some(header) = self.jar.cookies(&url) else {
            return BTreeMap::new();
        };
        header
            .to_str()
            .unwrap_or_default()
            .split(';')
            .filter_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                Some((name.to_owned(), value.to_owned()))
            })
            .collect()
    }

    #[must_use]
    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Perform `request`, retrying transient failures per the configured
    /// retry policy.
    ///
    /// # Errors
    ///
    /// [`ScraperError::HttpStatus`] for status ≥ 400 and
    /// [`ScraperError::Transport`] for DNS, TLS, reset or timeout faults.
    pub async fn fetch(&self, request: &FetchRequest) -> DiscoveryResult<RawContent> {
        retry_with_backoff(
            self.options.max_retries,
            self.options.backoff_base_secs,
            || self.fetch_once(request),
        )
        .await
    }

    /// [`fetch`](Self::fetch) and decode the body to text.
    ///
    /// # Errors
    ///
    /// Same as [`fetch`](Self::fetch).
    pub async fn fetch_text(&self, request: &FetchRequest) -> DiscoveryResult<String> {
        Ok(self.fetch(request).await?.into_text())
    }

    async fn fetch_once(&self, request: &FetchRequest) -> DiscoveryResult<RawContent> {
        let url = request.url.as_str();
        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };
        builder = builder.timeout(request.timeout.unwrap_or(self.options.timeout));
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.cookies.is_empty() {
            let cookie = request
                .cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            builder = builder.header(reqwest::header::COOKIE, cookie);
        }
        if request.method == Method::Post {
            builder = builder.form(&request.form);
        }

        tracing::debug!(url, method = ?request.method, "fetching");
        let response = builder
            .send()
            .await
            .map_err(|e| ScraperError::transport(url, &e))?;

        let status = response.status();
        let charset = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(charset::from_content_type);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ScraperError::transport(url, &e))?;

        if status.as_u16() >= 400 {
            let mut body = String::from_utf8_lossy(&bytes).into_owned();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(ScraperError::HttpStatus {
                status: status.as_u16(),
                url: url.to_owned(),
                body,
            });
        }

        Ok(RawContent::Bytes {
            bytes: bytes.to_vec(),
            charset,
        })
    }
}
