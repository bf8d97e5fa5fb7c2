//! Session providers for login-gated file managers.
//!
//! The authenticated crawl family never drives a login itself; it asks a
//! [`SessionProvider`] for the session cookies and every file link the
//! session can see. [`HttpSessionProvider`] does this with plain form posts
//! against the file manager's JSON listing; tests and alternative backends
//! plug in their own implementation.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde_json::Value;

use crate::error::{DiscoveryResult, ScraperError};
use crate::fetch::{FetchClient, FetchOptions, FetchRequest};

/// Rows requested per listing page; large enough that one page usually
/// holds the whole directory.
const LIST_PAGE_SIZE: usize = 100_000;
const MAX_LIST_PAGES: usize = 50;

#[derive(Clone)]
pub struct CrawlRequest {
    pub login_url: String,
    pub target_url: String,
    pub username: String,
    pub password: Option<String>,
    pub timeout: Duration,
}

impl std::fmt::Debug for CrawlRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrawlRequest")
            .field("login_url", &self.login_url)
            .field("target_url", &self.target_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[redacted]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Cookies and file links captured inside one logged-in session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSession {
    pub cookies: BTreeMap<String, String>,
    pub links: Vec<String>,
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Log in and list every file link reachable from `target_url`.
    ///
    /// # Errors
    ///
    /// [`ScraperError::AuthenticationFailure`] when the login does not reach
    /// the target page; transport and status errors otherwise.
    async fn crawl(&self, request: &CrawlRequest) -> DiscoveryResult<CrawlSession>;
}

/// Form-login provider for the file manager's `json/dir` listing API.
#[derive(Debug, Clone)]
pub struct HttpSessionProvider {
    options: FetchOptions,
}

impl HttpSessionProvider {
    #[must_use]
    pub fn new(options: FetchOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl SessionProvider for HttpSessionProvider {
    async fn crawl(&self, request: &CrawlRequest) -> DiscoveryResult<CrawlSession> {
        let client = FetchClient::new(self.options.clone())?;
        let auth_failure = || ScraperError::AuthenticationFailure {
            username: request.username.clone(),
            target_url: request.target_url.clone(),
        };

        let login_page = client
            .fetch_text(&FetchRequest::get(&request.login_url).timeout(request.timeout))
            .await?;
        let mut csrf = csrf_token(&login_page);

        let mut form = vec![
            ("r", String::new()),
            ("username", request.username.clone()),
            ("password", request.password.clone().unwrap_or_default()),
            ("Submit", "Sign in".to_owned()),
        ];
        if let Some(token) = &csrf {
            form.push(("csrftoken", token.clone()));
        }
        let login_action = format!("{}/user", request.login_url.trim_end_matches('/'));
        match client
            .fetch(&FetchRequest::post_form(login_action, form).timeout(request.timeout))
            .await
        {
            Ok(_) => {}
            Err(ScraperError::HttpStatus { status: 401 | 403, .. }) => return Err(auth_failure()),
            Err(err) => return Err(err),
        }

        let target_page = client
            .fetch_text(&FetchRequest::get(&request.target_url).timeout(request.timeout))
            .await?;
        if is_login_form(&target_page) {
            return Err(auth_failure());
        }
        if let Some(token) = csrf_token(&target_page) {
            csrf = Some(token);
        }

        let list_url = format!("{}/json/dir", request.target_url.trim_end_matches('/'));
        let mut links = Vec::new();
        let mut offset = 0usize;
        for page in 0..MAX_LIST_PAGES {
            let mut form = vec![
                ("sEcho", (page + 1).to_string()),
                ("iColumns", "5".to_owned()),
                ("sColumns", ",,,,".to_owned()),
                ("iDisplayStart", offset.to_string()),
                ("iDisplayLength", LIST_PAGE_SIZE.to_string()),
                ("mDataProp_0", "fname".to_owned()),
                ("sSearch", String::new()),
                ("bRegex", "false".to_owned()),
                ("iSortingCols", "0".to_owned()),
                ("cd", "/".to_owned()),
            ];
            if let Some(token) = &csrf {
                form.push(("csrftoken", token.clone()));
            }
            let body = client
                .fetch_text(&FetchRequest::post_form(list_url.as_str(), form).timeout(request.timeout))
                .await?;
            let listing: Value = serde_json::from_str(&body)
                .map_err(|e| ScraperError::malformed(format!("{list_url}: {e}")))?;

            let received = listing
                .get("aaData")
                .and_then(Value::as_array)
                .map_or(0, Vec::len);
            offset += received;
            links.extend(
                listing_names(&listing)
                    .into_iter()
                    .map(|name| format!("{}/d/{name}", request.target_url.trim_end_matches('/'))),
            );

            let total = listing
                .get("iTotalRecords")
                .and_then(|v| v.as_u64().or_else(|| v.as_str()?.parse().ok()))
                .and_then(|t| usize::try_from(t).ok())
                .unwrap_or(offset);
            tracing::debug!(page, received, total, "listed file manager page");
            if received == 0 || offset >= total {
                break;
            }
        }

        Ok(CrawlSession {
            cookies: client.cookies_for(&request.target_url),
            links,
        })
    }
}

fn csrf_token(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let meta = Selector::parse(r#"meta[name="csrftoken"]"#).expect("valid selector");
    let input = Selector::parse(r#"input[name="csrftoken"]"#).expect("valid selector");
    document
        .select(&meta)
        .find_map(|e| e.value().attr("content"))
        .or_else(|| document.select(&input).find_map(|e| e.value().attr("value")))
        .map(str::to_owned)
        .filter(|t| !t.is_empty())
}

fn is_login_form(html: &str) -> bool {
    let document = Html::parse_document(html);
    let password = Selector::parse(r#"input[name="password"]"#).expect("valid selector");
    document.select(&password).next().is_some()
}

/// File names from a `json/dir` response, directories excluded.
fn listing_names(listing: &Value) -> Vec<String> {
    let Some(rows) = listing.get("aaData").and_then(Value::as_array) else {
        return Vec::new();
    };
    rows.iter()
        .filter(|row| row.get("ftype").and_then(Value::as_str) != Some("folder"))
        .filter_map(|row| {
            row.get("fname")
                .or_else(|| row.get("name"))
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|name| !name.is_empty() && !name.ends_with('/'))
                .map(str::to_owned)
        })
        .collect()
}
