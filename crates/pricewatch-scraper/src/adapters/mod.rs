//! Protocol adapter families.
//!
//! Each family knows how one kind of publishing site lists its files and how
//! to pick the latest one. Chains differ only by their [`ChainDescriptor`];
//! the family is chosen from `link_type` and dispatched statically.

mod binaprojects;
mod carrefour;
mod hazihinam;
mod laibcatalog;
mod publishedprices;
pub mod session;
mod shufersal;

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use pricewatch_core::{AppConfig, ChainDescriptor, FileReference, FileType, LinkType, PriceFiles};
use reqwest::Url;

use crate::error::{DiscoveryResult, ScraperError};
use crate::fetch::{FetchClient, FetchOptions};
use crate::latest::select_latest;
use session::{HttpSessionProvider, SessionProvider};

/// Everything a discovery call needs besides the chain itself.
#[derive(Clone)]
pub struct DiscoveryEnv {
    pub fetch: FetchOptions,
    pub session_provider: Arc<dyn SessionProvider>,
    /// Fixed "today" for walkback and date folders; `None` means the local
    /// calendar date at call time.
    pub today: Option<NaiveDate>,
}

impl std::fmt::Debug for DiscoveryEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryEnv")
            .field("fetch", &self.fetch)
            .field("today", &self.today)
            .finish_non_exhaustive()
    }
}

impl DiscoveryEnv {
    #[must_use]
    pub fn new(fetch: FetchOptions) -> Self {
        Self {
            session_provider: Arc::new(HttpSessionProvider::new(fetch.clone())),
            fetch,
            today: None,
        }
    }

    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(FetchOptions::from_config(config))
    }

    #[must_use]
    pub fn with_session_provider(mut self, provider: Arc<dyn SessionProvider>) -> Self {
        self.session_provider = provider;
        self
    }

    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// The caller's client when given, else a client scoped to one call.
    pub(crate) fn client<'a>(
        &self,
        shared: Option<&'a FetchClient>,
    ) -> DiscoveryResult<Cow<'a, FetchClient>> {
        match shared {
            Some(client) => Ok(Cow::Borrowed(client)),
            None => Ok(Cow::Owned(FetchClient::new(self.fetch.clone())?)),
        }
    }
}

/// The six ways publishing sites expose their files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Form POST per date, stepping back a day while empty.
    FormPostWalkback,
    /// File list embedded in a page script.
    EmbeddedJson,
    /// Login-gated file manager, crawled through a session provider.
    AuthenticatedCrawl,
    /// Paginated HTML directory without login.
    PaginatedCrawl,
    /// One static HTML table.
    StaticTable,
    /// HTML grid parameterised by category and store.
    QueryGrid,
}

impl Protocol {
    #[must_use]
    pub fn for_link_type(link_type: LinkType) -> Self {
        match link_type {
            LinkType::BinaProjects => Protocol::FormPostWalkback,
            LinkType::Carrefour => Protocol::EmbeddedJson,
            LinkType::PublishedPrices => Protocol::AuthenticatedCrawl,
            LinkType::HaziHinam => Protocol::PaginatedCrawl,
            LinkType::LaibCatalog => Protocol::StaticTable,
            LinkType::Shufersal => Protocol::QueryGrid,
        }
    }

    /// Request timeout used for every fetch the family makes.
    #[must_use]
    pub fn timeout(self) -> Duration {
        match self {
            Protocol::AuthenticatedCrawl => Duration::from_secs(80),
            Protocol::QueryGrid => Duration::from_secs(15),
            Protocol::FormPostWalkback
            | Protocol::EmbeddedJson
            | Protocol::PaginatedCrawl
            | Protocol::StaticTable => Duration::from_secs(60),
        }
    }

    pub(crate) async fn store_file(
        self,
        chain: &ChainDescriptor,
        env: &DiscoveryEnv,
        client: Option<&FetchClient>,
    ) -> DiscoveryResult<FileReference> {
        match self {
            Protocol::FormPostWalkback => binaprojects::store_file(chain, env, client).await,
            Protocol::EmbeddedJson => carrefour::store_file(chain, env, client).await,
            Protocol::AuthenticatedCrawl => publishedprices::store_file(chain, env).await,
            Protocol::PaginatedCrawl => hazihinam::store_file(chain, env, client).await,
            Protocol::StaticTable => laibcatalog::store_file(chain, env, client).await,
            Protocol::QueryGrid => shufersal::store_file(chain, env, client).await,
        }
    }

    pub(crate) async fn price_files(
        self,
        chain: &ChainDescriptor,
        store_code: &str,
        env: &DiscoveryEnv,
        client: Option<&FetchClient>,
    ) -> DiscoveryResult<PriceFiles> {
        match self {
            Protocol::FormPostWalkback => {
                binaprojects::price_files(chain, store_code, env, client).await
            }
            Protocol::EmbeddedJson => carrefour::price_files(chain, store_code, env, client).await,
            Protocol::AuthenticatedCrawl => {
                publishedprices::price_files(chain, store_code, env).await
            }
            Protocol::PaginatedCrawl => hazihinam::price_files(chain, store_code, env, client).await,
            Protocol::StaticTable => laibcatalog::price_files(chain, store_code, env, client).await,
            Protocol::QueryGrid => shufersal::price_files(chain, store_code, env, client).await,
        }
    }
}

/// Combine independently resolved per-type lookups into a [`PriceFiles`]
/// map.
///
/// A found file is kept. "Nothing published" (`Ok(None)` or
/// [`ScraperError::NoRecentFile`]) omits the key. Any other error is logged
/// and omits the key, unless every lookup failed that way, in which case
/// the first error is returned.
pub(crate) fn resolve_price_types(
    chain: &ChainDescriptor,
    store_code: &str,
    outcomes: Vec<(FileType, DiscoveryResult<Option<FileReference>>)>,
) -> DiscoveryResult<PriceFiles> {
    let total = outcomes.len();
    let mut files = PriceFiles::new();
    let mut errors = Vec::new();

    for (file_type, outcome) in outcomes {
        match outcome {
            Ok(Some(file)) => {
                files.insert(file_type, file);
            }
            Ok(None) | Err(ScraperError::NoRecentFile { .. }) => {
                tracing::debug!(chain = chain.alias, store_code, %file_type, "no file published");
            }
            Err(err) => {
                tracing::warn!(
                    chain = chain.alias,
                    store_code,
                    %file_type,
                    error = %err,
                    "price file lookup failed"
                );
                errors.push(err);
            }
        }
    }

    if total > 0 && errors.len() == total {
        return Err(errors.swap_remove(0));
    }
    Ok(files)
}

/// Latest link per price type among `links` of one store.
pub(crate) fn latest_per_type<K, F>(links: &[String], store_code: &str, key: F) -> PriceFiles
where
    K: Ord,
    F: Fn(&str) -> Option<K>,
{
    let mut files = PriceFiles::new();
    for file_type in FileType::PRICE_TYPES {
        let candidates = links
            .iter()
            .filter(|url| FileType::classify_price_file(file_name(url)) == Some(file_type));
        if let Some(url) = select_latest(candidates, |url| key(url.as_str())) {
            files.insert(file_type, FileReference::for_store(url.clone(), file_type, store_code));
        }
    }
    files
}

/// Last path segment of `url`, query and fragment removed.
pub(crate) fn file_name(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// The `index`-th dash-delimited token of `name`.
pub(crate) fn dash_token(name: &str, index: usize) -> Option<&str> {
    name.split('-').nth(index)
}

/// Store codes compare numerically (`"001"` equals `"1"`); non-numeric codes
/// compare as text.
pub(crate) fn same_store(token: &str, store_code: &str) -> bool {
    match (token.trim().parse::<u64>(), store_code.trim().parse::<u64>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => token.trim() == store_code.trim(),
    }
}

/// Resolve `href` against `base`.
pub(crate) fn absolutize(base: &str, href: &str) -> Option<String> {
    let base = Url::parse(base).ok()?;
    base.join(href).ok().map(String::from)
}

/// `base` with exactly one trailing slash.
pub(crate) fn site_root(base: &str) -> String {
    format!("{}/", base.trim_end_matches('/'))
}

/// Attach a crawl session's cookies to a discovered file.
pub(crate) fn with_session_cookies(
    file: FileReference,
    cookies: &BTreeMap<String, String>,
) -> FileReference {
    if cookies.is_empty() {
        file
    } else {
        file.with_cookies(cookies.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricewatch_core::find_chain;

    #[test]
    fn file_name_strips_path_and_query() {
        assert_eq!(
            file_name("https://blob.example/price/Price7290027600007-001-202406101000.gz?sv=1&sig=x"),
            "Price7290027600007-001-202406101000.gz"
        );
        assert_eq!(file_name("Upload\\Victory\\Stores7290696200003-000-202406100100.xml"), "Stores7290696200003-000-202406100100.xml");
        assert_eq!(file_name("plain.xml"), "plain.xml");
    }

    #[test]
    fn store_codes_compare_numerically() {
        assert!(same_store("001", "1"));
        assert!(same_store("123", "123"));
        assert!(!same_store("12", "123"));
        assert!(same_store("abc", "abc"));
    }

    #[test]
    fn site_root_has_one_trailing_slash() {
        assert_eq!(site_root("http://127.0.0.1:8080"), "http://127.0.0.1:8080/");
        assert_eq!(site_root("https://x.co.il/"), "https://x.co.il/");
    }

    #[test]
    fn absolutize_joins_relative_links() {
        assert_eq!(
            absolutize("https://laibcatalog.co.il/", "CompetitionRegulationsFiles/latest/x.xml").as_deref(),
            Some("https://laibcatalog.co.il/CompetitionRegulationsFiles/latest/x.xml")
        );
        assert_eq!(
            absolutize("https://a.co.il/", "https://b.co.il/x.gz").as_deref(),
            Some("https://b.co.il/x.gz")
        );
    }

    #[test]
    fn resolve_keeps_found_and_omits_missing() {
        let chain = find_chain("kingstore").unwrap();
        let outcomes = vec![
            (
                FileType::Price,
                Ok(Some(FileReference::for_store("https://x/p.gz", FileType::Price, "1"))),
            ),
            (FileType::PriceFull, Ok(None)),
            (
                FileType::Promo,
                Err(ScraperError::NoRecentFile {
                    file_type: FileType::Promo,
                    store_code: "1".into(),
                    days: 14,
                }),
            ),
            (
                FileType::PromoFull,
                Err(ScraperError::Transport {
                    url: "https://x".into(),
                    detail: "reset".into(),
                }),
            ),
        ];
        let files = resolve_price_types(chain, "1", outcomes).unwrap();
        assert_eq!(files.keys().copied().collect::<Vec<_>>(), vec![FileType::Price]);
    }

    #[test]
    fn resolve_fails_when_every_lookup_errored() {
        let chain = find_chain("kingstore").unwrap();
        let outcomes = FileType::PRICE_TYPES
            .into_iter()
            .enumerate()
            .map(|(i, t)| {
                (
                    t,
                    Err(ScraperError::HttpStatus {
                        status: 500 + u16::try_from(i).unwrap(),
                        url: "https://x".into(),
                        body: String::new(),
                    }),
                )
            })
            .collect();
        let err = resolve_price_types(chain, "1", outcomes).unwrap_err();
        assert!(matches!(err, ScraperError::HttpStatus { status: 500, .. }));
    }

    #[test]
    fn resolve_all_missing_is_an_empty_map() {
        let chain = find_chain("kingstore").unwrap();
        let outcomes = FileType::PRICE_TYPES.into_iter().map(|t| (t, Ok(None))).collect();
        assert!(resolve_price_types(chain, "1", outcomes).unwrap().is_empty());
    }

    #[test]
    fn latest_per_type_groups_by_file_name() {
        let links: Vec<String> = [
            "https://x/PriceFull7290000000000-001-202406100100.gz",
            "https://x/PriceFull7290000000000-001-202406110100.gz",
            "https://x/Price7290000000000-001-202406110100.gz",
            "https://x/PromoFull7290000000000-001-202406090100.gz",
        ]
        .map(String::from)
        .to_vec();
        let files = latest_per_type(&links, "001", |url| dash_token(file_name(url), 2).map(str::to_owned));
        assert_eq!(files.len(), 3);
        assert!(files[&FileType::PriceFull].url.contains("202406110100"));
        assert!(files[&FileType::Price].url.contains("Price7290"));
        assert!(!files.contains_key(&FileType::Promo));
        assert_eq!(files[&FileType::PromoFull].store_code.as_deref(), Some("001"));
    }

    #[test]
    fn protocol_timeouts() {
        assert_eq!(Protocol::QueryGrid.timeout(), Duration::from_secs(15));
        assert_eq!(Protocol::AuthenticatedCrawl.timeout(), Duration::from_secs(80));
        assert_eq!(
            Protocol::for_link_type(LinkType::HaziHinam),
            Protocol::PaginatedCrawl
        );
    }
}
