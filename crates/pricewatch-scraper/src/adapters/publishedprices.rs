//! Login-gated file manager shared by several chains.
//!
//! Each call opens a fresh session through the environment's
//! [`SessionProvider`](super::session::SessionProvider); the session's
//! cookies travel with every discovered file so the download happens inside
//! the same session.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use pricewatch_core::{ChainDescriptor, FileReference, FileType, LinkPattern, PriceFiles};
use regex::Regex;

use super::session::{CrawlRequest, CrawlSession};
use super::{same_store, site_root, with_session_cookies, DiscoveryEnv, Protocol};
use crate::error::{DiscoveryResult, ScraperError};
use crate::latest::{padded_timestamp, select_latest};

static STORE_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{8}-\d{6})\.xml$").expect("valid regex"));
static STORE_FILE_COMPACT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Stores\d+-(\d{12})\.xml$").expect("valid regex"));

static DEFAULT_PRICE_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/file/d/(PriceFull|Price|PromoFull|Promo)\d+(?:-\d+)*-(\d+)-(\d{8})-?(\d{4,6})")
        .expect("valid regex")
});
static ALTERNATE_PRICE_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(Price|Promo|PriceFull|PromoFull)\d+-\d+-(\d+)-(\d{8})-(\d{6})\.gz")
        .expect("valid regex")
});

fn price_pattern(pattern: LinkPattern) -> &'static Regex {
    match pattern {
        LinkPattern::Default => &DEFAULT_PRICE_FILE,
        LinkPattern::Alternate => &ALTERNATE_PRICE_FILE,
    }
}

pub(super) async fn store_file(
    chain: &ChainDescriptor,
    env: &DiscoveryEnv,
) -> DiscoveryResult<FileReference> {
    let session = crawl(chain, env).await?;
    let url = latest_store_link(&session.links).ok_or_else(|| ScraperError::PatternMismatch {
        url: crawl_target(chain),
        pattern: STORE_FILE.as_str().to_owned(),
    })?;
    Ok(with_session_cookies(
        FileReference::stores(url.clone()),
        &session.cookies,
    ))
}

pub(super) async fn price_files(
    chain: &ChainDescriptor,
    store_code: &str,
    env: &DiscoveryEnv,
) -> DiscoveryResult<PriceFiles> {
    let session = crawl(chain, env).await?;
    let files = latest_price_links(&session.links, store_code, price_pattern(chain.link_pattern))
        .into_iter()
        .map(|(file_type, file)| (file_type, with_session_cookies(file, &session.cookies)))
        .collect();
    Ok(files)
}

fn crawl_target(chain: &ChainDescriptor) -> String {
    format!("{}file", site_root(&chain.base_url))
}

async fn crawl(chain: &ChainDescriptor, env: &DiscoveryEnv) -> DiscoveryResult<CrawlSession> {
    let credentials = chain.credentials.ok_or_else(|| ScraperError::Unsupported {
        operation: "authenticated crawl without credentials",
        chain: chain.alias.to_owned(),
    })?;
    let request = CrawlRequest {
        login_url: format!("{}login", site_root(&chain.base_url)),
        target_url: crawl_target(chain),
        username: credentials.username.to_owned(),
        password: credentials.password.map(str::to_owned),
        timeout: Protocol::AuthenticatedCrawl.timeout(),
    };
    let session = env.session_provider.crawl(&request).await?;
    tracing::debug!(
        chain = chain.alias,
        links = session.links.len(),
        cookies = session.cookies.len(),
        "crawled file manager"
    );
    Ok(session)
}

/// Latest store-list link: `YYYYMMDD-HHMMSS.xml` names first, then the
/// compact `Stores<code>-YYYYMMDDHHMM.xml` form.
fn latest_store_link(links: &[String]) -> Option<&String> {
    select_latest(links, |url| {
        let caps = STORE_FILE.captures(url)?;
        NaiveDateTime::parse_from_str(&caps[1], "%Y%m%d-%H%M%S").ok()
    })
    .or_else(|| {
        select_latest(links, |url| {
            let caps = STORE_FILE_COMPACT.captures(url)?;
            NaiveDateTime::parse_from_str(&caps[1], "%Y%m%d%H%M").ok()
        })
    })
}

/// Latest link per price type for `store_code`, read through `pattern`.
fn latest_price_links(links: &[String], store_code: &str, pattern: &Regex) -> PriceFiles {
    let mut latest: Vec<(FileType, NaiveDateTime, &String)> = Vec::new();
    for url in links {
        let Some(caps) = pattern.captures(url) else {
            continue;
        };
        let Some(file_type) = FileType::from_key(&caps[1]) else {
            continue;
        };
        if !same_store(&caps[2], store_code) {
            continue;
        }
        let Some(stamp) = padded_timestamp(&caps[3], Some(&caps[4])) else {
            continue;
        };
        match latest.iter_mut().find(|(t, _, _)| *t == file_type) {
            Some(entry) if stamp > entry.1 => *entry = (file_type, stamp, url),
            Some(_) => {}
            None => latest.push((file_type, stamp, url)),
        }
    }
    latest
        .into_iter()
        .map(|(file_type, _, url)| {
            (
                file_type,
                FileReference::for_store(url.clone(), file_type, store_code),
            )
        })
        .collect()
}
