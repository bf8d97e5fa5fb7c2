//! One static download table shared by several chains.

use pricewatch_core::{ChainDescriptor, FileReference, PriceFiles};
use scraper::{Html, Selector};

use super::{absolutize, dash_token, file_name, latest_per_type, same_store, DiscoveryEnv, Protocol};
use crate::error::{DiscoveryResult, ScraperError};
use crate::fetch::{FetchClient, FetchRequest};
use crate::latest::select_latest;

pub(super) async fn store_file(
    chain: &ChainDescriptor,
    env: &DiscoveryEnv,
    client: Option<&FetchClient>,
) -> DiscoveryResult<FileReference> {
    let links = chain_links(chain, env, client).await?;
    let stores: Vec<String> = links
        .into_iter()
        .filter(|url| url.to_lowercase().contains("store"))
        .collect();
    let latest = if stores.len() == 1 {
        stores.into_iter().next()
    } else {
        select_latest(stores, |url| dash_token(file_name(url), 2).map(str::to_owned))
    };
    latest
        .map(FileReference::stores)
        .ok_or_else(|| ScraperError::PatternMismatch {
            url: chain.base_url.to_string(),
            pattern: format!("store file for {}", chain.chain_code),
        })
}

pub(super) async fn price_files(
    chain: &ChainDescriptor,
    store_code: &str,
    env: &DiscoveryEnv,
    client: Option<&FetchClient>,
) -> DiscoveryResult<PriceFiles> {
    let links: Vec<String> = chain_links(chain, env, client)
        .await?
        .into_iter()
        .filter(|url| dash_token(file_name(url), 1).is_some_and(|t| same_store(t, store_code)))
        .collect();
    Ok(latest_per_type(&links, store_code, |url| {
        dash_token(file_name(url), 2).map(str::to_owned)
    }))
}

/// Links of the download table that belong to `chain`.
async fn chain_links(
    chain: &ChainDescriptor,
    env: &DiscoveryEnv,
    client: Option<&FetchClient>,
) -> DiscoveryResult<Vec<String>> {
    let client = env.client(client)?;
    let request = FetchRequest::get(chain.base_url.as_ref()).timeout(Protocol::StaticTable.timeout());
    let html = client.fetch_text(&request).await?;
    let links: Vec<String> = table_links(&html, &chain.base_url)
        .into_iter()
        .filter(|url| url.contains(chain.chain_code))
        .collect();
    tracing::debug!(chain = chain.alias, count = links.len(), "download table links");
    Ok(links)
}

/// First real link of every table row after the header, with Windows path
/// separators turned into URL separators and resolved against `base`.
fn table_links(html: &str, base: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let rows = Selector::parse("#download_content table tr").expect("valid selector");
    let anchors = Selector::parse("a[href]").expect("valid selector");

    document
        .select(&rows)
        .skip(1)
        .filter_map(|row| {
            row.select(&anchors)
                .filter_map(|a| a.value().attr("href"))
                .find(|href| !href.trim_start().starts_with("javascript:"))
        })
        .filter_map(|href| absolutize(base, &href.trim().replace('\\', "/")))
        .collect()
}
