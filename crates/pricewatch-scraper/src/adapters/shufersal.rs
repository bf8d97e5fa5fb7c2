//! HTML grid filtered by category and store through query parameters.

use futures::future::join_all;
use pricewatch_core::{ChainDescriptor, FileReference, FileType, PriceFiles};
use scraper::{Html, Selector};

use super::{absolutize, dash_token, file_name, resolve_price_types, site_root, DiscoveryEnv, Protocol};
use crate::error::{DiscoveryResult, ScraperError};
use crate::fetch::{FetchClient, FetchRequest};
use crate::latest::select_latest;

const GRID_SELECTOR: &str = "table.webgrid tbody tr td a";

fn category(file_type: FileType) -> u8 {
    match file_type {
        FileType::Price => 1,
        FileType::PriceFull => 2,
        FileType::Promo => 3,
        FileType::PromoFull => 4,
        FileType::Stores => 5,
    }
}

fn grid_url(chain: &ChainDescriptor, file_type: FileType, store_code: Option<&str>) -> String {
    let root = site_root(&chain.base_url);
    let cat = category(file_type);
    match store_code {
        Some(store) => format!("{root}FileObject/UpdateCategory?catID={cat}&storeId={store}"),
        None => format!("{root}FileObject/UpdateCategory?catID={cat}"),
    }
}

pub(super) async fn store_file(
    chain: &ChainDescriptor,
    env: &DiscoveryEnv,
    client: Option<&FetchClient>,
) -> DiscoveryResult<FileReference> {
    let client = env.client(client)?;
    latest_link(chain, &client, FileType::Stores, None)
        .await?
        .map(FileReference::stores)
        .ok_or_else(|| ScraperError::PatternMismatch {
            url: grid_url(chain, FileType::Stores, None),
            pattern: GRID_SELECTOR.to_owned(),
        })
}

pub(super) async fn price_files(
    chain: &ChainDescriptor,
    store_code: &str,
    env: &DiscoveryEnv,
    client: Option<&FetchClient>,
) -> DiscoveryResult<PriceFiles> {
    let client = env.client(client)?;
    let client = &*client;
    let lookups = FileType::PRICE_TYPES.map(|file_type| async move {
        let outcome = latest_link(chain, client, file_type, Some(store_code))
            .await
            .map(|url| url.map(|url| FileReference::for_store(url, file_type, store_code)));
        (file_type, outcome)
    });
    resolve_price_types(chain, store_code, join_all(lookups).await)
}

async fn latest_link(
    chain: &ChainDescriptor,
    client: &FetchClient,
    file_type: FileType,
    store_code: Option<&str>,
) -> DiscoveryResult<Option<String>> {
    let url = grid_url(chain, file_type, store_code);
    let request = FetchRequest::get(url.as_str()).timeout(Protocol::QueryGrid.timeout());
    let html = client.fetch_text(&request).await?;
    let links = grid_links(&html, &url);
    tracing::debug!(chain = chain.alias, %file_type, count = links.len(), "grid links");
    Ok(select_latest(links, |link| date_token(link)))
}

/// Date token of a grid file name (`Price<chain>-<store>-<date>.gz`).
fn date_token(url: &str) -> Option<String> {
    let token = dash_token(file_name(url), 2)?;
    Some(token.split('.').next().unwrap_or(token).to_owned())
}

fn grid_links(html: &str, page_url: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let anchors = Selector::parse(GRID_SELECTOR).expect("valid selector");
    document
        .select(&anchors)
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .filter_map(|href| absolutize(page_url, href))
        .collect()
}
