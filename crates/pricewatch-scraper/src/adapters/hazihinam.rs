//! Paginated HTML directory, no login.
//!
//! The first page of `?t=<type>` carries the pagination control; the
//! remaining pages are fetched concurrently once the count is known.

use futures::stream::{self, StreamExt, TryStreamExt};
use pricewatch_core::{ChainDescriptor, FileReference, FileType, PriceFiles};
use scraper::{Html, Selector};

use super::{
    dash_token, file_name, latest_per_type, resolve_price_types, same_store, DiscoveryEnv, Protocol,
};
use crate::error::{DiscoveryResult, ScraperError};
use crate::fetch::{FetchClient, FetchRequest};
use crate::latest::{date_time_token, select_latest};

/// Files are served from blob storage, never from the listing host.
const ASSET_PREFIX: &str = "https://hazihinamprod01.blob.core.windows.net/regulatories/";

const PAGE_CONCURRENCY: usize = 8;

/// Listing categories: `t=1` prices, `t=2` promotions, `t=3` stores.
const PRICE_CATEGORY: u8 = 1;
const PROMO_CATEGORY: u8 = 2;
const STORES_CATEGORY: u8 = 3;

pub(super) async fn store_file(
    chain: &ChainDescriptor,
    env: &DiscoveryEnv,
    client: Option<&FetchClient>,
) -> DiscoveryResult<FileReference> {
    let client = env.client(client)?;
    let links = category_links(chain, &client, STORES_CATEGORY).await?;
    select_latest(links, |url| date_time_token(file_name(url)))
        .map(FileReference::stores)
        .ok_or_else(|| ScraperError::PatternMismatch {
            url: category_url(chain, STORES_CATEGORY, 1),
            pattern: r"(\d{8})-(\d{6})".to_owned(),
        })
}

pub(super) async fn price_files(
    chain: &ChainDescriptor,
    store_code: &str,
    env: &DiscoveryEnv,
    client: Option<&FetchClient>,
) -> DiscoveryResult<PriceFiles> {
    let client = env.client(client)?;
    let (prices, promos) = futures::join!(
        category_links(chain, &client, PRICE_CATEGORY),
        category_links(chain, &client, PROMO_CATEGORY),
    );

    // A failed listing fails only the file types it lists.
    let mut outcomes = Vec::with_capacity(FileType::PRICE_TYPES.len());
    for (listing, types) in [
        (prices, [FileType::Price, FileType::PriceFull]),
        (promos, [FileType::Promo, FileType::PromoFull]),
    ] {
        match listing {
            Ok(links) => {
                let links: Vec<String> = links
                    .into_iter()
                    .filter(|url| {
                        dash_token(file_name(url), 2).is_some_and(|t| same_store(t, store_code))
                    })
                    .collect();
                let mut files = latest_per_type(&links, store_code, |url| {
                    date_time_token(file_name(url))
                });
                outcomes.extend(types.map(|file_type| (file_type, Ok(files.remove(&file_type)))));
            }
            Err(err) => {
                outcomes.extend(types.map(|file_type| (file_type, Err(err.clone()))));
            }
        }
    }
    resolve_price_types(chain, store_code, outcomes)
}

fn category_url(chain: &ChainDescriptor, category: u8, page: usize) -> String {
    if page <= 1 {
        format!("{}?t={category}", chain.base_url)
    } else {
        format!("{}?p={page}&t={category}", chain.base_url)
    }
}

/// Every asset link of one category, in page order.
async fn category_links(
    chain: &ChainDescriptor,
    client: &FetchClient,
    category: u8,
) -> DiscoveryResult<Vec<String>> {
    let timeout = Protocol::PaginatedCrawl.timeout();
    let first = client
        .fetch_text(&FetchRequest::get(category_url(chain, category, 1)).timeout(timeout))
        .await?;
    let (pages, mut links) = parse_page(&first);
    let pages = pages.unwrap_or_else(|| {
        tracing::warn!(
            chain = chain.alias,
            category,
            "no pagination control on first page, reading one page"
        );
        1
    });
    tracing::debug!(chain = chain.alias, category, pages, "listing pages");

    let rest: Vec<Vec<String>> = stream::iter(2..=pages)
        .map(|page| {
            let request = FetchRequest::get(category_url(chain, category, page)).timeout(timeout);
            async move {
                let html = client.fetch_text(&request).await?;
                Ok::<_, ScraperError>(parse_page(&html).1)
            }
        })
        .buffered(PAGE_CONCURRENCY)
        .try_collect()
        .await?;
    links.extend(rest.into_iter().flatten());
    Ok(links)
}

/// Page count from the pagination control, plus the page's asset links.
///
/// The count is the largest numeric label, else the number of entries;
/// `None` when the control is missing.
fn parse_page(html: &str) -> (Option<usize>, Vec<String>) {
    let document = Html::parse_document(html);
    let items = Selector::parse("ul.pagination li").expect("valid selector");
    let anchors = Selector::parse("a[href]").expect("valid selector");

    let labels: Vec<String> = document
        .select(&items)
        .map(|li| li.text().collect::<String>().trim().to_owned())
        .collect();
    let pages = if labels.is_empty() {
        None
    } else {
        labels
            .iter()
            .filter_map(|label| label.parse::<usize>().ok())
            .max()
            .or(Some(labels.len()))
    };

    let links = document
        .select(&anchors)
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|href| href.starts_with(ASSET_PREFIX))
        .map(str::to_owned)
        .collect();
    (pages, links)
}
