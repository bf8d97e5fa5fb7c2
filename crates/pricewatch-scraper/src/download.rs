//! Download discovered files and turn them into records.

use pricewatch_core::{FileReference, FileType, StoreRecord};
use serde_json::Value;

use crate::adapters::DiscoveryEnv;
use crate::decode::decode;
use crate::document;
use crate::error::{DiscoveryResult, ScraperError};
use crate::fetch::{FetchClient, FetchRequest};
use crate::registry::Chain;

/// Fetch `file` with its session cookies and run the decode pipeline with
/// the chain's options.
///
/// # Errors
///
/// Fetch errors, [`ScraperError::NoXmlInArchive`] and
/// [`ScraperError::MalformedDocument`].
pub async fn download_document(
    chain: &Chain,
    file: &FileReference,
    env: &DiscoveryEnv,
    client: Option<&FetchClient>,
) -> DiscoveryResult<Value> {
    let client = env.client(client)?;
    let request = FetchRequest::get(file.url.as_str())
        .cookies(&file.cookies)
        .timeout(chain.protocol().timeout());
    let raw = client.fetch(&request).await?;
    let document = decode(raw, chain.decode_options())?;
    tracing::debug!(chain = chain.alias(), url = %file.url, file_type = %file.file_type, "decoded file");
    Ok(document)
}

/// Resolve, download and normalize the chain's current store list.
///
/// # Errors
///
/// Any discovery, fetch or decode error.
pub async fn store_records(
    chain: &Chain,
    env: &DiscoveryEnv,
    client: Option<&FetchClient>,
) -> DiscoveryResult<Vec<StoreRecord>> {
    let client = env.client(client)?;
    let file = chain.store_file(env, Some(&*client)).await?;
    let document = download_document(chain, &file, env, Some(&*client)).await?;
    chain.to_store_records(&document)
}

async fn store_document(
    chain: &Chain,
    store_code: &str,
    file_type: FileType,
    env: &DiscoveryEnv,
    client: Option<&FetchClient>,
) -> DiscoveryResult<Value> {
    let client = env.client(client)?;
    let files = chain.price_files(store_code, env, Some(&*client)).await?;
    let file = files.get(&file_type).ok_or_else(|| ScraperError::NoPriceFiles {
        chain: chain.alias().to_owned(),
        store_code: store_code.to_owned(),
        file_type,
    })?;
    download_document(chain, file, env, Some(&*client)).await
}

/// Items of the store's latest `file_type` price file, each tagged with the
/// chain alias.
///
/// # Errors
///
/// [`ScraperError::NoPriceFiles`] when the store has no file of that type,
/// plus any discovery, fetch or decode error.
pub async fn price_items(
    chain: &Chain,
    store_code: &str,
    file_type: FileType,
    env: &DiscoveryEnv,
    client: Option<&FetchClient>,
) -> DiscoveryResult<Vec<Value>> {
    let document = store_document(chain, store_code, file_type, env, client).await?;
    document::price_items(&document, chain.alias())
}

/// Promotions of the store's latest `file_type` promo file, minus the
/// chain's blacklisted promotions.
///
/// # Errors
///
/// Same as [`price_items`].
pub async fn promotions(
    chain: &Chain,
    store_code: &str,
    file_type: FileType,
    env: &DiscoveryEnv,
    client: Option<&FetchClient>,
) -> DiscoveryResult<Vec<Value>> {
    let document = store_document(chain, store_code, file_type, env, client).await?;
    document::promotions(&document, chain.alias(), &chain.promo_blacklist())
}
