//! Read-only discovery commands. Each prints JSON to stdout.

use pricewatch_core::{FileType, PriceFiles};
use pricewatch_scraper::{find, registry, DiscoveryEnv, Envelope};
use serde_json::{json, Map, Value};

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `price_files` keyed by the lowercase file-type name.
fn keyed(files: &PriceFiles) -> Map<String, Value> {
    files
        .iter()
        .map(|(file_type, file)| (file_type.key().to_owned(), json!(file.url)))
        .collect()
}

pub(crate) fn run_chains() -> anyhow::Result<()> {
    let chains: Vec<Value> = registry()
        .iter()
        .map(|chain| {
            let d = chain.descriptor();
            json!({
                "chain_code": d.chain_code,
                "alias": d.alias,
                "name": d.name,
                "link_type": d.link_type,
                "base_url": d.base_url,
            })
        })
        .collect();
    print_json(&chains)
}

pub(crate) async fn run_store_file(env: &DiscoveryEnv, chain: &str) -> anyhow::Result<()> {
    let chain = find(chain)?;
    let envelope: Envelope<String> = chain
        .store_file(env, None)
        .await
        .map(|file| file.url)
        .into();
    print_json(&envelope)
}

pub(crate) async fn run_price_files(
    env: &DiscoveryEnv,
    chain: &str,
    store: &str,
) -> anyhow::Result<()> {
    let chain = find(chain)?;
    let envelope: Envelope<Map<String, Value>> = chain
        .price_files(store, env, None)
        .await
        .map(|files| keyed(&files))
        .into();
    print_json(&envelope)
}

pub(crate) async fn run_stores(env: &DiscoveryEnv, chain: &str) -> anyhow::Result<()> {
    let chain = find(chain)?;
    let records = pricewatch_scraper::store_records(chain, env, None).await?;
    tracing::info!(chain = chain.alias(), stores = records.len(), "store records");
    print_json(&records)
}

pub(crate) async fn run_items(
    env: &DiscoveryEnv,
    chain: &str,
    store: &str,
    promo: bool,
) -> anyhow::Result<()> {
    let chain = find(chain)?;
    let records = if promo {
        pricewatch_scraper::promotions(chain, store, FileType::PromoFull, env, None).await?
    } else {
        pricewatch_scraper::price_items(chain, store, FileType::PriceFull, env, None).await?
    };
    tracing::info!(chain = chain.alias(), store, records = records.len(), "decoded file");
    print_json(&records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricewatch_core::FileReference;

    #[test]
    fn price_files_are_keyed_by_lowercase_type() {
        let mut files = PriceFiles::new();
        files.insert(
            FileType::PriceFull,
            FileReference::for_store("https://x/PriceFull.gz", FileType::PriceFull, "1"),
        );
        files.insert(
            FileType::Promo,
            FileReference::for_store("https://x/Promo.gz", FileType::Promo, "1"),
        );
        let map = keyed(&files);
        assert_eq!(map.len(), 2);
        assert_eq!(map["pricefull"], "https://x/PriceFull.gz");
        assert_eq!(map["promo"], "https://x/Promo.gz");
    }
}
