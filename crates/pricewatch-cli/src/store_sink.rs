//! `refresh` command: a JSON-file store sink and the run that feeds it.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pricewatch_core::{AppConfig, ChainDescriptor, StoreRecord};
use pricewatch_scraper::{
    find, refresh_stores, registry, Chain, DiscoveryEnv, RefreshOptions, RefreshPolicy, SinkError,
    StoreSink,
};
use tokio::sync::Mutex;

const STORES_FILE: &str = "stores.json";

type StoreKey = (String, String);

/// Keeps every known store in `{data_dir}/stores.json`, keyed by
/// `(chain_code, store_code)`. Existing keys are never overwritten.
pub(crate) struct JsonStoreSink {
    path: PathBuf,
    rows: Mutex<BTreeMap<StoreKey, StoreRecord>>,
}

impl JsonStoreSink {
    /// Open the sink under `data_dir`, loading any stores already on disk.
    pub(crate) async fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let path = data_dir.join(STORES_FILE);
        let rows = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<Vec<StoreRecord>>(&bytes)?
                .into_iter()
                .map(|r| ((r.chain_code.clone(), r.store_code.clone()), r))
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            rows: Mutex::new(rows),
        })
    }

    pub(crate) async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    async fn write(&self, rows: &BTreeMap<StoreKey, StoreRecord>) -> Result<(), SinkError> {
        let records: Vec<&StoreRecord> = rows.values().collect();
        let json = serde_json::to_vec_pretty(&records).map_err(|e| SinkError(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SinkError(format!("{}: {e}", parent.display())))?;
        }
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| SinkError(format!("{}: {e}", self.path.display())))
    }
}

#[async_trait]
impl StoreSink for JsonStoreSink {
    async fn persist(
        &self,
        chain: &ChainDescriptor,
        records: &[StoreRecord],
    ) -> Result<usize, SinkError> {
        let mut rows = self.rows.lock().await;
        let mut updated = rows.clone();
        let mut inserted = 0;
        for record in records {
            let key = (record.chain_code.clone(), record.store_code.clone());
            if let Entry::Vacant(slot) = updated.entry(key) {
                slot.insert(record.clone());
                inserted += 1;
            }
        }
        if inserted > 0 {
            // Memory only moves forward once the file holds the same rows.
            self.write(&updated).await?;
            *rows = updated;
        }
        tracing::debug!(chain = chain.alias, inserted, "persisted stores");
        Ok(inserted)
    }
}

/// Select the chains for a refresh run: one chain when `chain_filter` is
/// given, every registered chain otherwise.
fn select_chains(chain_filter: Option<&str>) -> anyhow::Result<Vec<&'static Chain>> {
    match chain_filter {
        Some(key) => Ok(vec![find(key)?]),
        None => Ok(registry().iter().collect()),
    }
}

pub(crate) async fn run_refresh(
    config: &AppConfig,
    env: &DiscoveryEnv,
    chain_filter: Option<&str>,
    policy: RefreshPolicy,
) -> anyhow::Result<()> {
    let chains = select_chains(chain_filter)?;
    let sink = JsonStoreSink::open(&config.data_dir).await?;
    let options = RefreshOptions {
        max_concurrent_chains: config.max_concurrent_chains,
        policy,
    };

    tracing::info!(
        chains = chains.len(),
        known_stores = sink.len().await,
        ?policy,
        "starting store refresh"
    );
    let report = refresh_stores(&chains, env, &sink, options).await;

    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(inserted) => println!("{:<14} ok    {inserted} new stores", outcome.alias),
            Err(e) => println!("{:<14} error {e}", outcome.alias),
        }
    }
    tracing::info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        stores_persisted = report.stores_persisted(),
        "store refresh complete"
    );

    if report.failed() > 0 {
        anyhow::bail!(
            "{} of {} chains failed to refresh",
            report.failed(),
            report.outcomes.len()
        );
    }
    Ok(())
}
