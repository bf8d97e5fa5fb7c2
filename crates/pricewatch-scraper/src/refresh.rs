//! Bulk store-list refresh across chains.
//!
//! Chains run with bounded concurrency, each with its own scoped client.
//! Every chain reports its own outcome; one chain failing never stops the
//! others from being fetched.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use pricewatch_core::{ChainDescriptor, StoreRecord};
use thiserror::Error;

use crate::adapters::DiscoveryEnv;
use crate::download::store_records;
use crate::error::ScraperError;
use crate::registry::Chain;

pub const DEFAULT_MAX_CONCURRENT_CHAINS: usize = 5;

/// Destination for normalized store rows. Implementations must ignore rows
/// whose `(chain_code, store_code)` is already stored.
#[async_trait]
pub trait StoreSink: Send + Sync {
    /// Persist `records` for `chain`, returning how many were new.
    async fn persist(
        &self,
        chain: &ChainDescriptor,
        records: &[StoreRecord],
    ) -> Result<usize, SinkError>;
}

#[derive(Debug, Clone, Error)]
#[error("store sink failed: {0}")]
pub struct SinkError(pub String);

#[derive(Debug, Clone, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Discovery(#[from] ScraperError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    /// Fetched fine but not persisted because another chain failed.
    #[error("not persisted: refresh aborted by another chain's failure")]
    Aborted,
}

/// What happens to successful chains when some chain fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// Persist every chain that succeeded.
    #[default]
    Isolated,
    /// Persist nothing unless every chain succeeded.
    AllOrNothing,
}

#[derive(Debug, Clone, Copy)]
pub struct RefreshOptions {
    pub max_concurrent_chains: usize,
    pub policy: RefreshPolicy,
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self {
            max_concurrent_chains: DEFAULT_MAX_CONCURRENT_CHAINS,
            policy: RefreshPolicy::default(),
        }
    }
}

#[derive(Debug)]
pub struct ChainOutcome {
    pub alias: &'static str,
    pub chain_code: &'static str,
    /// Number of newly persisted stores.
    pub result: Result<usize, RefreshError>,
}

#[derive(Debug, Default)]
pub struct RefreshReport {
    /// One entry per chain, in the order the chains were given.
    pub outcomes: Vec<ChainOutcome>,
}

impl RefreshReport {
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    #[must_use]
    pub fn stores_persisted(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .sum()
    }
}

/// Refresh the store lists of `chains` into `sink`.
pub async fn refresh_stores(
    chains: &[&Chain],
    env: &DiscoveryEnv,
    sink: &dyn StoreSink,
    options: RefreshOptions,
) -> RefreshReport {
    let max_concurrent = options.max_concurrent_chains.max(1);
    let persist_now = options.policy == RefreshPolicy::Isolated;

    let mut fetched: Vec<(usize, Result<Vec<StoreRecord>, RefreshError>, Option<usize>)> =
        stream::iter(chains.iter().enumerate())
            .map(|(index, chain)| async move {
                let records = store_records(chain, env, None)
                    .await
                    .map_err(RefreshError::from);
                if !persist_now {
                    return (index, records, None);
                }
                match records {
                    Ok(records) => match sink.persist(chain.descriptor(), &records).await {
                        Ok(inserted) => (index, Ok(records), Some(inserted)),
                        Err(e) => (index, Err(e.into()), None),
                    },
                    Err(e) => (index, Err(e), None),
                }
            })
            .buffer_unordered(max_concurrent)
            .collect()
            .await;
    fetched.sort_by_key(|(index, _, _)| *index);

    let any_failed = fetched.iter().any(|(_, result, _)| result.is_err());
    let mut outcomes = Vec::with_capacity(fetched.len());
    for (index, result, inserted) in fetched {
        let chain = chains[index];
        let result = match (result, inserted) {
            (Err(e), _) => Err(e),
            (Ok(_), Some(inserted)) => Ok(inserted),
            (Ok(_), None) if any_failed => Err(RefreshError::Aborted),
            (Ok(records), None) => sink
                .persist(chain.descriptor(), &records)
                .await
                .map_err(RefreshError::from),
        };
        match &result {
            Ok(inserted) => tracing::debug!(chain = chain.alias(), inserted, "chain refreshed"),
            Err(RefreshError::Aborted) => {
                tracing::warn!(chain = chain.alias(), "chain refresh discarded");
            }
            Err(e) => tracing::error!(chain = chain.alias(), error = %e, "chain refresh failed"),
        }
        outcomes.push(ChainOutcome {
            alias: chain.alias(),
            chain_code: chain.chain_code(),
            result,
        });
    }

    let report = RefreshReport { outcomes };
    if report.failed() > 0 {
        tracing::warn!(
            failed_chains = report.failed(),
            total_chains = chains.len(),
            "some chains failed during refresh"
        );
    }
    report
}
