//! The fixed set of chains, paired with their protocol family.

use std::collections::HashSet;
use std::sync::LazyLock;

use pricewatch_core::{ChainDescriptor, FileReference, PriceFiles, StoreRecord, CHAINS};
use serde_json::Value;

use crate::adapters::{DiscoveryEnv, Protocol};
use crate::decode::DecodeOptions;
use crate::document;
use crate::error::{DiscoveryResult, ScraperError};
use crate::fetch::FetchClient;

/// A chain's static configuration and the family that serves it.
#[derive(Debug, Clone)]
pub struct Chain {
    descriptor: ChainDescriptor,
    protocol: Protocol,
}

impl Chain {
    #[must_use]
    pub fn new(descriptor: ChainDescriptor) -> Self {
        let protocol = Protocol::for_link_type(descriptor.link_type);
        Self {
            descriptor,
            protocol,
        }
    }

    #[must_use]
    pub fn descriptor(&self) -> &ChainDescriptor {
        &self.descriptor
    }

    #[must_use]
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    #[must_use]
    pub fn alias(&self) -> &'static str {
        self.descriptor.alias
    }

    #[must_use]
    pub fn chain_code(&self) -> &'static str {
        self.descriptor.chain_code
    }

    /// Locate the chain's current store-list file.
    ///
    /// `client` is reused when given (shared cookies and pooled
    /// connections); otherwise the call owns a client for its duration.
    ///
    /// # Errors
    ///
    /// Any [`ScraperError`] the chain's family reports.
    pub async fn store_file(
        &self,
        env: &DiscoveryEnv,
        client: Option<&FetchClient>,
    ) -> DiscoveryResult<FileReference> {
        let result = self.protocol.store_file(&self.descriptor, env, client).await;
        match &result {
            Ok(file) => tracing::debug!(chain = self.alias(), url = %file.url, "store file"),
            Err(e) => tracing::debug!(chain = self.alias(), error = %e, "store file lookup failed"),
        }
        result
    }

    /// Locate the latest price and promo files of one store. Types with no
    /// published file are absent from the map.
    ///
    /// # Errors
    ///
    /// Any [`ScraperError`] the chain's family reports when no type could be
    /// resolved at all.
    pub async fn price_files(
        &self,
        store_code: &str,
        env: &DiscoveryEnv,
        client: Option<&FetchClient>,
    ) -> DiscoveryResult<PriceFiles> {
        let result = self
            .protocol
            .price_files(&self.descriptor, store_code, env, client)
            .await;
        if let Ok(files) = &result {
            tracing::debug!(
                chain = self.alias(),
                store_code,
                types = files.len(),
                "price files"
            );
        }
        result
    }

    #[must_use]
    pub fn promo_blacklist(&self) -> HashSet<String> {
        self.descriptor
            .promo_blacklist
            .iter()
            .map(|id| (*id).to_owned())
            .collect()
    }

    /// # Errors
    ///
    /// [`ScraperError::MalformedDocument`] when the document does not have
    /// the chain's store layout.
    pub fn to_store_records(&self, document: &Value) -> DiscoveryResult<Vec<StoreRecord>> {
        document::to_store_records(&self.descriptor, document)
    }

    #[must_use]
    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            repair_missing_subchain: self.descriptor.repair_missing_subchain,
        }
    }
}

static REGISTRY: LazyLock<Vec<Chain>> =
    LazyLock::new(|| CHAINS.iter().cloned().map(Chain::new).collect());

/// Every known chain, in table order.
#[must_use]
pub fn registry() -> &'static [Chain] {
    &REGISTRY
}

/// Look a chain up by chain code or alias.
///
/// # Errors
///
/// [`ScraperError::UnknownChain`] when nothing matches.
pub fn find(key: &str) -> DiscoveryResult<&'static Chain> {
    let key = key.trim();
    registry()
        .iter()
        .find(|chain| chain.chain_code() == key || chain.alias().eq_ignore_ascii_case(key))
        .ok_or_else(|| ScraperError::UnknownChain(key.to_owned()))
}
