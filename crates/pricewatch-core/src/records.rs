//! Shared shapes produced by the acquisition layer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Kind of file a chain publishes. "Full" variants are complete snapshots,
/// the others are deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Stores,
    Price,
    PriceFull,
    Promo,
    PromoFull,
}

impl FileType {
    /// The four per-store file types, in the order adapters resolve them.
    pub const PRICE_TYPES: [FileType; 4] = [
        FileType::Price,
        FileType::PriceFull,
        FileType::Promo,
        FileType::PromoFull,
    ];

    /// Canonical lowercase key used in `price_files` maps.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            FileType::Stores => "stores",
            FileType::Price => "price",
            FileType::PriceFull => "pricefull",
            FileType::Promo => "promo",
            FileType::PromoFull => "promofull",
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key.to_ascii_lowercase().as_str() {
            "stores" => Some(FileType::Stores),
            "price" => Some(FileType::Price),
            "pricefull" => Some(FileType::PriceFull),
            "promo" => Some(FileType::Promo),
            "promofull" => Some(FileType::PromoFull),
            _ => None,
        }
    }

    /// Classify a published file name by its type prefix.
    ///
    /// Longer names are tested first so `PriceFull7290…` is never taken for
    /// `Price`. Matching is case-sensitive, as the publishers spell them.
    #[must_use]
    pub fn classify_price_file(name: &str) -> Option<Self> {
        const ORDER: [(&str, FileType); 4] = [
            ("PromoFull", FileType::PromoFull),
            ("Promo", FileType::Promo),
            ("PriceFull", FileType::PriceFull),
            ("Price", FileType::Price),
        ];
        ORDER
            .iter()
            .find(|(needle, _)| name.contains(needle))
            .map(|(_, file_type)| *file_type)
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// A discovered file: where it lives, what it holds, and the store it
/// belongs to (`None` for store-list files).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReference {
    pub url: String,
    pub file_type: FileType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_code: Option<String>,
    /// Session cookies the file must be downloaded with. Empty for every
    /// family except the authenticated crawl.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cookies: BTreeMap<String, String>,
}

impl FileReference {
    #[must_use]
    pub fn stores(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            file_type: FileType::Stores,
            store_code: None,
            cookies: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn for_store(url: impl Into<String>, file_type: FileType, store_code: &str) -> Self {
        Self {
            url: url.into(),
            file_type,
            store_code: Some(store_code.to_string()),
            cookies: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_cookies(mut self, cookies: BTreeMap<String, String>) -> Self {
        self.cookies = cookies;
        self
    }
}

/// Latest file per type for one store. A type with no published file is
/// absent rather than mapped to a placeholder.
pub type PriceFiles = BTreeMap<FileType, FileReference>;

/// A store row in the normalized shape every chain is mapped onto.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreRecord {
    pub chain_code: String,
    pub chain_name: Option<String>,
    pub subchain_code: Option<String>,
    pub subchain_name: Option<String>,
    pub store_code: String,
    pub store_name: Option<String>,
    pub store_type: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub zip: Option<String>,
}
