//! Extraction from decoded documents into normalized records.
//!
//! Publishers spell the same field several ways (`StoreID`, `STOREID`,
//! `StoreId`). Each field has an ordered candidate list; the first candidate
//! holding a non-empty value wins.

use std::collections::HashSet;

use pricewatch_core::{ChainDescriptor, StoreLayout, StoreRecord};
use serde_json::Value;

use crate::error::{DiscoveryResult, ScraperError};

pub const CHAIN_CODE: &[&str] = &["ChainID", "ChainId", "CHAINID"];
pub const CHAIN_NAME: &[&str] = &["ChainName", "CHAINNAME"];
pub const SUBCHAIN_CODE: &[&str] = &["SubChainID", "SUBCHAINID", "SubChainId"];
pub const SUBCHAIN_NAME: &[&str] = &["SubChainName", "SUBCHAINNAME"];
pub const STORE_CODE: &[&str] = &["StoreID", "STOREID", "StoreId"];
pub const STORE_NAME: &[&str] = &["StoreName", "STORENAME"];
pub const STORE_TYPE: &[&str] = &["StoreType", "STORETYPE"];
pub const ADDRESS: &[&str] = &["Address", "ADDRESS"];
pub const CITY: &[&str] = &["City", "CITY"];
pub const ZIP: &[&str] = &["ZipCode", "ZIPCODE", "ZIPCode"];

const PROMOTION_ID: &[&str] = &["PromotionId", "PromotionID"];

/// Key every price and promotion record is tagged with.
pub const CHAIN_ALIAS_KEY: &str = "ChainAlias";
/// Key a promotion's decoded [`Audience`] label is stored under.
pub const AUDIENCE_KEY: &str = "Audience";

/// First candidate key of `object` holding a non-empty value.
pub fn first_present<'a>(object: &'a Value, candidates: &[&str]) -> Option<&'a Value> {
    candidates
        .iter()
        .filter_map(|key| object.get(*key))
        .find(|v| match v {
            Value::Null => false,
            Value::String(s) => !s.trim().is_empty(),
            _ => true,
        })
}

/// [`first_present`] rendered as a trimmed string. An element carrying
/// attributes contributes its `#text`.
pub fn first_text(object: &Value, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .filter_map(|key| object.get(*key))
        .find_map(scalar_text)
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_owned(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Object(map) => return map.get("#text").and_then(scalar_text),
        Value::Null | Value::Array(_) => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// A repeated element as a slice view: arrays as is, a lone object as one
/// item, `null` or absence as nothing.
pub fn as_list(value: Option<&Value>) -> Vec<&Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(other) => vec![other],
    }
}

fn path<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().try_fold(value, |v, k| v.get(*k))
}

fn document_root(document: &Value) -> Option<&Value> {
    document.get("Root").or_else(|| document.get("root"))
}

/// Chain-level values stamped on every store of one document.
struct ChainHeader {
    chain_code: String,
    chain_name: Option<String>,
}

impl ChainHeader {
    fn read(chain: &ChainDescriptor, header: Option<&Value>) -> Self {
        let chain_code = header
            .and_then(|h| first_text(h, CHAIN_CODE))
            .unwrap_or_else(|| chain.chain_code.to_owned());
        let chain_name = header
            .and_then(|h| first_text(h, CHAIN_NAME))
            .or_else(|| Some(chain.name.to_owned()));
        Self {
            chain_code,
            chain_name,
        }
    }

    fn record(&self, store: &Value, subchain: Option<&Value>) -> Option<StoreRecord> {
        let store_code = first_text(store, STORE_CODE)?;
        let subchain_field = |candidates: &[&str]| {
            subchain
                .and_then(|s| first_text(s, candidates))
                .or_else(|| first_text(store, candidates))
        };
        Some(StoreRecord {
            chain_code: self.chain_code.clone(),
            chain_name: self.chain_name.clone(),
            subchain_code: subchain_field(SUBCHAIN_CODE),
            subchain_name: subchain_field(SUBCHAIN_NAME),
            store_code,
            store_name: first_text(store, STORE_NAME),
            store_type: first_text(store, STORE_TYPE),
            address: first_text(store, ADDRESS),
            city: first_text(store, CITY),
            zip: first_text(store, ZIP),
        })
    }
}

/// Map a decoded store-list document onto [`StoreRecord`]s using the
/// chain's configured layout.
///
/// Stores without a store code, and store entries that are bare strings,
/// are skipped.
///
/// # Errors
///
/// [`ScraperError::MalformedDocument`] when the layout's top-level element
/// is missing.
pub fn to_store_records(
    chain: &ChainDescriptor,
    document: &Value,
) -> DiscoveryResult<Vec<StoreRecord>> {
    let missing = |what: &str| {
        ScraperError::malformed(format!("{} store file has no {what}", chain.alias))
    };

    let mut pairs: Vec<(&Value, Option<&Value>)> = Vec::new();
    let header = match chain.store_layout {
        StoreLayout::SingleSubChain | StoreLayout::SubChainList => {
            let root = document_root(document).ok_or_else(|| missing("Root"))?;
            let subchains = as_list(path(root, &["SubChains", "SubChain"]));
            if chain.store_layout == StoreLayout::SingleSubChain && subchains.len() > 1 {
                tracing::warn!(
                    chain = chain.alias,
                    count = subchains.len(),
                    "expected a single SubChain, reading all of them"
                );
            }
            for subchain in subchains {
                for store in as_list(path(subchain, &["Stores", "Store"])) {
                    pairs.push((store, Some(subchain)));
                }
            }
            ChainHeader::read(chain, Some(root))
        }
        StoreLayout::SapValues => {
            let values =
                path(document, &["asx:abap", "asx:values"]).ok_or_else(|| missing("asx:values"))?;
            for store in as_list(path(values, &["STORES", "STORE"])) {
                pairs.push((store, None));
            }
            ChainHeader::read(chain, Some(values))
        }
        StoreLayout::Branches => {
            let store_root = document.get("Store").ok_or_else(|| missing("Store"))?;
            for branch in as_list(path(store_root, &["Branches", "Branch"])) {
                pairs.push((branch, None));
            }
            ChainHeader::read(chain, Some(store_root))
        }
    };

    let mut records = Vec::with_capacity(pairs.len());
    for (store, subchain) in pairs {
        if !store.is_object() {
            continue;
        }
        match header.record(store, subchain) {
            Some(record) => records.push(record),
            None => tracing::warn!(chain = chain.alias, "skipping store without a store code"),
        }
    }
    Ok(records)
}

fn tagged_list(
    document: &Value,
    list: [&str; 2],
    chain_alias: &str,
) -> DiscoveryResult<Vec<Value>> {
    let root = document_root(document)
        .ok_or_else(|| ScraperError::malformed("document has no Root element"))?;
    let container = root.get(list[0]).ok_or_else(|| {
        ScraperError::malformed(format!("document has no {} element", list[0]))
    })?;
    Ok(as_list(container.get(list[1]))
        .into_iter()
        .filter_map(|entry| {
            let mut entry = entry.as_object()?.clone();
            entry.insert(
                CHAIN_ALIAS_KEY.to_owned(),
                Value::String(chain_alias.to_owned()),
            );
            Some(Value::Object(entry))
        })
        .collect())
}

/// Items of a decoded price document (`Root/Items/Item`, or `root/...`),
/// each tagged with `ChainAlias`.
///
/// # Errors
///
/// [`ScraperError::MalformedDocument`] if the document has no `Items` list.
pub fn price_items(document: &Value, chain_alias: &str) -> DiscoveryResult<Vec<Value>> {
    tagged_list(document, ["Items", "Item"], chain_alias)
}

/// Promotions of a decoded promo document (`Root/Promotions/Promotion`),
/// tagged with `ChainAlias`, minus blacklisted `PromotionId`s. Promotions
/// whose club decodes also carry an `Audience` label.
///
/// # Errors
///
/// [`ScraperError::MalformedDocument`] if the document has no
/// `Promotions` list.
pub fn promotions(
    document: &Value,
    chain_alias: &str,
    blacklist: &HashSet<String>,
) -> DiscoveryResult<Vec<Value>> {
    let mut promos = tagged_list(document, ["Promotions", "Promotion"], chain_alias)?;
    promos.retain(|promo| {
        first_text(promo, PROMOTION_ID).map_or(true, |id| !blacklist.contains(&id))
    });
    for promo in &mut promos {
        let Some(audience) = promo_audience(promo) else {
            continue;
        };
        if let Some(map) = promo.as_object_mut() {
            map.insert(
                AUDIENCE_KEY.to_owned(),
                Value::String(audience.label().to_owned()),
            );
        }
    }
    Ok(promos)
}

/// Who a promotion is offered to, from its `ClubId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Audience {
    AllCustomers,
    ClubMembers,
    CreditCardHolders,
    Other,
}

impl Audience {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Audience::AllCustomers => "All Customers",
            Audience::ClubMembers => "Club Members",
            Audience::CreditCardHolders => "Creditcard Holders",
            Audience::Other => "Other / Unspecified",
        }
    }
}

/// Decode a promotion's audience. Most publishers put `Clubs/ClubId` on the
/// promotion; some nest it under `AdditionalRestrictions`. When several
/// clubs are listed the first one is used.
pub fn promo_audience(promo: &Value) -> Option<Audience> {
    let clubs = promo
        .get("Clubs")
        .or_else(|| path(promo, &["AdditionalRestrictions", "Clubs"]))?;
    let club = as_list(Some(clubs)).into_iter().next()?;
    let id = match club {
        Value::Object(_) => first_text(club, &["ClubId"])?,
        other => scalar_text(other)?,
    };
    match id.as_str() {
        "0" => Some(Audience::AllCustomers),
        "1" => Some(Audience::ClubMembers),
        "2" => Some(Audience::CreditCardHolders),
        "3" => Some(Audience::Other),
        _ => None,
    }
}

#[cfg(test)]
#[path = "document_test.rs"]
mod tests;
