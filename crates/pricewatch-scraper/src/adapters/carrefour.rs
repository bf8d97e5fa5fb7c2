//! Sites that embed their file list in a page script.
//!
//! The listing page declares `const files = ...`, either as
//! ``JSON.parse`[...]` `` or as a bare array of `{ "name": ... }` objects.
//! Files live under a folder named after today's date.

use std::sync::LazyLock;

use pricewatch_core::{ChainDescriptor, FileReference, PriceFiles};
use regex::Regex;
use serde_json::Value;

use super::{dash_token, file_name, latest_per_type, same_store, site_root, DiscoveryEnv, Protocol};
use crate::error::{DiscoveryResult, ScraperError};
use crate::fetch::{FetchClient, FetchRequest};
use crate::latest::padded_timestamp;

static FILES_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)const\s+files\s*=\s*(?:JSON\.parse`(.*?)`|(\[))").expect("valid regex")
});

static FILE_TIMESTAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{8})(?:-?(\d{4,6}))?").expect("valid regex"));

pub(super) async fn store_file(
    chain: &ChainDescriptor,
    env: &DiscoveryEnv,
    client: Option<&FetchClient>,
) -> DiscoveryResult<FileReference> {
    let links = file_links(chain, env, client).await?;
    links
        .into_iter()
        .find(|url| url.to_lowercase().contains("store"))
        .map(FileReference::stores)
        .ok_or_else(|| ScraperError::PatternMismatch {
            url: chain.base_url.to_string(),
            pattern: "store".to_owned(),
        })
}

pub(super) async fn price_files(
    chain: &ChainDescriptor,
    store_code: &str,
    env: &DiscoveryEnv,
    client: Option<&FetchClient>,
) -> DiscoveryResult<PriceFiles> {
    let links: Vec<String> = file_links(chain, env, client)
        .await?
        .into_iter()
        .filter(|url| dash_token(file_name(url), 1).is_some_and(|t| same_store(t, store_code)))
        .collect();
    tracing::debug!(chain = chain.alias, store_code, count = links.len(), "store links");
    Ok(latest_per_type(&links, store_code, file_timestamp))
}

/// Every listed file as an absolute URL under today's date folder.
async fn file_links(
    chain: &ChainDescriptor,
    env: &DiscoveryEnv,
    client: Option<&FetchClient>,
) -> DiscoveryResult<Vec<String>> {
    let client = env.client(client)?;
    let request = FetchRequest::get(chain.base_url.as_ref()).timeout(Protocol::EmbeddedJson.timeout());
    let html = client.fetch_text(&request).await?;
    let names = embedded_file_names(&html).ok_or_else(|| ScraperError::PatternMismatch {
        url: chain.base_url.to_string(),
        pattern: "const files = ...".to_owned(),
    })?;

    let root = site_root(&chain.base_url);
    let folder = env.today().format("%Y%m%d");
    Ok(names
        .into_iter()
        .map(|name| format!("{root}{folder}/{name}"))
        .collect())
}

/// File names declared by the page's `const files` script.
fn embedded_file_names(html: &str) -> Option<Vec<String>> {
    let caps = FILES_DECLARATION.captures(html)?;
    let json = match (caps.get(1), caps.get(2)) {
        (Some(template), _) => template.as_str(),
        (None, Some(bracket)) => extract_balanced_array(&html[bracket.start()..])?,
        (None, None) => return None,
    };
    let Ok(Value::Array(entries)) = serde_json::from_str::<Value>(json) else {
        return None;
    };
    Some(
        entries
            .iter()
            .filter_map(|entry| match entry {
                Value::String(name) => Some(name.trim().to_owned()),
                Value::Object(_) => entry.get("name")?.as_str().map(|n| n.trim().to_owned()),
                _ => None,
            })
            .filter(|name| !name.is_empty())
            .collect(),
    )
}

/// Timestamp of a price file, read after its store token so the chain
/// code's digits are never taken for a date.
fn file_timestamp(url: &str) -> Option<chrono::NaiveDateTime> {
    let name = file_name(url);
    let tail = name.splitn(3, '-').nth(2)?;
    let caps = FILE_TIMESTAMP.captures(tail)?;
    padded_timestamp(&caps[1], caps.get(2).map(|m| m.as_str()))
}

/// The shortest prefix of `s` forming a complete `[...]` array, honouring
/// string literals and escapes.
fn extract_balanced_array(s: &str) -> Option<&str> {
    if !s.starts_with('[') {
        return None;
    }
    let mut depth: i32 = 0;
    let mut in_string = false;
    let mut escape = false;
    for (i, c) in s.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        if in_string {
            match c {
                '\\' => escape = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            '}' => depth -= 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
