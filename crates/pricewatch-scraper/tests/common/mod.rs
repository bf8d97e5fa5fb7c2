//! Shared fixtures for the wiremock integration tests.

#![allow(dead_code)]

use std::io::Write;
use std::time::Duration;

use chrono::NaiveDate;
use flate2::write::GzEncoder;
use flate2::Compression;
use pricewatch_scraper::{find, Chain, DiscoveryEnv, FetchOptions};

/// Fetch options for tests: short timeout, no retries.
pub fn test_fetch_options() -> FetchOptions {
    FetchOptions {
        user_agent: "pricewatch-test/0.1".to_owned(),
        timeout: Duration::from_secs(5),
        accept_invalid_certs: false,
        max_retries: 0,
        backoff_base_secs: 0,
    }
}

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 10).expect("valid date")
}

/// Discovery environment pinned to 2024-06-10.
pub fn test_env() -> DiscoveryEnv {
    DiscoveryEnv::new(test_fetch_options()).with_today(today())
}

/// Registry chain `key`, pointed at `base_url`.
pub fn chain_at(key: &str, base_url: impl Into<String>) -> Chain {
    let chain = find(key).expect("chain in registry");
    Chain::new(chain.descriptor().with_base_url(base_url))
}

pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).expect("gzip write");
    encoder.finish().expect("gzip finish")
}
