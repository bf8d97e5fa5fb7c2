//! Latest-file selection.
//!
//! Every family reduces to the same rule: decode a timestamp from each
//! candidate, keep the maximum, and on equal timestamps keep the candidate
//! seen first. Candidates whose timestamp cannot be decoded are skipped.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

static DATE_TIME_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{8})-(\d{6})").expect("valid regex"));

/// Return the candidate with the greatest key, first one on ties.
///
/// Deliberately not `Iterator::max_by_key`, which keeps the last maximum.
pub(crate) fn select_latest<T, K, F>(candidates: impl IntoIterator<Item = T>, key: F) -> Option<T>
where
    K: Ord,
    F: Fn(&T) -> Option<K>,
{
    let mut best: Option<(K, T)> = None;
    for candidate in candidates {
        let Some(k) = key(&candidate) else {
            continue;
        };
        match &best {
            Some((best_key, _)) if k <= *best_key => {}
            _ => best = Some((k, candidate)),
        }
    }
    best.map(|(_, candidate)| candidate)
}

/// First `YYYYMMDD-HHMMSS` token in `name`, read as one sortable integer.
pub(crate) fn date_time_token(name: &str) -> Option<u64> {
    let caps = DATE_TIME_TOKEN.captures(name)?;
    format!("{}{}", &caps[1], &caps[2]).parse().ok()
}

/// Build a timestamp from an 8-digit date and an optional time of 4 to 6
/// digits. Short times are right-padded with zeros (`1030` → `103000`).
pub(crate) fn padded_timestamp(date: &str, time: Option<&str>) -> Option<NaiveDateTime> {
    let date = NaiveDate::parse_from_str(date, "%Y%m%d").ok()?;
    let time = match time {
        None => NaiveTime::MIN,
        Some(t) if t.len() <= 6 => {
            NaiveTime::parse_from_str(&format!("{t:0<6}"), "%H%M%S").ok()?
        }
        Some(_) => return None,
    };
    Some(date.and_time(time))
}
