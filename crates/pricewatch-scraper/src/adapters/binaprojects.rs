//! Form-POST sites that list one day's files per request.
//!
//! `MainIO_Hok.aspx` answers a `WStore/WDate/WFileType` form with a JSON
//! array of file rows. An empty body or `[]` means nothing was published on
//! that date, so the lookup steps back one day at a time.

use chrono::{Days, NaiveDateTime};
use futures::future::join_all;
use pricewatch_core::{ChainDescriptor, FileReference, FileType, PriceFiles};
use serde_json::Value;

use super::{resolve_price_types, site_root, DiscoveryEnv, Protocol};
use crate::error::{DiscoveryResult, ScraperError};
use crate::fetch::{FetchClient, FetchRequest};
use crate::latest::select_latest;

const ENDPOINT: &str = "MainIO_Hok.aspx";
const DATE_FILE_FORMAT: &str = "%H:%M %d/%m/%Y";

/// Days stepped back from today; the walk asks for today plus this many days.
pub(crate) const WALKBACK_DAYS: u32 = 14;

/// Store code sent when asking for the chain-wide store list.
const ALL_STORES: &str = "0";

fn file_type_code(file_type: FileType) -> u8 {
    match file_type {
        FileType::Stores => 1,
        FileType::Price => 2,
        FileType::Promo => 3,
        FileType::PriceFull => 4,
        FileType::PromoFull => 5,
    }
}

pub(super) async fn store_file(
    chain: &ChainDescriptor,
    env: &DiscoveryEnv,
    client: Option<&FetchClient>,
) -> DiscoveryResult<FileReference> {
    let client = env.client(client)?;
    let url = latest_file_url(chain, env, &client, FileType::Stores, ALL_STORES).await?;
    Ok(FileReference::stores(url))
}

pub(super) async fn price_files(
    chain: &ChainDescriptor,
    store_code: &str,
    env: &DiscoveryEnv,
    client: Option<&FetchClient>,
) -> DiscoveryResult<PriceFiles> {
    let client = env.client(client)?;
    let client = &*client;
    let lookups = FileType::PRICE_TYPES.map(|file_type| async move {
        let outcome = latest_file_url(chain, env, client, file_type, store_code)
            .await
            .map(|url| Some(FileReference::for_store(url, file_type, store_code)));
        (file_type, outcome)
    });
    let outcomes = join_all(lookups).await;
    resolve_price_types(chain, store_code, outcomes)
}

async fn latest_file_url(
    chain: &ChainDescriptor,
    env: &DiscoveryEnv,
    client: &FetchClient,
    file_type: FileType,
    store_code: &str,
) -> DiscoveryResult<String> {
    let root = site_root(&chain.base_url);
    let endpoint = format!("{root}{ENDPOINT}");
    let rows = walkback(&endpoint, env, client, file_type, store_code).await?;
    let file_name = latest_row(&rows).ok_or_else(|| ScraperError::PatternMismatch {
        url: endpoint.clone(),
        pattern: format!("FileNm + DateFile ({DATE_FILE_FORMAT})"),
    })?;
    Ok(format!("{root}Download/{file_name}"))
}

/// Ask for today, then each earlier day, until a date returns file rows.
///
/// Stops after [`WALKBACK_DAYS`] steps back and reports
/// [`ScraperError::NoRecentFile`]. Transport and status errors end the
/// walk immediately.
async fn walkback(
    endpoint: &str,
    env: &DiscoveryEnv,
    client: &FetchClient,
    file_type: FileType,
    store_code: &str,
) -> DiscoveryResult<Vec<Value>> {
    let today = env.today();
    for offset in 0..=WALKBACK_DAYS {
        let Some(date) = today.checked_sub_days(Days::new(u64::from(offset))) else {
            break;
        };
        let request = FetchRequest::post_form(
            endpoint,
            [
                ("WStore", store_code.to_owned()),
                ("WDate", date.format("%d/%m/%Y").to_string()),
                ("WFileType", file_type_code(file_type).to_string()),
            ],
        )
        .header("X-Requested-With", "XMLHttpRequest")
        .timeout(Protocol::FormPostWalkback.timeout());

        let body = client.fetch_text(&request).await?;
        let body = body.trim();
        if body.is_empty() {
            tracing::debug!(%file_type, store_code, %date, "empty listing, stepping back");
            continue;
        }
        let rows: Vec<Value> = serde_json::from_str(body)
            .map_err(|e| ScraperError::malformed(format!("{endpoint}: {e}")))?;
        if rows.is_empty() {
            tracing::debug!(%file_type, store_code, %date, "no files listed, stepping back");
            continue;
        }
        return Ok(rows);
    }

    Err(ScraperError::NoRecentFile {
        file_type,
        store_code: store_code.to_owned(),
        days: WALKBACK_DAYS,
    })
}

/// `FileNm` of the row with the latest `DateFile`.
fn latest_row(rows: &[Value]) -> Option<String> {
    let parsed = rows.iter().filter_map(|row| {
        let name = row.get("FileNm")?.as_str()?.trim();
        let stamp = row.get("DateFile")?.as_str()?;
        let stamp = NaiveDateTime::parse_from_str(stamp.trim(), DATE_FILE_FORMAT).ok()?;
        (!name.is_empty()).then(|| (name.to_owned(), stamp))
    });
    select_latest(parsed, |(_, stamp)| Some(*stamp)).map(|(name, _)| name)
}
