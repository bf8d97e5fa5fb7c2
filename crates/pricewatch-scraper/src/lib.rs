pub mod adapters;
pub mod decode;
pub mod document;
pub mod download;
pub mod envelope;
pub mod error;
pub mod fetch;
mod latest;
mod rate_limit;
pub mod refresh;
pub mod registry;

pub use adapters::session::{CrawlRequest, CrawlSession, HttpSessionProvider, SessionProvider};
pub use adapters::{DiscoveryEnv, Protocol};
pub use decode::{decode, decode_text, DecodeOptions};
pub use download::{download_document, price_items, promotions, store_records};
pub use envelope::Envelope;
pub use error::{DiscoveryResult, ScraperError};
pub use fetch::{FetchClient, FetchOptions, FetchRequest, Method, RawContent};
pub use refresh::{
    refresh_stores, ChainOutcome, RefreshError, RefreshOptions, RefreshPolicy, RefreshReport,
    SinkError, StoreSink,
};
pub use registry::{find, registry, Chain};
