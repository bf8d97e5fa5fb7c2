use pricewatch_core::FileType;
use thiserror::Error;

/// Result every discovery and fetch operation returns. The `Ok`/`Err`
/// split is the `{response}` / `{error}` envelope callers branch on.
pub type DiscoveryResult<T> = Result<T, ScraperError>;

#[derive(Debug, Clone, Error)]
pub enum ScraperError {
    #[error("transport error for {url}: {detail}")]
    Transport { url: String, detail: String },

    #[error("unexpected HTTP status {status} from {url}")]
    HttpStatus {
        status: u16,
        url: String,
        body: String,
    },

    #[error("no {file_type} file published for store {store_code} in the last {days} days")]
    NoRecentFile {
        file_type: FileType,
        store_code: String,
        days: u32,
    },

    #[error("archive contains no .xml entry")]
    NoXmlInArchive,

    #[error("malformed document: {detail}")]
    MalformedDocument { detail: String },

    #[error("no link matched {pattern} at {url}")]
    PatternMismatch { url: String, pattern: String },

    #[error("login as {username} did not reach {target_url}")]
    AuthenticationFailure {
        username: String,
        target_url: String,
    },

    #[error("{operation} is not supported for {chain}")]
    Unsupported {
        operation: &'static str,
        chain: String,
    },

    #[error("chain {chain} has no {file_type} file for store {store_code}")]
    NoPriceFiles {
        chain: String,
        store_code: String,
        file_type: FileType,
    },

    #[error("unknown chain \"{0}\"")]
    UnknownChain(String),
}

impl ScraperError {
    pub(crate) fn transport(url: &str, err: &reqwest::Error) -> Self {
        ScraperError::Transport {
            url: url.to_owned(),
            detail: err.to_string(),
        }
    }

    pub(crate) fn malformed(detail: impl std::fmt::Display) -> Self {
        ScraperError::MalformedDocument {
            detail: detail.to_string(),
        }
    }

    /// Stable machine-readable tag for the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ScraperError::Transport { .. } => "Transport",
            ScraperError::HttpStatus { .. } => "HttpStatus",
            ScraperError::NoRecentFile { .. } => "NoRecentFile",
            ScraperError::NoXmlInArchive => "NoXmlInArchive",
            ScraperError::MalformedDocument { .. } => "MalformedDocument",
            ScraperError::PatternMismatch { .. } => "PatternMismatch",
            ScraperError::AuthenticationFailure { .. } => "AuthenticationFailure",
            ScraperError::Unsupported { .. } => "Unsupported",
            ScraperError::NoPriceFiles { .. } => "NoPriceFiles",
            ScraperError::UnknownChain(_) => "UnknownChain",
        }
    }
}
