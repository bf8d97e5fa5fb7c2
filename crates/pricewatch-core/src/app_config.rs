use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub data_dir: PathBuf,
    pub user_agent: String,
    /// Fallback request timeout; adapter families override it with their own.
    pub fetch_timeout_secs: u64,
    pub max_concurrent_chains: usize,
    pub max_retries: u32,
    pub retry_backoff_base_secs: u64,
    /// Several publishing sites serve broken certificate chains.
    pub accept_invalid_certs: bool,
}
