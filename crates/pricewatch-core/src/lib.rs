pub mod app_config;
pub mod chains;
pub mod config;
pub mod records;

pub use app_config::{AppConfig, Environment};
pub use chains::{
    find_chain, ChainDescriptor, Credentials, LinkPattern, LinkType, StoreLayout, CHAINS,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use records::{FileReference, FileType, PriceFiles, StoreRecord};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
