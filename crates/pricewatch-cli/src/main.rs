mod discover;
mod store_sink;

use clap::{CommandFactory, Parser, Subcommand};
use pricewatch_core::{AppConfig, Environment};
use pricewatch_scraper::{DiscoveryEnv, RefreshPolicy};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pricewatch-cli")]
#[command(about = "Discover and normalize supermarket price-transparency files")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List every known chain
    Chains,
    /// Print the chain's current store-list file
    StoreFile {
        /// Chain alias or chain code
        #[arg(long)]
        chain: String,
    },
    /// Print the latest price and promo files of one store
    PriceFiles {
        #[arg(long)]
        chain: String,
        /// Store code as published by the chain
        #[arg(long)]
        store: String,
    },
    /// Download and print the chain's store records
    Stores {
        #[arg(long)]
        chain: String,
    },
    /// Download and print the items of a store's full price file
    Items {
        #[arg(long)]
        chain: String,
        #[arg(long)]
        store: String,
        /// Read the full promo file instead
        #[arg(long)]
        promo: bool,
    },
    /// Refresh store lists into the data directory
    Refresh {
        /// Refresh a single chain instead of all of them
        #[arg(long)]
        chain: Option<String>,
        /// Persist nothing unless every chain succeeds
        #[arg(long)]
        all_or_nothing: bool,
    },
}

/// How log lines are rendered on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Pretty,
    /// One JSON object per line, for log shippers.
    Json,
}

impl LogFormat {
    fn for_env(env: &Environment) -> Self {
        match env {
            Environment::Production => LogFormat::Json,
            Environment::Development | Environment::Test => LogFormat::Pretty,
        }
    }
}

fn init_tracing(config: &AppConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);
    match LogFormat::for_env(&config.env) {
        LogFormat::Json => builder.json().with_ansi(false).init(),
        LogFormat::Pretty => builder.with_target(false).init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    let config = pricewatch_core::load_app_config()?;
    init_tracing(&config)?;

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };
    let env = DiscoveryEnv::from_config(&config);

    match command {
        Commands::Chains => discover::run_chains(),
        Commands::StoreFile { chain } => discover::run_store_file(&env, &chain).await,
        Commands::PriceFiles { chain, store } => {
            discover::run_price_files(&env, &chain, &store).await
        }
        Commands::Stores { chain } => discover::run_stores(&env, &chain).await,
        Commands::Items {
            chain,
            store,
            promo,
        } => discover::run_items(&env, &chain, &store, promo).await,
        Commands::Refresh {
            chain,
            all_or_nothing,
        } => {
            let policy = if all_or_nothing {
                RefreshPolicy::AllOrNothing
            } else {
                RefreshPolicy::Isolated
            };
            store_sink::run_refresh(&config, &env, chain.as_deref(), policy).await
        }
    }
}
