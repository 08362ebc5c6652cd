use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use loyalty_kiosk::config::{AppConfig, CliConfig, FileConfig, STORE_KEY_ENV, STORE_URL_ENV};
use loyalty_kiosk::{run_server, PointLedger, PostgrestPointStore, RequestsLoggingLevel};

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Values in the file override CLI arguments.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Base URL of the points store, e.g. https://<project>.supabase.co
    #[clap(long, env = STORE_URL_ENV)]
    pub store_url: Option<String>,

    /// Access key of the points store.
    #[clap(long, env = STORE_KEY_ENV, hide_env_values = true)]
    pub store_key: Option<String>,

    /// Timeout in seconds for points store requests.
    #[clap(long)]
    pub store_timeout_sec: Option<u64>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Points spent by one redemption.
    #[clap(long)]
    pub redemption_cost: Option<u32>,

    /// Points granted by one plain accrual.
    #[clap(long)]
    pub accrual_amount: Option<u32>,

    /// Largest amount of points a single accrual may add.
    #[clap(long)]
    pub max_accrual_amount: Option<u32>,

    /// What a customer receives for a redemption.
    #[clap(long)]
    pub reward_name: Option<String>,
}

impl From<&CliArgs> for CliConfig {
    fn from(args: &CliArgs) -> Self {
        CliConfig {
            store_url: args.store_url.clone(),
            store_key: args.store_key.clone(),
            store_timeout_sec: args.store_timeout_sec,
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            frontend_dir_path: args.frontend_dir_path.clone(),
            redemption_cost: args.redemption_cost,
            accrual_amount: args.accrual_amount,
            max_accrual_amount: args.max_accrual_amount,
            reward_name: args.reward_name.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}...", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&CliConfig::from(&cli_args), file_config)?;

    info!("Connecting to points store at {}...", config.store.url);
    let store = PostgrestPointStore::new(&config.store)
        .context("Failed to create points store client")?;

    info!(
        "Redemption costs {} points, one accrual adds {} (at most {})",
        config.ledger.redemption_cost,
        config.ledger.accrual_amount,
        config.ledger.max_accrual_amount
    );
    let ledger = Arc::new(PointLedger::new(Arc::new(store), config.ledger));

    info!("Ready to serve at port {}!", config.port);
    run_server(
        ledger,
        config.logging_level,
        config.port,
        config.metrics_port,
        config.frontend_dir_path,
    )
    .await
}
