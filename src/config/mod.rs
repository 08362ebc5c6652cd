mod file_config;

pub use file_config::{FileConfig, LedgerConfig, StoreConfig};

use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;

/// Environment variable holding the point store URL.
pub const STORE_URL_ENV: &str = "POINTS_STORE_URL";
/// Environment variable holding the point store access key.
pub const STORE_KEY_ENV: &str = "POINTS_STORE_KEY";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub store_url: Option<String>,
    pub store_key: Option<String>,
    pub store_timeout_sec: Option<u64>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub redemption_cost: Option<u32>,
    pub accrual_amount: Option<u32>,
    pub max_accrual_amount: Option<u32>,
    pub reward_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,

    pub store: StoreSettings,
    pub ledger: LedgerSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreSettings {
    pub url: String,
    pub key: String,
    pub timeout_sec: u64,
    /// Path of the REST API below `url`.
    pub rest_path: String,
    pub points_table: String,
    pub history_table: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            key: String::new(),
            timeout_sec: 30,
            rest_path: "rest/v1".to_string(),
            points_table: "points".to_string(),
            history_table: "redemption_history".to_string(),
        }
    }
}

/// Business rules of the kiosk.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSettings {
    /// Points taken from the balance by one redemption.
    pub redemption_cost: u32,
    /// Points granted by one plain accrual (one tap of the submit button).
    pub accrual_amount: u32,
    /// Largest amount a single accrual may add.
    pub max_accrual_amount: u32,
    /// How many times a guarded balance update is attempted before giving up.
    pub max_update_attempts: u32,
    /// What the customer gets for a redemption, shown in messages.
    pub reward_name: String,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            redemption_cost: 10,
            accrual_amount: 1,
            max_accrual_amount: 10,
            max_update_attempts: 3,
            reward_name: "a free drink".to_string(),
        }
    }
}

impl LedgerSettings {
    pub fn validate(&self) -> Result<()> {
        if self.redemption_cost == 0 {
            bail!("redemption_cost must be at least 1");
        }
        if self.max_accrual_amount == 0 {
            bail!("max_accrual_amount must be at least 1");
        }
        if self.accrual_amount == 0 || self.accrual_amount > self.max_accrual_amount {
            bail!(
                "accrual_amount must be between 1 and max_accrual_amount ({}), got {}",
                self.max_accrual_amount,
                self.accrual_amount
            );
        }
        if self.max_update_attempts == 0 {
            bail!("max_update_attempts must be at least 1");
        }
        Ok(())
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        let store = resolve_store(cli, file.store.unwrap_or_default())?;

        let ledger_file = file.ledger.unwrap_or_default();
        let defaults = LedgerSettings::default();
        let ledger = LedgerSettings {
            redemption_cost: ledger_file
                .redemption_cost
                .or(cli.redemption_cost)
                .unwrap_or(defaults.redemption_cost),
            accrual_amount: ledger_file
                .accrual_amount
                .or(cli.accrual_amount)
                .unwrap_or(defaults.accrual_amount),
            max_accrual_amount: ledger_file
                .max_accrual_amount
                .or(cli.max_accrual_amount)
                .unwrap_or(defaults.max_accrual_amount),
            max_update_attempts: ledger_file
                .max_update_attempts
                .unwrap_or(defaults.max_update_attempts),
            reward_name: ledger_file
                .reward_name
                .or_else(|| cli.reward_name.clone())
                .unwrap_or(defaults.reward_name),
        };
        ledger.validate()?;

        Ok(Self {
            port,
            metrics_port,
            logging_level,
            frontend_dir_path,
            store,
            ledger,
        })
    }
}

/// Resolves where the points live. The URL and key have no defaults: a kiosk
/// without them cannot do anything, so their absence fails startup.
pub fn resolve_store(cli: &CliConfig, file: StoreConfig) -> Result<StoreSettings> {
    let defaults = StoreSettings::default();

    let url = file
        .url
        .or_else(|| cli.store_url.clone())
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "store url must be specified via --store-url, {} or [store] url in config file",
                STORE_URL_ENV
            )
        })?;
    if let Err(err) = reqwest::Url::parse(&url) {
        bail!("store url {:?} is not a valid URL: {}", url, err);
    }

    let key = file
        .key
        .or_else(|| cli.store_key.clone())
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "store key must be specified via --store-key, {} or [store] key in config file",
                STORE_KEY_ENV
            )
        })?;

    Ok(StoreSettings {
        url,
        key,
        timeout_sec: file
            .timeout_sec
            .or(cli.store_timeout_sec)
            .unwrap_or(defaults.timeout_sec),
        rest_path: file.rest_path.unwrap_or(defaults.rest_path),
        points_table: file.points_table.unwrap_or(defaults.points_table),
        history_table: file.history_table.unwrap_or(defaults.history_table),
    })
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
