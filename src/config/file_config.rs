use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub frontend_dir_path: Option<String>,

    // Feature configs
    pub store: Option<StoreConfig>,
    pub ledger: Option<LedgerConfig>,
}

/// `[store]` section: where the points live.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct StoreConfig {
    pub url: Option<String>,
    pub key: Option<String>,
    pub timeout_sec: Option<u64>,
    pub rest_path: Option<String>,
    pub points_table: Option<String>,
    pub history_table: Option<String>,
}

/// `[ledger]` section: the business rules of the kiosk.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct LedgerConfig {
    pub redemption_cost: Option<u32>,
    pub accrual_amount: Option<u32>,
    pub max_accrual_amount: Option<u32>,
    pub max_update_attempts: Option<u32>,
    pub reward_name: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::parse(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
