use axum::extract::FromRef;

use crate::ledger::PointLedger;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedPointLedger = Arc<PointLedger>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub ledger: GuardedPointLedger,
    pub version: String,
}

impl ServerState {
    pub fn new(config: ServerConfig, ledger: GuardedPointLedger) -> Self {
        ServerState {
            config,
            start_time: Instant::now(),
            ledger,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl FromRef<ServerState> for GuardedPointLedger {
    fn from_ref(input: &ServerState) -> Self {
        input.ledger.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
