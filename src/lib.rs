//! Loyalty Kiosk Library
//!
//! This library exposes the internal modules for the kiosk binaries and for testing.

pub mod config;
pub mod ledger;
pub mod server;
pub mod store;

// Re-export commonly used types for convenience
pub use ledger::{KioskSession, LedgerError, PhoneNumber, PointLedger};
pub use server::{run_server, RequestsLoggingLevel};
pub use store::{InMemoryPointStore, PointStore, PostgrestPointStore, StoreError};
