//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestServer, TestClient, PHONE_NUMBER};
//! use reqwest::StatusCode;
//!
//! #[tokio::test]
//! async fn test_get_points() {
//!     let server = TestServer::spawn().await;
//!     let client = TestClient::new(server.base_url.clone());
//!
//!     let response = client.get_points(PHONE_NUMBER).await;
//!     assert_eq!(response.status(), StatusCode::OK);
//! }
//! ```
#![allow(dead_code)]

mod client;
mod constants;
mod fake_postgrest;
mod server;

// Public API - this is what tests import
pub use client::TestClient;
pub use constants::*;
pub use fake_postgrest::{FakePostgrest, RecordedRequest};
pub use server::TestServer;
