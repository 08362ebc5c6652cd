//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per kiosk endpoint.
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::json;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get_home(&self) -> Response {
        self.client
            .get(self.url("/"))
            .send()
            .await
            .expect("Home request failed")
    }

    pub async fn get_settings(&self) -> Response {
        self.client
            .get(self.url("/v1/settings"))
            .send()
            .await
            .expect("Settings request failed")
    }

    pub async fn get_points(&self, phone: &str) -> Response {
        self.client
            .get(self.url(&format!("/v1/points/{}", phone)))
            .send()
            .await
            .expect("Get points request failed")
    }

    /// Adds the default per-tap amount
    pub async fn accrue(&self, phone: &str) -> Response {
        self.client
            .post(self.url(&format!("/v1/points/{}/accrue", phone)))
            .send()
            .await
            .expect("Accrue request failed")
    }

    pub async fn accrue_amount(&self, phone: &str, amount: u32) -> Response {
        self.client
            .post(self.url(&format!("/v1/points/{}/accrue", phone)))
            .json(&json!({ "amount": amount }))
            .send()
            .await
            .expect("Accrue request failed")
    }

    pub async fn redeem(&self, phone: &str) -> Response {
        self.client
            .post(self.url(&format!("/v1/points/{}/redeem", phone)))
            .send()
            .await
            .expect("Redeem request failed")
    }

    pub async fn get_redemptions(&self) -> Response {
        self.client
            .get(self.url("/v1/redemptions"))
            .send()
            .await
            .expect("Redemptions request failed")
    }

    /// Reads the balance, asserting the request succeeded
    pub async fn balance(&self, phone: &str) -> u32 {
        let response = self.get_points(phone).await;
        assert!(response.status().is_success(), "{:?}", response.status());
        let body: serde_json::Value = response.json().await.expect("Invalid JSON");
        body["points"].as_u64().expect("No points in body") as u32
    }
}
