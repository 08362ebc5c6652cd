//! HTTP client for a PostgREST endpoint (the REST face of a hosted Postgres,
//! e.g. Supabase).
//!
//! Every call is a single round-trip. Filters use PostgREST operators
//! (`phone_number=eq.0812345678`) and writes ask for the affected rows back
//! with `Prefer: return=representation`, so a conditional update that matched
//! nothing comes back as an empty array.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::error::StoreError;
use super::models::{HistoryEntry, NewPointAccount, NewRedemption, PointAccount, RedemptionRecord};
use super::trait_def::{PointStore, StoreResult};
use crate::config::StoreSettings;
use crate::server::metrics;

/// Postgres error code for unique constraint violations.
const UNIQUE_VIOLATION_CODE: &str = "23505";

pub struct PostgrestPointStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    points_table: String,
    history_table: String,
}

/// Error body returned by PostgREST on failed requests.
#[derive(Deserialize, Default)]
struct PostgrestErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

#[derive(Deserialize)]
struct EmbeddedAccount {
    points: u32,
}

/// A `redemption_history` row with its account row embedded as `account`.
#[derive(Deserialize)]
struct HistoryRow {
    #[serde(flatten)]
    record: RedemptionRecord,
    #[serde(default)]
    account: Option<EmbeddedAccount>,
}

impl PostgrestPointStore {
    /// Create a new client.
    ///
    /// The REST base is `{url}/{rest_path}`, e.g. `https://xyz.supabase.co/rest/v1`.
    pub fn new(settings: &StoreSettings) -> StoreResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_sec))
            .build()?;

        let base_url = format!(
            "{}/{}",
            settings.url.trim_end_matches('/'),
            settings.rest_path.trim_matches('/')
        );

        Ok(Self {
            client,
            base_url,
            api_key: settings.key.clone(),
            points_table: settings.points_table.clone(),
            history_table: settings.history_table.clone(),
        })
    }

    /// Get the REST base URL all tables live under.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn write_request(&self, method: Method, table: &str) -> RequestBuilder {
        self.request(method, table)
            .header("Prefer", "return=representation")
    }

    /// Sends the request and decodes the JSON array of rows PostgREST answers with.
    async fn fetch_rows<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> StoreResult<Vec<T>> {
        let start = Instant::now();
        let result = self.send_and_decode(request).await;
        metrics::record_store_call(operation, start.elapsed(), result.is_ok());
        if let Err(err) = &result {
            warn!("Point store {} failed: {}", operation, err);
        }
        result
    }

    async fn send_and_decode<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> StoreResult<Vec<T>> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_response(status, &body));
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|err| StoreError::Decode(err.to_string()))
    }
}

fn error_from_response(status: StatusCode, body: &str) -> StoreError {
    let parsed: PostgrestErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = match (parsed.message, parsed.details) {
        (Some(message), Some(details)) => format!("{} ({})", message, details),
        (Some(message), None) => message,
        (None, _) if !body.is_empty() => body.to_string(),
        (None, _) => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
    };

    if status == StatusCode::CONFLICT || parsed.code.as_deref() == Some(UNIQUE_VIOLATION_CODE) {
        StoreError::Conflict(message)
    } else {
        StoreError::Status {
            status: status.as_u16(),
            message,
        }
    }
}

fn single_row<T>(operation: &str, rows: Vec<T>) -> StoreResult<T> {
    rows.into_iter().next().ok_or_else(|| {
        StoreError::Decode(format!("{} returned no rows", operation))
    })
}

#[async_trait]
impl PointStore for PostgrestPointStore {
    async fn find_account(&self, phone_number: &str) -> StoreResult<Option<PointAccount>> {
        let request = self.request(Method::GET, &self.points_table).query(&[
            ("select", "*".to_string()),
            ("phone_number", format!("eq.{}", phone_number)),
            ("limit", "1".to_string()),
        ]);
        let rows: Vec<PointAccount> = self.fetch_rows("find_account", request).await?;
        debug!("Looked up {}: {} row(s)", phone_number, rows.len());
        Ok(rows.into_iter().next())
    }

    async fn insert_account(&self, account: NewPointAccount) -> StoreResult<PointAccount> {
        let request = self
            .write_request(Method::POST, &self.points_table)
            .json(&[account]);
        let rows = self.fetch_rows("insert_account", request).await?;
        single_row("insert_account", rows)
    }

    async fn update_points(
        &self,
        phone_number: &str,
        expected_points: u32,
        new_points: u32,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<Option<PointAccount>> {
        let request = self
            .write_request(Method::PATCH, &self.points_table)
            .query(&[
                ("phone_number", format!("eq.{}", phone_number)),
                ("points", format!("eq.{}", expected_points)),
            ])
            .json(&json!({
                "points": new_points,
                "updated_at": updated_at,
            }));
        let rows: Vec<PointAccount> = self.fetch_rows("update_points", request).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_redemption(&self, redemption: NewRedemption) -> StoreResult<RedemptionRecord> {
        let request = self
            .write_request(Method::POST, &self.history_table)
            .json(&[redemption]);
        let rows = self.fetch_rows("insert_redemption", request).await?;
        single_row("insert_redemption", rows)
    }

    async fn list_redemptions(&self) -> StoreResult<Vec<HistoryEntry>> {
        let select = format!("*,account:{}(points)", self.points_table);
        let request = self.request(Method::GET, &self.history_table).query(&[
            ("select", select),
            ("order", "created_at.desc".to_string()),
        ]);
        let rows: Vec<HistoryRow> = self.fetch_rows("list_redemptions", request).await?;
        Ok(rows
            .into_iter()
            .map(|row| HistoryEntry {
                record: row.record,
                current_points: row.account.map(|account| account.points),
            })
            .collect())
    }
}
