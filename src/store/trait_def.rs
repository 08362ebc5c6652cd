//! PointStore trait definition.
//!
//! The ledger only talks to the store through this trait, so the remote
//! PostgREST client and the in-memory store are interchangeable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::StoreError;
use super::models::{HistoryEntry, NewPointAccount, NewRedemption, PointAccount, RedemptionRecord};

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PointStore: Send + Sync {
    /// Returns the account of the given phone number.
    /// Returns Ok(None) if the phone number has no account yet.
    async fn find_account(&self, phone_number: &str) -> StoreResult<Option<PointAccount>>;

    /// Inserts a new account.
    /// Returns Err(StoreError::Conflict) if the phone number already has one.
    async fn insert_account(&self, account: NewPointAccount) -> StoreResult<PointAccount>;

    /// Sets the balance of an account, but only if it currently equals `expected_points`.
    /// Returns Ok(None) if the account is missing or its balance changed since it was read.
    async fn update_points(
        &self,
        phone_number: &str,
        expected_points: u32,
        new_points: u32,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<Option<PointAccount>>;

    /// Appends a row to the redemption history.
    async fn insert_redemption(&self, redemption: NewRedemption) -> StoreResult<RedemptionRecord>;

    /// Returns the whole redemption history, newest first.
    async fn list_redemptions(&self) -> StoreResult<Vec<HistoryEntry>>;
}
