//! In-memory point store.
//!
//! Holds accounts and redemption history in process memory. Used as the
//! substitute store in tests and for local kiosk demos without a backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use super::error::StoreError;
use super::models::{HistoryEntry, NewPointAccount, NewRedemption, PointAccount, RedemptionRecord};
use super::trait_def::{PointStore, StoreResult};

#[derive(Default)]
struct MemoryState {
    accounts: HashMap<String, PointAccount>,
    redemptions: Vec<RedemptionRecord>,
    unavailable: Option<String>,
}

#[derive(Default)]
pub struct InMemoryPointStore {
    state: Mutex<MemoryState>,
}

impl InMemoryPointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following call fail with `StoreError::Unavailable` until
    /// [`InMemoryPointStore::set_available`] is called.
    pub fn set_unavailable(&self, reason: &str) {
        self.lock().unavailable = Some(reason.to_string());
    }

    pub fn set_available(&self) {
        self.lock().unavailable = None;
    }

    /// Number of stored accounts, bypassing the availability switch.
    pub fn accounts_count(&self) -> usize {
        self.lock().accounts.len()
    }

    /// Number of stored redemptions, bypassing the availability switch.
    pub fn redemptions_count(&self) -> usize {
        self.lock().redemptions.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn available(&self) -> StoreResult<std::sync::MutexGuard<'_, MemoryState>> {
        let state = self.lock();
        match &state.unavailable {
            Some(reason) => Err(StoreError::Unavailable(reason.clone())),
            None => Ok(state),
        }
    }
}

#[async_trait]
impl PointStore for InMemoryPointStore {
    async fn find_account(&self, phone_number: &str) -> StoreResult<Option<PointAccount>> {
        let state = self.available()?;
        Ok(state.accounts.get(phone_number).cloned())
    }

    async fn insert_account(&self, account: NewPointAccount) -> StoreResult<PointAccount> {
        let mut state = self.available()?;
        if state.accounts.contains_key(&account.phone_number) {
            return Err(StoreError::Conflict(format!(
                "an account for {} already exists",
                account.phone_number
            )));
        }
        let stored = PointAccount {
            id: Some(Uuid::new_v4().to_string()),
            phone_number: account.phone_number.clone(),
            points: account.points,
            created_at: account.created_at,
            updated_at: account.updated_at,
        };
        state.accounts.insert(account.phone_number, stored.clone());
        Ok(stored)
    }

    async fn update_points(
        &self,
        phone_number: &str,
        expected_points: u32,
        new_points: u32,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<Option<PointAccount>> {
        let mut state = self.available()?;
        match state.accounts.get_mut(phone_number) {
            Some(account) if account.points == expected_points => {
                account.points = new_points;
                account.updated_at = updated_at;
                Ok(Some(account.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn insert_redemption(&self, redemption: NewRedemption) -> StoreResult<RedemptionRecord> {
        let mut state = self.available()?;
        let record = RedemptionRecord {
            id: Uuid::new_v4().to_string(),
            phone_number: redemption.phone_number,
            points_used: redemption.points_used,
            created_at: redemption.created_at,
        };
        state.redemptions.push(record.clone());
        Ok(record)
    }

    async fn list_redemptions(&self) -> StoreResult<Vec<HistoryEntry>> {
        let state = self.available()?;
        let mut indexed: Vec<(usize, &RedemptionRecord)> =
            state.redemptions.iter().enumerate().collect();
        // Newest first; records sharing a timestamp keep reverse insertion order.
        indexed.sort_by(|(a_idx, a), (b_idx, b)| {
            b.created_at.cmp(&a.created_at).then(b_idx.cmp(a_idx))
        });
        Ok(indexed
            .into_iter()
            .map(|(_, record)| HistoryEntry {
                record: record.clone(),
                current_points: state
                    .accounts
                    .get(&record.phone_number)
                    .map(|account| account.points),
            })
            .collect())
    }
}
