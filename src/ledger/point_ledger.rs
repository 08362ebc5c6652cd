//! The point-ledger update protocol.
//!
//! Balance changes are computed from a previous read, but the write is
//! conditional on the balance still being the one that was read. When another
//! writer got in between, the read is repeated and the change re-applied, up to
//! `max_update_attempts` times.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::error::{LedgerError, LedgerResult};
use super::phone::PhoneNumber;
use crate::config::LedgerSettings;
use crate::server::metrics;
use crate::store::{
    HistoryEntry, NewPointAccount, NewRedemption, PointAccount, PointStore, StoreError,
};

pub struct PointLedger {
    store: Arc<dyn PointStore>,
    settings: LedgerSettings,
}

impl PointLedger {
    pub fn new(store: Arc<dyn PointStore>, settings: LedgerSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    /// Checks the shape of a typed phone number. Never touches the store.
    pub fn validate_phone(&self, input: &str) -> LedgerResult<PhoneNumber> {
        let result = PhoneNumber::parse(input);
        if let Err(err) = &result {
            metrics::record_ledger_operation("validate_phone", Err(err.kind()));
        }
        result
    }

    /// Returns the account of `phone`, or None if it never accrued points.
    pub async fn find_account(&self, phone: &PhoneNumber) -> LedgerResult<Option<PointAccount>> {
        Ok(self.store.find_account(phone.as_str()).await?)
    }

    /// Returns the balance of `phone`; unknown phone numbers have 0 points.
    pub async fn get_balance(&self, phone: &PhoneNumber) -> LedgerResult<u32> {
        let result = self
            .find_account(phone)
            .await
            .map(|account| account.map_or(0, |account| account.points));
        observe("get_balance", &result);
        result
    }

    /// Adds the configured per-tap amount to `phone`.
    pub async fn accrue(&self, phone: &PhoneNumber) -> LedgerResult<u32> {
        self.add_points(phone, self.settings.accrual_amount).await
    }

    /// Adds `amount` points to `phone`, opening the account if needed.
    /// Returns the new balance.
    pub async fn add_points(&self, phone: &PhoneNumber, amount: u32) -> LedgerResult<u32> {
        let result = self.try_add_points(phone, amount).await;
        observe("add_points", &result);
        if result.is_ok() {
            metrics::record_points_accrued(amount);
        }
        result
    }

    /// Redeems one reward at the configured cost. Returns the new balance.
    pub async fn redeem(&self, phone: &PhoneNumber) -> LedgerResult<u32> {
        self.redeem_points(phone, self.settings.redemption_cost)
            .await
    }

    /// Takes `cost` points from `phone` and logs the redemption.
    /// Returns the new balance.
    pub async fn redeem_points(&self, phone: &PhoneNumber, cost: u32) -> LedgerResult<u32> {
        let result = self.try_redeem_points(phone, cost).await;
        observe("redeem", &result);
        if result.is_ok() {
            metrics::record_points_redeemed(cost);
        }
        result
    }

    /// Returns every redemption, newest first.
    pub async fn list_history(&self) -> LedgerResult<Vec<HistoryEntry>> {
        let result = self
            .store
            .list_redemptions()
            .await
            .map_err(LedgerError::from);
        observe("list_history", &result);
        result
    }

    async fn try_add_points(&self, phone: &PhoneNumber, amount: u32) -> LedgerResult<u32> {
        let max = self.settings.max_accrual_amount;
        if amount == 0 || amount > max {
            return Err(LedgerError::InvalidAmount { amount, max });
        }

        for attempt in 1..=self.settings.max_update_attempts {
            match self.store.find_account(phone.as_str()).await? {
                None => {
                    let now = Utc::now();
                    let new_account = NewPointAccount {
                        phone_number: phone.to_string(),
                        points: amount,
                        created_at: now,
                        updated_at: now,
                    };
                    match self.store.insert_account(new_account).await {
                        Ok(account) => {
                            info!("Opened account {} with {} points", phone, account.points);
                            return Ok(account.points);
                        }
                        Err(StoreError::Conflict(reason)) => {
                            debug!(
                                "Account {} was opened concurrently (attempt {}): {}",
                                phone, attempt, reason
                            );
                        }
                        Err(err) => return Err(err.into()),
                    }
                }
                Some(account) => {
                    let new_points = account.points.checked_add(amount).ok_or(
                        LedgerError::BalanceOverflow {
                            balance: account.points,
                            amount,
                        },
                    )?;
                    let updated = self
                        .store
                        .update_points(phone.as_str(), account.points, new_points, Utc::now())
                        .await?;
                    if let Some(updated) = updated {
                        info!("Added {} points to {}: {} total", amount, phone, updated.points);
                        return Ok(updated.points);
                    }
                    debug!(
                        "Balance of {} changed while adding points (attempt {})",
                        phone, attempt
                    );
                }
            }
        }

        Err(self.exhausted(phone))
    }

    async fn try_redeem_points(&self, phone: &PhoneNumber, cost: u32) -> LedgerResult<u32> {
        if cost == 0 {
            return Err(LedgerError::InvalidRedemptionCost(cost));
        }

        let mut remaining = None;
        for attempt in 1..=self.settings.max_update_attempts {
            let account = self.store.find_account(phone.as_str()).await?;
            let balance = account.as_ref().map_or(0, |account| account.points);
            if balance < cost {
                return Err(LedgerError::InsufficientPoints {
                    balance,
                    required: cost,
                });
            }

            let updated = self
                .store
                .update_points(phone.as_str(), balance, balance - cost, Utc::now())
                .await?;
            if let Some(updated) = updated {
                remaining = Some(updated.points);
                break;
            }
            debug!(
                "Balance of {} changed while redeeming (attempt {})",
                phone, attempt
            );
        }
        let remaining = remaining.ok_or_else(|| self.exhausted(phone))?;

        let redemption = NewRedemption {
            phone_number: phone.to_string(),
            points_used: cost,
            created_at: Utc::now(),
        };
        if let Err(err) = self.store.insert_redemption(redemption).await {
            if err.write_rejected() {
                error!(
                    "Failed to log redemption of {} points for {}: {}",
                    cost, phone, err
                );
                self.restore_points(phone, remaining, cost).await;
            } else {
                // The row may have been written, so the points stay spent.
                error!(
                    "Redemption of {} points for {} has unknown outcome, not restoring: {}",
                    cost, phone, err
                );
            }
            return Err(err.into());
        }

        info!("Redeemed {} points for {}: {} left", cost, phone, remaining);
        Ok(remaining)
    }

    /// Gives back the points of a redemption whose history row could not be written.
    async fn restore_points(&self, phone: &PhoneNumber, current: u32, cost: u32) {
        let restored = current.saturating_add(cost);
        match self
            .store
            .update_points(phone.as_str(), current, restored, Utc::now())
            .await
        {
            Ok(Some(_)) => warn!("Restored {} points to {}", cost, phone),
            Ok(None) => error!(
                "Could not restore {} points to {}: balance changed in the meantime",
                cost, phone
            ),
            Err(err) => error!("Could not restore {} points to {}: {}", cost, phone, err),
        }
    }

    fn exhausted(&self, phone: &PhoneNumber) -> LedgerError {
        StoreError::Conflict(format!(
            "balance of {} kept changing, gave up after {} attempts",
            phone, self.settings.max_update_attempts
        ))
        .into()
    }
}

fn observe<T>(operation: &str, result: &LedgerResult<T>) {
    metrics::record_ledger_operation(operation, result.as_ref().map(|_| ()).map_err(|e| e.kind()));
}
