//! State of one kiosk screen.
//!
//! The session keeps what the customer typed, the last balance shown and the
//! last message. Each action ends by replacing the message exactly once, with
//! either its success text or the user-facing text of the failure.

use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use super::error::{LedgerError, LedgerResult};
use super::point_ledger::PointLedger;
use crate::config::LedgerSettings;
use crate::store::HistoryEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn is_error(&self) -> bool {
        self.kind == NoticeKind::Error
    }
}

pub(crate) fn added_message(amount: u32, points: u32) -> String {
    format!(
        "Added {} point{}! You now have {} points",
        amount,
        if amount == 1 { "" } else { "s" },
        points
    )
}

pub(crate) fn redeemed_message(settings: &LedgerSettings, points: u32) -> String {
    format!(
        "Redeemed {} points! You received {}. {} points left",
        settings.redemption_cost, settings.reward_name, points
    )
}

pub struct KioskSession {
    ledger: Arc<PointLedger>,
    phone_input: String,
    current_points: Option<u32>,
    notice: Option<Notice>,
}

impl KioskSession {
    pub fn new(ledger: Arc<PointLedger>) -> Self {
        Self {
            ledger,
            phone_input: String::new(),
            current_points: None,
            notice: None,
        }
    }

    pub fn phone_input(&self) -> &str {
        &self.phone_input
    }

    /// Last balance shown, None until one was fetched for the current input.
    pub fn current_points(&self) -> Option<u32> {
        self.current_points
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn ledger(&self) -> &PointLedger {
        &self.ledger
    }

    /// Replaces the typed phone number. The shown balance belonged to the old
    /// number, so it is dropped.
    pub fn set_phone_input(&mut self, input: &str) {
        self.phone_input = input.to_string();
        self.current_points = None;
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Looks up the balance of the typed phone number.
    pub async fn check_points(&mut self) -> &Notice {
        let result = self.fetch_balance().await;
        match result {
            Ok(points) => {
                self.current_points = Some(points);
                self.succeed(format!("You have {} points", points))
            }
            Err(err) => {
                self.current_points = None;
                self.fail("check_points", err)
            }
        }
    }

    /// Adds the per-tap amount to the typed phone number.
    pub async fn submit(&mut self) -> &Notice {
        let amount = self.ledger.settings().accrual_amount;
        self.add_points(amount).await
    }

    /// Adds `amount` points to the typed phone number. On success the input
    /// is cleared for the next customer while the new balance stays shown.
    pub async fn add_points(&mut self, amount: u32) -> &Notice {
        let result = self.accrue(amount).await;
        match result {
            Ok(points) => {
                self.phone_input.clear();
                self.current_points = Some(points);
                self.succeed(added_message(amount, points))
            }
            Err(err) => self.fail("add_points", err),
        }
    }

    /// Redeems one reward for the typed phone number.
    pub async fn redeem(&mut self) -> &Notice {
        let result = self.redeem_reward().await;
        match result {
            Ok(points) => {
                self.current_points = Some(points);
                let message = redeemed_message(self.ledger.settings(), points);
                self.succeed(message)
            }
            Err(err) => self.fail("redeem", err),
        }
    }

    /// Returns the redemption history, or None after reporting the failure.
    pub async fn history(&mut self) -> Option<Vec<HistoryEntry>> {
        match self.ledger.list_history().await {
            Ok(history) => {
                self.succeed(format!("{} redemptions so far", history.len()));
                Some(history)
            }
            Err(err) => {
                self.fail("history", err);
                None
            }
        }
    }

    /// Forgets the typed phone number and the shown balance. Stored points
    /// are untouched.
    pub fn clear(&mut self) -> &Notice {
        self.phone_input.clear();
        self.current_points = None;
        self.succeed("Form cleared".to_string())
    }

    async fn fetch_balance(&self) -> LedgerResult<u32> {
        let phone = self.ledger.validate_phone(&self.phone_input)?;
        self.ledger.get_balance(&phone).await
    }

    async fn accrue(&self, amount: u32) -> LedgerResult<u32> {
        let phone = self.ledger.validate_phone(&self.phone_input)?;
        self.ledger.add_points(&phone, amount).await
    }

    async fn redeem_reward(&self) -> LedgerResult<u32> {
        let phone = self.ledger.validate_phone(&self.phone_input)?;
        self.ledger.redeem(&phone).await
    }

    fn succeed(&mut self, message: String) -> &Notice {
        self.notice.insert(Notice {
            kind: NoticeKind::Success,
            message,
        })
    }

    fn fail(&mut self, action: &str, err: LedgerError) -> &Notice {
        if !err.is_validation() {
            warn!("Kiosk {} failed: {}", action, err);
        }
        self.notice.insert(Notice {
            kind: NoticeKind::Error,
            message: err.user_message(),
        })
    }
}
