use thiserror::Error;

use super::PHONE_NUMBER_DIGITS;
use crate::store::StoreError;

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Everything a ledger operation can fail with.
///
/// An unknown phone number is not in here: it simply has a zero balance.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Invalid phone number: {input:?}")]
    InvalidPhoneNumber { input: String },

    #[error("Invalid amount {amount}: must be between 1 and {max}")]
    InvalidAmount { amount: u32, max: u32 },

    #[error("Invalid redemption cost {0}")]
    InvalidRedemptionCost(u32),

    #[error("Insufficient points: balance {balance}, required {required}")]
    InsufficientPoints { balance: u32, required: u32 },

    #[error("Balance {balance} cannot grow by {amount}")]
    BalanceOverflow { balance: u32, amount: u32 },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// Stable label for API error bodies and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::InvalidPhoneNumber { .. } => "invalid_phone_number",
            LedgerError::InvalidAmount { .. } => "invalid_amount",
            LedgerError::InvalidRedemptionCost(_) => "invalid_redemption_cost",
            LedgerError::InsufficientPoints { .. } => "insufficient_points",
            LedgerError::BalanceOverflow { .. } => "balance_overflow",
            LedgerError::Store(_) => "store",
        }
    }

    /// True for failures caused by what the customer typed or chose.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LedgerError::InvalidPhoneNumber { .. }
                | LedgerError::InvalidAmount { .. }
                | LedgerError::InvalidRedemptionCost(_)
        )
    }

    /// The message shown to the customer at the kiosk.
    pub fn user_message(&self) -> String {
        match self {
            LedgerError::InvalidPhoneNumber { .. } => {
                format!("Please enter a {}-digit mobile number", PHONE_NUMBER_DIGITS)
            }
            LedgerError::InvalidAmount { max, .. } => {
                format!("Please choose between 1 and {} points", max)
            }
            LedgerError::InvalidRedemptionCost(_) => {
                "This reward cannot be redeemed right now".to_string()
            }
            LedgerError::InsufficientPoints { balance, required } => format!(
                "Not enough points to redeem: you have {} and need {}",
                balance, required
            ),
            LedgerError::BalanceOverflow { .. } => {
                "This account cannot hold any more points".to_string()
            }
            LedgerError::Store(err) => {
                format!("Something went wrong, please try again ({})", err)
            }
        }
    }
}
