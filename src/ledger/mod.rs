mod error;
mod phone;
mod point_ledger;
mod session;

pub use error::{LedgerError, LedgerResult};
pub use phone::{PhoneNumber, PHONE_NUMBER_DIGITS};
pub use point_ledger::PointLedger;
pub use session::{KioskSession, Notice, NoticeKind};
pub(crate) use session::{added_message, redeemed_message};
