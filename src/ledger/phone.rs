use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::LedgerError;

/// Number of digits in a kiosk phone number.
pub const PHONE_NUMBER_DIGITS: usize = 10;

lazy_static! {
    static ref PHONE_NUMBER_REGEX: Regex =
        Regex::new(&format!(r"^[0-9]{{{}}}$", PHONE_NUMBER_DIGITS)).unwrap();
}

/// A phone number that passed kiosk validation: exactly ten ASCII digits.
///
/// The only way to obtain one is [`PhoneNumber::parse`], so every ledger
/// operation taking a `PhoneNumber` can skip re-validating it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(input: &str) -> Result<Self, LedgerError> {
        if PHONE_NUMBER_REGEX.is_match(input) {
            Ok(Self(input.to_string()))
        } else {
            Err(LedgerError::InvalidPhoneNumber {
                input: input.to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PhoneNumber> for String {
    fn from(value: PhoneNumber) -> Self {
        value.0
    }
}
