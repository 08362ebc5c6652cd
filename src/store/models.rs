use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// The point balance of one phone number, as stored in the `points` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointAccount {
    #[serde(
        default,
        deserialize_with = "deserialize_optional_record_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    pub phone_number: String,
    pub points: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row inserted on the first accrual for an unseen phone number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPointAccount {
    pub phone_number: String,
    pub points: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One row of the append-only `redemption_history` log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedemptionRecord {
    #[serde(deserialize_with = "deserialize_record_id")]
    pub id: String,
    pub phone_number: String,
    pub points_used: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRedemption {
    pub phone_number: String,
    pub points_used: u32,
    pub created_at: DateTime<Utc>,
}

/// A redemption joined with the current balance of the redeeming account.
///
/// `current_points` is `None` when the account row could not be joined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub record: RedemptionRecord,
    pub current_points: Option<u32>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRecordId {
    Text(String),
    Number(i64),
}

impl From<RawRecordId> for String {
    fn from(value: RawRecordId) -> Self {
        match value {
            RawRecordId::Text(text) => text,
            RawRecordId::Number(number) => number.to_string(),
        }
    }
}

/// Store-assigned ids are uuids in some deployments and bigserials in others.
fn deserialize_record_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawRecordId::deserialize(deserializer).map(String::from)
}

fn deserialize_optional_record_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<RawRecordId>::deserialize(deserializer).map(|id| id.map(String::from))
}
