use thiserror::Error;

/// Failures of a round-trip to the point store.
///
/// A missing row is never a `StoreError`: lookups return `Ok(None)` instead.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to reach the point store: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Point store responded with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Conflicting write: {0}")]
    Conflict(String),

    #[error("Unexpected response from the point store: {0}")]
    Decode(String),

    #[error("Point store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Request(_) => "request",
            StoreError::Status { .. } => "status",
            StoreError::Conflict(_) => "conflict",
            StoreError::Decode(_) => "decode",
            StoreError::Unavailable(_) => "unavailable",
        }
    }

    /// True when the store answered and did not apply the write. Transport
    /// failures and unreadable responses leave the outcome unknown.
    pub fn write_rejected(&self) -> bool {
        matches!(
            self,
            StoreError::Status { .. } | StoreError::Conflict(_) | StoreError::Unavailable(_)
        )
    }
}
