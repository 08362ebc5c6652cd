//! Shared constants for end-to-end tests

// ============================================================================
// Phone numbers
// ============================================================================

/// Phone number used by the walk-through scenarios
pub const PHONE_NUMBER: &str = "0812345678";

/// A second customer
pub const OTHER_PHONE_NUMBER: &str = "0899999999";

/// Too short to be a mobile number
pub const SHORT_PHONE_NUMBER: &str = "12345";

// ============================================================================
// Point store
// ============================================================================

/// Access key the fake PostgREST server expects
pub const STORE_KEY: &str = "test-anon-key";

pub const POINTS_TABLE: &str = "points";

pub const HISTORY_TABLE: &str = "redemption_history";

// ============================================================================
// Timeouts
// ============================================================================

/// How long to wait for a spawned server to answer
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Delay between readiness probes
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 20;

/// Timeout of every test client request
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
