//! Wall-clock helpers
//!
//! Token expiry is an absolute Unix timestamp compared against local time.
//! Clock skew between peers is not compensated.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in whole Unix seconds
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
