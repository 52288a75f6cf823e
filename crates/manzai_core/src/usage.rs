//! Per-user usage and credit counters.

use serde::{Deserialize, Serialize};

/// One row of the usage table, keyed by user id.
///
/// A missing row is equivalent to [`UsageRecord::empty`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Opaque user identifier
    pub user_id: String,
    /// Number of successful generations so far
    pub output_count: u64,
    /// Purchased credits not yet spent
    pub paid_credits: u64,
}

impl UsageRecord {
    /// A zeroed row for a user that has never been seen.
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            output_count: 0,
            paid_credits: 0,
        }
    }
}
