//! Failure budget tracking
//!
//! Every response status is counted into the session's histogram. Once the
//! 4xx and 5xx buckets together reach the configured limit the session is
//! due for a forced reset.

use crate::types::{Session, STATUS_BUCKETS};

const CLIENT_ERROR_BUCKET: usize = 4;
const SERVER_ERROR_BUCKET: usize = 5;

/// Histogram bucket for a status code; codes of 500 and above share the last one
pub fn bucket(status: u16) -> usize {
    (status as usize / 100).min(STATUS_BUCKETS - 1)
}

/// Records response statuses against sessions and checks the failure budget
#[derive(Debug, Clone, Copy)]
pub struct FailureTracker {
    limit: i64,
}

impl FailureTracker {
    /// `limit <= 0` disables the budget
    pub fn new(limit: i64) -> Self {
        Self { limit }
    }

    pub fn enabled(&self) -> bool {
        self.limit > 0
    }

    /// Count `status` into the session histogram
    pub async fn record(&self, session: &Session, status: u16) {
        let mut state = session.state.write().await;
        state.histogram.increment(bucket(status));
        state.last_seen = crate::types::now_millis();
    }

    /// Whether the session has used up its failure budget
    pub async fn exceeds_budget(&self, session: &Session) -> bool {
        if !self.enabled() {
            return false;
        }
        let histogram = session.histogram().await;
        let failures =
            histogram.count(CLIENT_ERROR_BUCKET) + histogram.count(SERVER_ERROR_BUCKET);
        failures >= self.limit as u64
    }
}
