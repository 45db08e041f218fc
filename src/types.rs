//! Core session types for the a3s-session filter
//!
//! Snapshot types use camelCase JSON serialization for diagnostics output.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::RwLock;

/// Number of status buckets: 0xx, 1xx, 2xx, 3xx, 4xx and 5xx-and-above
pub const STATUS_BUCKETS: usize = 6;

/// Response status counts grouped by hundreds
///
/// Index `n` counts codes in `n*100..(n+1)*100`; the last bucket also
/// absorbs everything at or above 600.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistogram([u64; STATUS_BUCKETS]);

impl StatusHistogram {
    /// Count in a bucket; out-of-range buckets count as zero
    pub fn count(&self, bucket: usize) -> u64 {
        self.0.get(bucket).copied().unwrap_or(0)
    }

    pub(crate) fn increment(&mut self, bucket: usize) {
        let idx = bucket.min(STATUS_BUCKETS - 1);
        self.0[idx] = self.0[idx].saturating_add(1);
    }

    /// Total responses recorded
    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }
}

/// Initial attributes captured when a session is created
#[derive(Debug, Clone, Default)]
pub struct SessionAttrs {
    pub credential: Option<String>,
    pub custom_credential: Option<String>,
}

/// Mutable per-session state, touched by both filter phases
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub(crate) credential: Option<String>,
    pub(crate) custom_credential: Option<String>,
    pub(crate) sticky: bool,
    pub(crate) histogram: StatusHistogram,
    /// Every request-phase id attached to this session, oldest first
    pub(crate) request_ids: Vec<u32>,
    pub(crate) last_seen: u64,
}

/// Server-side record of one client, keyed by the id carried in its cookie
#[derive(Debug)]
pub struct Session {
    id: String,
    origin_request_id: u32,
    created_at: u64,
    pub(crate) state: RwLock<SessionState>,
}

impl Session {
    pub(crate) fn new(id: impl Into<String>, origin_request_id: u32, attrs: SessionAttrs) -> Self {
        let now = now_millis();
        Self {
            id: id.into(),
            origin_request_id,
            created_at: now,
            state: RwLock::new(SessionState {
                credential: attrs.credential,
                custom_credential: attrs.custom_credential,
                sticky: false,
                histogram: StatusHistogram::default(),
                request_ids: vec![origin_request_id],
                last_seen: now,
            }),
        }
    }

    /// Opaque session token
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Request-phase id of the exchange that created this session
    pub fn origin_request_id(&self) -> u32 {
        self.origin_request_id
    }

    /// Creation time in unix milliseconds
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub async fn credential(&self) -> Option<String> {
        self.state.read().await.credential.clone()
    }

    pub async fn custom_credential(&self) -> Option<String> {
        self.state.read().await.custom_credential.clone()
    }

    pub async fn sticky(&self) -> bool {
        self.state.read().await.sticky
    }

    pub async fn histogram(&self) -> StatusHistogram {
        self.state.read().await.histogram
    }

    /// Overwrite the relayed credential (last write wins)
    pub async fn set_credential(&self, value: impl Into<String>) {
        self.state.write().await.credential = Some(value.into());
    }

    /// Overwrite the verification credential (last write wins)
    pub async fn set_custom_credential(&self, value: impl Into<String>) {
        self.state.write().await.custom_credential = Some(value.into());
    }

    /// Point-in-time copy of the session for diagnostics
    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read().await;
        SessionSnapshot {
            session_id: self.id.clone(),
            origin_request_id: self.origin_request_id,
            created_at: self.created_at,
            last_seen: state.last_seen,
            has_credential: state.credential.is_some(),
            has_custom_credential: state.custom_credential.is_some(),
            sticky: state.sticky,
            status_histogram: state.histogram,
            request_ids: state.request_ids.clone(),
        }
    }
}

/// Serializable view of a session
///
/// Credentials are reported only by presence, never by value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: String,
    pub origin_request_id: u32,
    pub created_at: u64,
    pub last_seen: u64,
    pub has_credential: bool,
    pub has_custom_credential: bool,
    pub sticky: bool,
    pub status_histogram: StatusHistogram,
    pub request_ids: Vec<u32>,
}

/// Why a session left the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalReason {
    /// Expiry timer fired
    Timeout,
    /// Too many 4xx/5xx responses
    FailureThreshold,
    /// Store was cleared on shutdown
    Shutdown,
}

impl fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemovalReason::Timeout => f.write_str("timeout"),
            RemovalReason::FailureThreshold => f.write_str("failure-threshold exceeded"),
            RemovalReason::Shutdown => f.write_str("shutdown"),
        }
    }
}

/// Result of the request-phase callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The request continues to the upstream
    Forwarded {
        session_id: String,
        /// Whether this exchange created the session
        created: bool,
    },
    /// Verification failed; a 401 and the session cookie were written
    Rejected { session_id: String },
}

impl RequestOutcome {
    pub fn session_id(&self) -> &str {
        match self {
            RequestOutcome::Forwarded { session_id, .. } => session_id,
            RequestOutcome::Rejected { session_id } => session_id,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, RequestOutcome::Rejected { .. })
    }
}

/// Result of the response-phase callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// Status recorded and `Set-Cookie` written
    CookieReissued { session_id: String },
    /// Failure budget exhausted; the session was removed and no cookie written
    ExpiredByFailure { session_id: String },
    /// No live session matches this response
    Uncorrelated,
}

/// Current unix time in milliseconds
pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
