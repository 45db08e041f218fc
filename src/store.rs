//! Dual-indexed in-memory session store
//!
//! Sessions are reachable by their id (cookie-driven lookups) and by every
//! request-phase id attached to them (response-phase correlation). Both
//! indices are guarded by their own `RwLock`; whenever both are needed the
//! by-id lock is taken first.

use crate::error::{Result, SessionError};
use crate::types::{now_millis, RemovalReason, Session, SessionAttrs};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Index sizes at a point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Live sessions
    pub sessions: usize,
    /// Request ids pointing at live sessions
    pub correlations: usize,
}

/// Concurrent session store shared by both filter phases and the expiry timers
#[derive(Default)]
pub struct SessionStore {
    /// session id → session
    by_id: RwLock<HashMap<String, Arc<Session>>>,

    /// request-phase id → session
    by_request: RwLock<HashMap<u32, Arc<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a session by the id carried in its cookie
    pub async fn lookup(&self, session_id: &str) -> Option<Arc<Session>> {
        self.by_id.read().await.get(session_id).cloned()
    }

    /// Find the session a request-phase id was attached to
    pub async fn lookup_by_correlation(&self, request_id: u32) -> Option<Arc<Session>> {
        self.by_request.read().await.get(&request_id).cloned()
    }

    /// Create a session and index it under both its id and `request_id`
    ///
    /// Both indices are written inside one critical section. Fails only if
    /// `session_id` is already taken.
    pub async fn create(
        &self,
        request_id: u32,
        session_id: &str,
        attrs: SessionAttrs,
    ) -> Result<Arc<Session>> {
        let mut by_id = self.by_id.write().await;
        if by_id.contains_key(session_id) {
            return Err(SessionError::DuplicateSession(session_id.to_string()));
        }

        let session = Arc::new(Session::new(session_id, request_id, attrs));
        let mut by_request = self.by_request.write().await;
        by_id.insert(session_id.to_string(), session.clone());
        if let Some(previous) = by_request.insert(request_id, session.clone()) {
            tracing::debug!(
                request_id,
                previous = %previous.id(),
                "Request id re-attached to a new session"
            );
        }
        drop(by_request);
        drop(by_id);

        tracing::info!(session_id = %session_id, request_id, "Session created");
        Ok(session)
    }

    /// Attach another request-phase id to an existing session (repeat visit)
    ///
    /// Returns `false` when the session has been removed in the meantime, in
    /// which case nothing is indexed.
    pub async fn attach_correlation(&self, request_id: u32, session: &Arc<Session>) -> bool {
        let by_id = self.by_id.read().await;
        let live = by_id
            .get(session.id())
            .is_some_and(|current| Arc::ptr_eq(current, session));
        if !live {
            return false;
        }

        // Record the id on the session before releasing `by_id` so a concurrent
        // `remove` sees it and drops the index entry too
        self.by_request
            .write()
            .await
            .insert(request_id, session.clone());
        {
            let mut state = session.state.write().await;
            state.request_ids.push(request_id);
            state.last_seen = now_millis();
        }
        drop(by_id);

        tracing::debug!(session_id = %session.id(), request_id, "Correlation attached");
        true
    }

    /// Remove a session from both indices
    ///
    /// Removing an absent session is a no-op; returns whether anything was
    /// removed.
    pub async fn remove(&self, session_id: &str, reason: RemovalReason) -> bool {
        let mut by_id = self.by_id.write().await;
        let Some(session) = by_id.remove(session_id) else {
            tracing::debug!(session_id = %session_id, reason = %reason, "Session already gone");
            return false;
        };

        let request_ids = session.state.read().await.request_ids.clone();
        let mut by_request = self.by_request.write().await;
        for request_id in request_ids {
            // The id may have been reused by a newer session; leave that one alone
            if by_request
                .get(&request_id)
                .is_some_and(|s| Arc::ptr_eq(s, &session))
            {
                by_request.remove(&request_id);
            }
        }
        drop(by_request);
        drop(by_id);

        tracing::info!(session_id = %session_id, reason = %reason, "Session removed");
        true
    }

    /// Remove every session, returning how many were dropped
    pub async fn clear(&self, reason: RemovalReason) -> usize {
        let mut by_id = self.by_id.write().await;
        let mut by_request = self.by_request.write().await;
        let count = by_id.len();
        by_id.clear();
        by_request.clear();

        tracing::info!(count, reason = %reason, "Session store cleared");
        count
    }

    pub async fn len(&self) -> usize {
        self.by_id.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.by_id.read().await.is_empty()
    }

    /// Ids of all live sessions, in no particular order
    pub async fn session_ids(&self) -> Vec<String> {
        self.by_id.read().await.keys().cloned().collect()
    }

    pub async fn stats(&self) -> StoreStats {
        let sessions = self.by_id.read().await.len();
        let correlations = self.by_request.read().await.len();
        StoreStats {
            sessions,
            correlations,
        }
    }
}
