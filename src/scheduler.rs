//! Session expiry timers
//!
//! One detached task per session. The task sleeps without touching the
//! store and only takes the store locks for the final `remove`, which is
//! idempotent, so a timer outliving its session is harmless.

use crate::store::SessionStore;
use crate::types::RemovalReason;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinSet;

/// Arms one-shot removal timers against a [`SessionStore`]
pub struct ExpiryScheduler {
    store: Arc<SessionStore>,
    tasks: Mutex<JoinSet<()>>,
}

impl ExpiryScheduler {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self {
            store,
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    /// Remove `session_id` from the store once `timeout` elapses
    ///
    /// `None` means the session never expires; nothing is scheduled and
    /// `false` is returned. Must be called from within a tokio runtime.
    pub fn schedule(&self, session_id: &str, timeout: Option<Duration>) -> bool {
        let Some(delay) = timeout else {
            return false;
        };

        let store = self.store.clone();
        let session_id = session_id.to_string();

        let mut tasks = self.tasks();
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            tokio::time::sleep(delay).await;
            store.remove(&session_id, RemovalReason::Timeout).await;
        });

        true
    }

    /// Timers that have not fired yet
    pub fn pending(&self) -> usize {
        let mut tasks = self.tasks();
        while tasks.try_join_next().is_some() {}
        tasks.len()
    }

    /// Cancel every pending timer
    pub fn shutdown(&self) {
        let mut tasks = self.tasks();
        let pending = tasks.len();
        tasks.abort_all();
        tracing::debug!(pending, "Expiry timers aborted");
    }

    fn tasks(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
