//! Session filter pipeline
//!
//! `SessionFilterPipeline` implements [`HostFilter`] on top of a
//! [`SessionStore`]. Per exchange:
//!
//! 1. request phase: resolve the session from the cookie or create one, bind
//!    the request id to it, run the credential strategies;
//! 2. response phase: map the response id back to the request id, record the
//!    status, then either reissue the cookie or reset the session.

use crate::config::SessionConfig;
use crate::cookie;
use crate::correlation::{Correlator, OffsetCorrelator};
use crate::credential::{self, CredentialStrategy, CredentialVerdict};
use crate::error::Result;
use crate::failure::FailureTracker;
use crate::filter::{
    header_str, set_header, FilterRequest, FilterResponse, HostFilter, ResponseWriter,
};
use crate::scheduler::ExpiryScheduler;
use crate::store::SessionStore;
use crate::types::{RemovalReason, RequestOutcome, ResponseOutcome, Session, SessionAttrs};
use async_trait::async_trait;
use http::header::{HeaderMap, HeaderName, COOKIE, SET_COOKIE};
use http::StatusCode;
use std::sync::Arc;

/// Name the filter registers under
pub const PLUGIN_NAME: &str = "session_manager";

/// Request/response filter pair maintaining cookie-keyed sessions
pub struct SessionFilterPipeline {
    store: Arc<SessionStore>,
    scheduler: ExpiryScheduler,
    /// Replaces the per-config offset correlator when set
    correlator: Option<Box<dyn Correlator>>,
}

impl SessionFilterPipeline {
    /// Create a pipeline with its own empty store
    pub fn new() -> Self {
        Self::with_store(Arc::new(SessionStore::new()))
    }

    /// Create a pipeline over an existing store
    pub fn with_store(store: Arc<SessionStore>) -> Self {
        Self {
            scheduler: ExpiryScheduler::new(store.clone()),
            store,
            correlator: None,
        }
    }

    /// Use `correlator` instead of the offset from each route's config
    pub fn with_correlator(mut self, correlator: impl Correlator + 'static) -> Self {
        self.correlator = Some(Box::new(correlator));
        self
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn scheduler(&self) -> &ExpiryScheduler {
        &self.scheduler
    }

    /// Cancel expiry timers and drop every session
    pub async fn shutdown(&self) {
        self.scheduler.shutdown();
        self.store.clear(RemovalReason::Shutdown).await;
    }

    fn request_id_for(&self, config: &SessionConfig, response_id: u32) -> Option<u32> {
        match &self.correlator {
            Some(c) => c.request_id_for(response_id),
            None => OffsetCorrelator::new(config.correlation_offset).request_id_for(response_id),
        }
    }

    /// Session named by the request cookie, bound to this request id
    async fn resume_session(
        &self,
        config: &SessionConfig,
        request_id: u32,
        headers: &HeaderMap,
    ) -> Option<Arc<Session>> {
        let header = header_str(headers, &COOKIE)?;
        let session_id = cookie::extract(header, &config.cookie_name)?;
        let session = self.store.lookup(session_id).await?;

        if self.store.attach_correlation(request_id, &session).await {
            Some(session)
        } else {
            tracing::debug!(session_id = %session_id, "Session removed during lookup");
            None
        }
    }

    async fn create_session(
        &self,
        config: &SessionConfig,
        strategies: &[Box<dyn CredentialStrategy>],
        request: &mut dyn FilterRequest,
    ) -> Arc<Session> {
        let mut attrs = SessionAttrs::default();
        for strategy in strategies {
            strategy.capture(request.headers(), &mut attrs);
        }

        let session = loop {
            let session_id = uuid::Uuid::new_v4().to_string();
            match self.store.create(request.id(), &session_id, attrs.clone()).await {
                Ok(session) => break session,
                Err(e) => tracing::debug!(error = %e, "Retrying session creation"),
            }
        };

        // Downstream hashing on the cookie sees the new id on this very request
        let assignment = cookie::build_set_cookie(&config.cookie_name, session.id());
        write_header(request.headers_mut(), &COOKIE, &assignment, session.id());

        self.scheduler.schedule(session.id(), config.session_timeout());
        session
    }
}

impl Default for SessionFilterPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HostFilter for SessionFilterPipeline {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn parse_conf(&self, raw: &[u8]) -> Result<SessionConfig> {
        SessionConfig::from_slice(raw)
    }

    async fn request_filter(
        &self,
        config: &SessionConfig,
        writer: &mut dyn ResponseWriter,
        request: &mut dyn FilterRequest,
    ) -> RequestOutcome {
        tracing::debug!(request_id = request.id(), "Request filter");
        let strategies = credential::strategies_for(config);
        let supplied = credential::supplied_key(request.headers());

        let resumed = self
            .resume_session(config, request.id(), request.headers())
            .await;
        let (session, created) = match resumed {
            Some(session) => (session, false),
            None => (self.create_session(config, &strategies, request).await, true),
        };

        for strategy in &strategies {
            let verdict = strategy
                .apply(&session, supplied.as_deref(), request.headers_mut())
                .await;
            if verdict == CredentialVerdict::Reject {
                tracing::warn!(
                    session_id = %session.id(),
                    request_id = request.id(),
                    strategy = strategy.name(),
                    "Request rejected"
                );
                // No response phase follows a short-circuit, so the cookie goes out now
                let assignment = cookie::build_set_cookie(&config.cookie_name, session.id());
                write_header(writer.headers_mut(), &SET_COOKIE, &assignment, session.id());
                writer.write_status(StatusCode::UNAUTHORIZED);
                return RequestOutcome::Rejected {
                    session_id: session.id().to_string(),
                };
            }
        }

        RequestOutcome::Forwarded {
            session_id: session.id().to_string(),
            created,
        }
    }

    async fn response_filter(
        &self,
        config: &SessionConfig,
        response: &mut dyn FilterResponse,
    ) -> ResponseOutcome {
        let response_id = response.id();
        tracing::debug!(response_id, "Response filter");

        let Some(request_id) = self.request_id_for(config, response_id) else {
            tracing::debug!(response_id, "No request id maps to response");
            return ResponseOutcome::Uncorrelated;
        };
        let Some(session) = self.store.lookup_by_correlation(request_id).await else {
            tracing::debug!(response_id, request_id, "No session for exchange");
            return ResponseOutcome::Uncorrelated;
        };

        let tracker = FailureTracker::new(config.failure_limit);
        tracker.record(&session, response.status().as_u16()).await;

        if tracker.exceeds_budget(&session).await {
            self.store
                .remove(session.id(), RemovalReason::FailureThreshold)
                .await;
            return ResponseOutcome::ExpiredByFailure {
                session_id: session.id().to_string(),
            };
        }

        let assignment = cookie::build_set_cookie(&config.cookie_name, session.id());
        write_header(response.headers_mut(), &SET_COOKIE, &assignment, session.id());
        ResponseOutcome::CookieReissued {
            session_id: session.id().to_string(),
        }
    }
}

fn write_header(headers: &mut HeaderMap, name: &HeaderName, value: &str, session_id: &str) {
    if let Err(e) = set_header(headers, name, value) {
        tracing::warn!(session_id = %session_id, error = %e, "Failed to write header");
    }
}
