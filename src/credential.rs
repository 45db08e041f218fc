//! Credential strategies pinned to a session
//!
//! Two independent modes, both driven by the `apiKey` request header:
//!
//! - **relay** ([`KeyRelay`]): the last non-empty key a client sent is kept on
//!   the session and written back into every forwarded request, so a
//!   downstream authenticator sees it even when the client omits it.
//! - **verification** ([`KeyVerification`]): the key is checked against an
//!   expected value and the exchange is answered with `401` when neither
//!   the supplied nor the stored key matches.
//!
//! Both implement [`CredentialStrategy`], so the pipeline runs them without
//! knowing which are active.

use crate::config::SessionConfig;
use crate::filter::{header_str, set_header};
use crate::types::{Session, SessionAttrs};
use async_trait::async_trait;
use http::header::{HeaderMap, HeaderName};

/// Request header carrying the client's key
pub const API_KEY_HEADER: HeaderName = HeaderName::from_static("apikey");

/// Decision a strategy takes on a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialVerdict {
    Allow,
    Reject,
}

#[async_trait]
pub trait CredentialStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Seed the attributes of a session about to be created
    fn capture(&self, headers: &HeaderMap, attrs: &mut SessionAttrs);

    /// Refresh the stored credential from the key the client `supplied` and
    /// judge the request
    ///
    /// `supplied` is read from the inbound request before any strategy runs;
    /// strategies may rewrite `headers` for the upstream.
    async fn apply(
        &self,
        session: &Session,
        supplied: Option<&str>,
        headers: &mut HeaderMap,
    ) -> CredentialVerdict;
}

/// Strategies enabled by `config`, in the order they run
pub fn strategies_for(config: &SessionConfig) -> Vec<Box<dyn CredentialStrategy>> {
    let mut strategies: Vec<Box<dyn CredentialStrategy>> = Vec::new();
    if config.key_auth_enabled {
        strategies.push(Box::new(KeyRelay));
    }
    if config.custom_key_auth_enabled() {
        strategies.push(Box::new(KeyVerification::new(config.custom_key_auth.clone())));
    }
    strategies
}

/// Non-empty `apiKey` value sent by the client
pub fn supplied_key(headers: &HeaderMap) -> Option<String> {
    header_str(headers, &API_KEY_HEADER)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Keeps the client's key on the session and relays it downstream
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyRelay;

#[async_trait]
impl CredentialStrategy for KeyRelay {
    fn name(&self) -> &'static str {
        "key-relay"
    }

    fn capture(&self, headers: &HeaderMap, attrs: &mut SessionAttrs) {
        attrs.credential = supplied_key(headers);
    }

    async fn apply(
        &self,
        session: &Session,
        supplied: Option<&str>,
        headers: &mut HeaderMap,
    ) -> CredentialVerdict {
        if let Some(key) = supplied {
            session.set_credential(key).await;
        }

        match session.credential().await {
            Some(stored) => {
                if let Err(e) = set_header(headers, &API_KEY_HEADER, &stored) {
                    tracing::warn!(
                        session_id = %session.id(),
                        error = %e,
                        "Failed to relay key"
                    );
                }
            }
            None => {
                headers.remove(&API_KEY_HEADER);
            }
        }

        CredentialVerdict::Allow
    }
}

/// Rejects requests whose key does not match an expected value
#[derive(Debug, Clone)]
pub struct KeyVerification {
    expected: String,
}

impl KeyVerification {
    pub fn new(expected: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
        }
    }
}

#[async_trait]
impl CredentialStrategy for KeyVerification {
    fn name(&self) -> &'static str {
        "key-verification"
    }

    fn capture(&self, headers: &HeaderMap, attrs: &mut SessionAttrs) {
        attrs.custom_credential = supplied_key(headers);
    }

    async fn apply(
        &self,
        session: &Session,
        supplied: Option<&str>,
        _headers: &mut HeaderMap,
    ) -> CredentialVerdict {
        if let Some(key) = supplied {
            session.set_custom_credential(key).await;
        }
        let stored = session.custom_credential().await;

        let expected = Some(self.expected.as_str());
        if supplied == expected || stored.as_deref() == expected {
            CredentialVerdict::Allow
        } else {
            CredentialVerdict::Reject
        }
    }
}
