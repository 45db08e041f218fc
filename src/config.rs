//! Per-route filter configuration
//!
//! Decoded once by the host adapter from the plugin's JSON configuration
//! and passed by reference into every callback.

use crate::error::{Result, SessionError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Session filter configuration
///
/// Field names are camelCase on the wire:
///
/// ```json
/// {"sessionTimeoutInSeconds": 300, "cookie": "sid", "failureLimit": 3}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Session lifetime; zero or negative means the session never expires
    #[serde(default)]
    pub session_timeout_in_seconds: i64,

    /// Name of the cookie carrying the session id
    #[serde(rename = "cookie", default = "default_cookie")]
    pub cookie_name: String,

    /// Pin the `apiKey` header to the session and relay it downstream
    #[serde(default)]
    pub key_auth_enabled: bool,

    /// Expected `apiKey` value; empty disables verification
    #[serde(default)]
    pub custom_key_auth: String,

    /// Number of 4xx/5xx responses after which a session is reset; zero disables
    #[serde(default)]
    pub failure_limit: i64,

    /// Distance between a response-phase id and its request-phase id
    #[serde(default = "default_correlation_offset")]
    pub correlation_offset: u32,
}

fn default_cookie() -> String {
    "session-id".to_string()
}

fn default_correlation_offset() -> u32 {
    1
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_timeout_in_seconds: 0,
            cookie_name: default_cookie(),
            key_auth_enabled: false,
            custom_key_auth: String::new(),
            failure_limit: 0,
            correlation_offset: default_correlation_offset(),
        }
    }
}

impl SessionConfig {
    /// Decode and validate a JSON configuration
    pub fn from_slice(raw: &[u8]) -> Result<Self> {
        let config: SessionConfig = serde_json::from_slice(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can produce well-formed cookies
    pub fn validate(&self) -> Result<()> {
        if self.cookie_name.is_empty() {
            return Err(SessionError::Config("cookie name must not be empty".into()));
        }
        if let Some(c) = self
            .cookie_name
            .chars()
            .find(|c| *c == ';' || *c == '=' || c.is_whitespace() || c.is_control())
        {
            return Err(SessionError::Config(format!(
                "cookie name '{}' contains forbidden character {:?}",
                self.cookie_name, c
            )));
        }
        Ok(())
    }

    /// Session lifetime, or `None` for sessions that never expire
    pub fn session_timeout(&self) -> Option<Duration> {
        (self.session_timeout_in_seconds > 0)
            .then(|| Duration::from_secs(self.session_timeout_in_seconds as u64))
    }

    /// Whether the verification credential mode is active
    pub fn custom_key_auth_enabled(&self) -> bool {
        !self.custom_key_auth.is_empty()
    }

    pub fn with_cookie(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    pub fn with_timeout(mut self, seconds: i64) -> Self {
        self.session_timeout_in_seconds = seconds;
        self
    }

    pub fn with_failure_limit(mut self, limit: i64) -> Self {
        self.failure_limit = limit;
        self
    }

    pub fn with_key_auth(mut self, enabled: bool) -> Self {
        self.key_auth_enabled = enabled;
        self
    }

    pub fn with_custom_key_auth(mut self, expected: impl Into<String>) -> Self {
        self.custom_key_auth = expected.into();
        self
    }

    pub fn with_correlation_offset(mut self, offset: u32) -> Self {
        self.correlation_offset = offset;
        self
    }
}
