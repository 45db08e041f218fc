//! # a3s-session
//!
//! Cookie-correlated session store and request/response filter pair for
//! A3S proxy plugins.
//!
//! ## Overview
//!
//! The host proxy calls the filter twice per exchange: once before the
//! request is forwarded and once when the upstream response comes back.
//! `a3s-session` recognizes returning clients by a session cookie, creates
//! sessions for new ones, ties the response phase back to the session the
//! request phase resolved, expires sessions after a timeout, and resets a
//! session after too many failing responses.
//!
//! ## Quick Start
//!
//! ```rust
//! use a3s_session::{HostFilter, SessionFilterPipeline};
//!
//! # fn example() -> a3s_session::Result<()> {
//! let pipeline = SessionFilterPipeline::new();
//! let config = pipeline.parse_conf(br#"{
//!     "cookie": "sid",
//!     "sessionTimeoutInSeconds": 600,
//!     "failureLimit": 3
//! }"#)?;
//! assert_eq!(config.cookie_name, "sid");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **SessionStore** — sessions indexed by id and by request-phase id
//! - **ExpiryScheduler** — one-shot removal timers
//! - **FailureTracker** — status histogram and failure budget
//! - **Correlator** — maps a response-phase id to its request-phase id
//! - **CredentialStrategy** — key relay and key verification modes
//! - **SessionFilterPipeline** — the `HostFilter` tying it together

pub mod config;
pub mod cookie;
pub mod correlation;
pub mod credential;
pub mod error;
pub mod failure;
pub mod filter;
pub mod pipeline;
pub mod scheduler;
pub mod store;
pub mod types;

// Re-export core types
pub use config::SessionConfig;
pub use correlation::{request_id_for_response, Correlator, OffsetCorrelator};
pub use credential::{
    strategies_for, CredentialStrategy, CredentialVerdict, KeyRelay, KeyVerification,
    API_KEY_HEADER,
};
pub use error::{Result, SessionError};
pub use failure::FailureTracker;
pub use filter::{FilterRequest, FilterResponse, HostFilter, ResponseWriter};
pub use pipeline::{SessionFilterPipeline, PLUGIN_NAME};
pub use scheduler::ExpiryScheduler;
pub use store::{SessionStore, StoreStats};
pub use types::{
    RemovalReason, RequestOutcome, ResponseOutcome, Session, SessionAttrs, SessionSnapshot,
    StatusHistogram,
};
