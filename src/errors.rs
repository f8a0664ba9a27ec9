//! Context Synchronization Error Hierarchy
//!
//! Defines error types for the state-synchronization engine, categorized by
//! operational concern: connectivity, remote API calls and engine lifecycle.
//!
//! Connectivity problems and permission denials are state, not errors — only
//! explicit mutating calls surface an `Err` to the caller.

use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Endpoint reachability and watch-stream failures
    #[error(transparent)]
    Connectivity(#[from] ConnectivityError),

    /// Remote API call failures
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Engine lifecycle and internal dispatch failures
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Settings loading/validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Unrecoverable failures requiring engine disposal
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectivityError {
    /// Health probe did not complete in time
    #[error("Probe timed out after {duration:?}")]
    ProbeTimeout { duration: Duration },

    /// Endpoint unreachable with source context
    #[error("Endpoint unreachable: {0}")]
    Unreachable(String),

    /// Watch stream ended or errored post-connection
    #[error("Watch stream failed: {0}")]
    StreamClosed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 404-style response for a whole resource kind.
    /// Treated as a normal empty-result condition by the watch cache.
    #[error("Resource kind not found: {kind}")]
    KindNotFound { kind: String },

    /// Single object lookup miss
    #[error("Object not found: {kind}/{name}")]
    ObjectNotFound { kind: String, name: String },

    /// Rejection carrying a machine-readable status body.
    /// Routed to the engine's status hook, never surfaced to callers.
    #[error("Request rejected with status: {0:?}")]
    Status(StatusPayload),

    /// Anything else the remote API returned
    #[error("API request failed: {0}")]
    Request(String),
}

/// Machine-readable status body extracted from a rejected API call.
///
/// Extraction is best-effort: a body that does not parse into this shape
/// stays the original error and is re-thrown unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusPayload {
    pub code: Option<u16>,
    pub reason: Option<String>,
    pub message: Option<String>,
    #[serde(default)]
    pub details: serde_json::Value,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Event channel to the coordinator loop is gone
    #[error("{0}")]
    SignalSendFailed(String),

    /// Operation on an engine whose loop has been shut down
    #[error("Engine already disposed")]
    Disposed,

    /// Snapshot or capability-table validation failures
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// ============== Helpers ============== //
impl Error {
    /// True when the error is the 404-style "kind not found" condition.
    pub fn is_kind_not_found(&self) -> bool {
        matches!(self, Error::Api(ApiError::KindNotFound { .. }))
    }

    /// True when the error is a single-object "not found" miss.
    pub fn is_object_not_found(&self) -> bool {
        matches!(self, Error::Api(ApiError::ObjectNotFound { .. }))
    }
}
