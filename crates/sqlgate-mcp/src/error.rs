//! Error types for the MCP crate.
//!
//! Transport-layer failures short-circuit with an HTTP status and a JSON
//! body; execution-layer failures (permission, SQL, unknown table) are
//! reported back to the caller as tool results with `isError: true`.

use axum::http::StatusCode;
use sqlgate_adapter_pg::AdapterError;
use sqlgate_core::CoreError;
use thiserror::Error;

/// Errors that can occur in the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No secret is configured but an authenticated path was hit.
    #[error("server secret is not configured")]
    SecretNotConfigured,

    /// Wrong or absent secret.
    #[error("invalid or missing secret")]
    Unauthorized,

    /// No database target could be resolved for the request.
    #[error("no database target: pass ?db=, or configure a default")]
    NoTarget,

    /// The permissions parameter did not parse.
    #[error("invalid permissions parameter: {0}")]
    InvalidGrant(CoreError),

    /// A supplied session id is not open.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// No session id was supplied and no sessions are open.
    #[error("no open sessions")]
    NoSessions,

    /// Unknown tool name.
    #[error("unknown tool: {0}")]
    ToolNotFound(String),

    /// A required tool argument was missing or mistyped.
    #[error("missing required argument '{0}'")]
    MissingArgument(&'static str),

    /// Pool routing, execution or introspection failure.
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GatewayError {
    /// HTTP status for transport-layer failures.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::SecretNotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayError::NoTarget | GatewayError::InvalidGrant(_) => StatusCode::BAD_REQUEST,
            GatewayError::SessionNotFound(_) | GatewayError::NoSessions => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
