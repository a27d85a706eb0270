//! Error types for the SpaceWeb DNS client
//!
//! This module defines all error types used throughout the workspace.
//! The variants follow the failure classes the panel can produce: transport,
//! login, "never logged in", JSON-RPC errors and malformed responses.

use thiserror::Error;

/// Result type alias for SpaceWeb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the SpaceWeb DNS client
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP-layer failure, carried as-is from the transport
    #[error("HTTP transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The scraped login sequence did not reach an authenticated session
    #[error("Failed to log in: {0}")]
    LoginFailed(String),

    /// An RPC call was attempted before a successful login
    #[error("Missing JSON-RPC API version (not logged in)")]
    NotAuthenticated,

    /// The panel answered with a JSON-RPC `error` object
    #[error("JSON-RPC error {code}: {message}")]
    Rpc {
        /// Numeric error code
        code: i64,
        /// Human-readable message
        message: String,
        /// Optional opaque payload
        data: Option<serde_json::Value>,
    },

    /// The panel answered with something this client does not understand
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wrap a transport error
    pub fn transport(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Transport(err.into())
    }

    /// Create a login failure
    pub fn login_failed(msg: impl Into<String>) -> Self {
        Self::LoginFailed(msg.into())
    }

    /// Create an RPC error
    pub fn rpc(code: i64, message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self::Rpc {
            code,
            message: message.into(),
            data,
        }
    }

    /// Create an unexpected-response error
    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::UnexpectedResponse(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// JSON-RPC error code, if this is an RPC error
    ///
    /// Callers branch on known codes (e.g. "repeat the call" for certificate
    /// installation); the client itself never retries.
    pub fn rpc_code(&self) -> Option<i64> {
        match self {
            Self::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
