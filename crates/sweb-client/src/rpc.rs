//! JSON-RPC envelope
//!
//! Request:
//!
//! ```json
//! {"jsonrpc": "2.0", "version": "<scraped>", "id": "<derived>", "user": "<login>", "method": "...", "params": {}}
//! ```
//!
//! `user` is left out entirely while the login is unknown, and `params` is
//! always a mapping.
//!
//! Response: either `{"result": ...}` or `{"error": {"code", "message", "data"?}}`.
//! A response with neither member is rejected.

use chrono::{Datelike, NaiveDateTime, Timelike};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sweb_core::{Error, Result};

/// Length of the random part of a request id
const REQUEST_ID_SUFFIX_LEN: usize = 10;

/// JSON-RPC request envelope
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest {
    /// Always "2.0"
    pub jsonrpc: &'static str,
    /// API version scraped at login
    pub version: String,
    /// Request id
    pub id: String,
    /// Panel login, omitted when empty
    #[serde(skip_serializing_if = "String::is_empty")]
    pub user: String,
    /// Method name
    pub method: String,
    /// Parameters
    pub params: Map<String, Value>,
}

impl RpcRequest {
    /// Build an envelope
    pub fn new(
        version: impl Into<String>,
        id: impl Into<String>,
        user: impl Into<String>,
        method: impl Into<String>,
        params: Map<String, Value>,
    ) -> Self {
        Self {
            jsonrpc: "2.0",
            version: version.into(),
            id: id.into(),
            user: user.into(),
            method: method.into(),
            params,
        }
    }
}

/// Turn caller-supplied params into the mapping the panel expects
///
/// `null` and `[]` become `{}`; the panel's own scripts send `[]` in a few
/// places but this client always sends a mapping.
pub fn normalize_params(params: Value) -> Result<Map<String, Value>> {
    match params {
        Value::Null => Ok(Map::new()),
        Value::Array(items) if items.is_empty() => Ok(Map::new()),
        Value::Object(map) => Ok(map),
        other => Err(Error::invalid_input(format!(
            "JSON-RPC params must be a mapping, got: {}",
            other
        ))),
    }
}

/// `error` member of a response
#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorObject {
    /// Numeric error code
    pub code: i64,
    /// Human-readable message
    #[serde(default)]
    pub message: String,
    /// Optional payload
    #[serde(default)]
    pub data: Option<Value>,
}

/// JSON-RPC response
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    /// Call result; its shape depends on the method. `Some(Value::Null)` when
    /// the panel sent an explicit `null`.
    #[serde(default, deserialize_with = "present")]
    pub result: Option<Value>,
    /// Error, if the call failed
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

impl RpcResponse {
    /// Parse a response body
    pub fn from_body(body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| {
            Error::unexpected(format!(
                "Invalid JSON-RPC response ({}): {}",
                e,
                truncate(body, 200)
            ))
        })
    }

    /// Turn the response into the call result, or the structured RPC error
    pub fn into_result(self) -> Result<Value> {
        match (self.error, self.result) {
            (Some(err), _) => Err(Error::rpc(err.code, err.message, err.data)),
            (None, Some(result)) => Ok(result),
            (None, None) => Err(Error::unexpected(
                "JSON-RPC response carries neither result nor error",
            )),
        }
    }
}

// Keeps an explicit `null` apart from a missing member
fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Generate a request id the way the panel's web UI does
///
/// The format is `{year}{month0}{day}{hour}{minute}{second}.{10 random alphanumerics}`
/// with no zero padding. The month is zero-based (January is `0`), as in the
/// panel's scripts; the panel expects ids shaped like its own.
pub fn generate_request_id<R: Rng>(timestamp: &NaiveDateTime, rng: &mut R) -> String {
    format!(
        "{}{}{}{}{}{}.{}",
        timestamp.year(),
        timestamp.month0(),
        timestamp.day(),
        timestamp.hour(),
        timestamp.minute(),
        timestamp.second(),
        random_suffix(rng, REQUEST_ID_SUFFIX_LEN)
    )
}

/// Random string over `[A-Za-z0-9]`
pub fn random_suffix<R: Rng>(rng: &mut R, len: usize) -> String {
    (0..len).map(|_| rng.sample(Alphanumeric) as char).collect()
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
