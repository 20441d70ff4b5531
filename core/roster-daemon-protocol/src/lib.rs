//! IPC protocol types and validation for roster-daemon.
//!
//! Shared by the daemon and its clients to prevent schema drift. The
//! daemon remains the authority on validation, but clients can reuse the
//! same types to construct valid requests.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_REQUEST_BYTES: usize = 1024 * 1024; // 1MB

/// Long-poll waits are capped so a client cannot park a connection thread
/// indefinitely.
pub const MAX_WAIT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 25_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum Method {
    GetHealth,
    GetSessions,
    TogglePin,
    DeleteSession,
    WaitForChange,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Request {
    pub protocol_version: u32,
    pub method: Method,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl Response {
    pub fn ok(id: Option<String>, data: Value) -> Self {
        Self {
            ok: true,
            id,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(id: Option<String>, code: &str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            id,
            data: None,
            error: Some(ErrorInfo::new(code, message)),
        }
    }

    pub fn error_with_info(id: Option<String>, error: ErrorInfo) -> Self {
        Self {
            ok: false,
            id,
            data: None,
            error: Some(error),
        }
    }
}

/// Params for `get_sessions`. Omitted params mean "the default listing".
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionQuery {
    /// Include archived sessions.
    #[serde(default)]
    pub all: bool,
    /// Free-text filter over summary, project name, and cwd.
    #[serde(default)]
    pub search: Option<String>,
}

/// Params for `toggle_pin` and `delete_session`.
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionTarget {
    pub session_id: String,
}

/// Params for `wait_for_change`.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WaitParams {
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

pub fn parse_session_query(params: Option<Value>) -> Result<SessionQuery, ErrorInfo> {
    match params {
        None => Ok(SessionQuery::default()),
        Some(params) => serde_json::from_value(params).map_err(|err| {
            ErrorInfo::new("invalid_params", format!("query params invalid: {}", err))
        }),
    }
}

pub fn parse_session_target(params: Option<Value>) -> Result<SessionTarget, ErrorInfo> {
    let params = params.ok_or_else(|| ErrorInfo::new("invalid_params", "session_id is required"))?;
    let target: SessionTarget = serde_json::from_value(params).map_err(|err| {
        ErrorInfo::new("invalid_params", format!("target params invalid: {}", err))
    })?;

    if target.session_id.trim().is_empty() {
        return Err(ErrorInfo::new("invalid_session_id", "session_id is required"));
    }
    if target.session_id.len() > 128 {
        return Err(ErrorInfo::new(
            "invalid_session_id",
            "session_id must be 128 characters or fewer",
        ));
    }

    Ok(target)
}

/// Resolves the effective wait timeout, clamped to [`MAX_WAIT_TIMEOUT_MS`].
pub fn parse_wait_timeout_ms(params: Option<Value>) -> Result<u64, ErrorInfo> {
    let wait: WaitParams = match params {
        None => WaitParams::default(),
        Some(params) => serde_json::from_value(params).map_err(|err| {
            ErrorInfo::new("invalid_params", format!("wait params invalid: {}", err))
        })?,
    };
    Ok(wait
        .timeout_ms
        .unwrap_or(DEFAULT_WAIT_TIMEOUT_MS)
        .min(MAX_WAIT_TIMEOUT_MS))
}
