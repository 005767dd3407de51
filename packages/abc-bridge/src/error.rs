//! # Error Handling
//!
//! Two error types live here:
//!
//! - [`NormalizedError`]: the single canonical error shape every application
//!   continuation receives. Only the normalizer (and the conversions below)
//!   build one.
//! - [`Error`]: bridge-internal failures (bad configuration, undecodable native
//!   values, dropped completions). They never escape to the application
//!   directly; they are converted into a `NormalizedError` first.
//!
//! ## Error Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         ERROR HANDLING FLOW                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Native SDK               Bridge                       Application      │
//! │  ──────────────────────────────────────────────────────────────────     │
//! │                                                                         │
//! │  "EABCERRORDOMAIN18"  ─┐                                                │
//! │  '{"code":..}' string ─┼─► ErrorNormalizer ─► NormalizedError ─► done() │
//! │  {code, message}      ─┘                       { code: 18, ... }        │
//! │                                                                         │
//! │  Error::Decode(..)  ──────────────────────►  NormalizedError(30, ..)    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::condition::{ConditionCode, ConditionFamily};

/// Result type alias for bridge-internal operations
pub type Result<T> = std::result::Result<T, Error>;

/// Aux key holding the original text of an unparseable payload.
pub const AUX_RAW: &str = "raw";
/// Aux key holding a code string that could not be mapped to a condition code.
pub const AUX_RAW_CODE: &str = "rawCode";

// ============================================================================
// NORMALIZED ERROR
// ============================================================================

/// Canonical `{code, message, ...}` error handed to application continuations.
///
/// `None` (the absence of a `NormalizedError`) is the only representation of
/// success; a value of this type never carries [`ConditionCode::Ok`].
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("ABC error {code}: {message}")]
pub struct NormalizedError {
    /// Integer condition code, see [`ConditionCode`]
    pub code: i32,
    /// Human-readable message from the native layer
    pub message: String,
    /// Any additional fields the native payload carried
    #[serde(flatten)]
    pub aux: Map<String, Value>,
}

impl NormalizedError {
    pub(crate) fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            aux: Map::new(),
        }
    }

    pub(crate) fn with_aux(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.aux.insert(key.to_string(), value.into());
        self
    }

    pub(crate) fn from_condition(code: ConditionCode, message: impl Into<String>) -> Self {
        Self::new(code.code(), message)
    }

    /// The synthetic error used when a native payload cannot be parsed at all.
    pub(crate) fn parse_failure(raw: &str, detail: impl std::fmt::Display) -> Self {
        Self::from_condition(
            ConditionCode::ParseError,
            format!("Malformed native error payload: {}", detail),
        )
        .with_aux(AUX_RAW, raw)
    }

    /// Condition code, if the integer is a known one.
    pub fn condition(&self) -> Option<ConditionCode> {
        ConditionCode::from_code(self.code)
    }

    /// Whether this error carries the given condition code.
    pub fn is(&self, code: ConditionCode) -> bool {
        self.code == code.code()
    }

    /// Family of the condition code; unknown codes count as `General`.
    pub fn family(&self) -> ConditionFamily {
        self.condition()
            .map(|c| c.family())
            .unwrap_or(ConditionFamily::General)
    }

    /// Whether retrying later (or after reconnecting) may succeed.
    pub fn is_recoverable(&self) -> bool {
        self.family() == ConditionFamily::Network || self.is(ConditionCode::Synchronizing)
    }

    /// OTP reset token attached to failed logins of OTP-protected accounts.
    pub fn otp_reset_token(&self) -> Option<&str> {
        self.aux.get("otpResetToken").and_then(Value::as_str)
    }

    /// Date after which a pending OTP reset completes.
    ///
    /// The native layer sends either an RFC 3339 string or epoch seconds.
    pub fn otp_reset_date(&self) -> Option<DateTime<Utc>> {
        match self.aux.get("otpResetDate")? {
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|d| d.with_timezone(&Utc)),
            Value::Number(n) => n
                .as_i64()
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
            _ => None,
        }
    }
}

impl From<Error> for NormalizedError {
    fn from(err: Error) -> Self {
        NormalizedError::new(err.code(), err.to_string())
    }
}

// ============================================================================
// BRIDGE ERRORS
// ============================================================================

/// Bridge-internal error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration missing or invalid
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A native success value did not have the expected shape
    #[error("Unexpected native value for {method}: {reason}")]
    Decode {
        /// Native entry point that produced the value
        method: String,
        /// What went wrong
        reason: String,
    },

    /// The native layer dropped a completion without calling it
    #[error("Native call {0} was dropped without completing")]
    CompletionDropped(String),

    /// A native event payload lacked the identifying field
    #[error("Event {event} is missing field {field}")]
    MalformedEvent {
        /// Native event name
        event: String,
        /// Missing field
        field: &'static str,
    },

    /// The logging subscriber could not be installed
    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl Error {
    /// Condition code reported to the application for this error.
    pub fn code(&self) -> i32 {
        match self {
            Error::Config(_) => ConditionCode::NotInitialized.code(),
            Error::Decode { .. } => ConditionCode::ParseError.code(),
            Error::CompletionDropped(_) => ConditionCode::Error.code(),
            Error::MalformedEvent { .. } => ConditionCode::ParseError.code(),
            Error::Logging(_) => ConditionCode::SysError.code(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
