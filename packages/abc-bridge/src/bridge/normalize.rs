//! # Error Normalizer
//!
//! The single translation boundary between the native layer's error shapes
//! and [`NormalizedError`]. Nothing else in the crate looks at raw payloads.
//!
//! Shapes seen across the native contract's revisions:
//!
//! - two-argument legacy rejection: string code + string message, the code
//!   usually prefixed with the error domain (`EABCERRORDOMAIN18`)
//! - a single JSON-encoded error string (`'{"code":..,"message":..}'`)
//! - a structured error as the first completion argument, or nested under a
//!   named `error` field of that argument

use serde_json::{Map, Value};
use tracing::warn;

use crate::condition::ConditionCode;
use crate::error::{NormalizedError, AUX_RAW_CODE};

/// Error-domain decoration the native layer puts in front of codes.
pub const ERROR_DOMAIN_PREFIX: &str = "EABCERRORDOMAIN";

/// Field name used by envelope-shaped replies.
const ERROR_FIELD: &str = "error";

/// Raw error payload as delivered by the native layer.
#[derive(Debug, Clone, PartialEq)]
pub enum RawError {
    /// Nothing in the error slot
    Absent,
    /// Separate code and message strings
    Legacy {
        /// Code, possibly domain-prefixed
        code: String,
        /// Message
        message: String,
    },
    /// JSON-encoded error object
    Encoded(String),
    /// Already-structured value (error object or envelope)
    Structured(Value),
}

impl From<Value> for RawError {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => RawError::Absent,
            Value::String(s) => RawError::Encoded(s),
            other => RawError::Structured(other),
        }
    }
}

impl From<Option<Value>> for RawError {
    fn from(value: Option<Value>) -> Self {
        value.map(RawError::from).unwrap_or(RawError::Absent)
    }
}

/// Converts raw native error payloads into [`NormalizedError`].
pub struct ErrorNormalizer;

impl ErrorNormalizer {
    /// Normalize one raw payload. `None` means success.
    ///
    /// Never panics and never returns a "no error" for a payload it could not
    /// understand: unparseable input becomes a synthetic
    /// [`ConditionCode::ParseError`].
    pub fn normalize(raw: impl Into<RawError>) -> Option<NormalizedError> {
        let result = normalize_raw(raw.into());
        if let Some(err) = &result {
            warn!(code = err.code, message = %err.message, "native call reported an error");
        }
        result
    }
}

fn normalize_raw(raw: RawError) -> Option<NormalizedError> {
    match raw {
        RawError::Absent => None,
        RawError::Legacy { code, message } => {
            let mut fields = Map::new();
            fields.insert("code".into(), Value::String(code));
            fields.insert("message".into(), Value::String(message));
            from_fields(fields)
        }
        RawError::Encoded(text) => match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(fields)) => from_object(fields),
            Ok(other) => Some(NormalizedError::parse_failure(
                &text,
                format!("expected an object, got {}", json_kind(&other)),
            )),
            Err(e) => Some(NormalizedError::parse_failure(&text, e)),
        },
        RawError::Structured(Value::Object(fields)) => from_object(fields),
        RawError::Structured(other) => {
            let text = other.to_string();
            Some(NormalizedError::parse_failure(
                &text,
                format!("expected an object, got {}", json_kind(&other)),
            ))
        }
    }
}

/// Unwrap `{ "error": ... }` envelopes, then read the error fields.
fn from_object(mut fields: Map<String, Value>) -> Option<NormalizedError> {
    let is_envelope = !fields.contains_key("code") && !fields.contains_key("message");
    if is_envelope {
        if let Some(inner) = fields.remove(ERROR_FIELD) {
            return normalize_raw(RawError::from(inner));
        }
    }
    from_fields(fields)
}

fn from_fields(mut fields: Map<String, Value>) -> Option<NormalizedError> {
    let message = match fields.remove("message") {
        Some(Value::String(s)) => s,
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    let (code, raw_code) = match fields.remove("code") {
        None | Some(Value::Null) => (ConditionCode::Ok.code(), None),
        Some(Value::Number(n)) => match n.as_i64().and_then(|v| i32::try_from(v).ok()) {
            Some(v) => (v, None),
            None => (ConditionCode::Error.code(), Some(n.to_string())),
        },
        Some(Value::String(s)) => match resolve_code(&s) {
            Some(v) => (v, None),
            None => (ConditionCode::Error.code(), Some(s)),
        },
        Some(other) => (ConditionCode::Error.code(), Some(other.to_string())),
    };

    // An ok code with nothing to say is the native success sentinel.
    if code == ConditionCode::Ok.code() {
        if message.is_empty() && raw_code.is_none() {
            return None;
        }
        let mut err = NormalizedError::from_condition(ConditionCode::Error, message);
        err.aux = fields;
        return Some(err);
    }

    let mut err = NormalizedError::new(code, message);
    err.aux = fields;
    if let Some(raw) = raw_code {
        err.aux.insert(AUX_RAW_CODE.into(), Value::String(raw));
    }
    Some(err)
}

/// Strip the domain prefix and resolve a numeric or symbolic code.
fn resolve_code(code: &str) -> Option<i32> {
    let trimmed = code.trim();
    let bare = trimmed.strip_prefix(ERROR_DOMAIN_PREFIX).unwrap_or(trimmed);
    if bare.is_empty() {
        return Some(ConditionCode::Ok.code());
    }
    bare.parse::<i32>()
        .ok()
        .or_else(|| ConditionCode::from_name(bare).map(|c| c.code()))
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ============================================================================
// TESTS
// ============================================================================
