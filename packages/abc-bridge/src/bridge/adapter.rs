//! # Native Call Adapter
//!
//! Wraps every native entry point as a single-result-or-error continuation.
//! Whatever error convention the entry point uses, the continuation sees a
//! `Result<_, NormalizedError>`; decoding of success values happens here too
//! so facades never touch raw `serde_json::Value`s.
//!
//! Returns `Ok(values)` on success, `Err(NormalizedError)` on failure, and
//! fires the continuation exactly once per native completion.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::native::{ErrorChannel, NativeCompletion, NativeMethod, NativeModule, NativeResponse};
use super::normalize::{ErrorNormalizer, RawError};
use crate::condition::ConditionCode;
use crate::error::{Error, NormalizedError};

/// Result delivered to a bridge continuation.
pub type CallResult<T> = std::result::Result<T, NormalizedError>;

/// Boxed continuation, the shape every public operation accepts.
pub type Completion<T> = Box<dyn FnOnce(CallResult<T>) + Send + 'static>;

/// Envelope fields that may carry the success value next to `error`.
const ENVELOPE_VALUE_FIELDS: [&str; 2] = ["response", "result"];

/// Thin proxy over the native module.
#[derive(Clone)]
pub struct NativeCallAdapter {
    native: Arc<dyn NativeModule>,
}

impl NativeCallAdapter {
    /// Wrap a native module.
    pub fn new(native: Arc<dyn NativeModule>) -> Self {
        Self { native }
    }

    /// Call `method` and hand the raw success values to `done`.
    ///
    /// Arguments are never logged; several entry points take secrets.
    pub fn call<F>(&self, method: NativeMethod, args: Vec<Value>, done: F)
    where
        F: FnOnce(CallResult<Vec<Value>>) + Send + 'static,
    {
        debug!(method = %method, argc = args.len(), "native call");
        let reply: NativeCompletion = Box::new(move |response| {
            let result = interpret(method, response);
            debug!(method = %method, ok = result.is_ok(), "native call completed");
            done(result)
        });
        self.native.call(method.as_str(), args, reply);
    }

    /// Call `method` for its side effect only.
    pub fn call_unit<F>(&self, method: NativeMethod, args: Vec<Value>, done: F)
    where
        F: FnOnce(CallResult<()>) + Send + 'static,
    {
        self.call(method, args, move |result| done(result.map(|_| ())));
    }

    /// Call `method` and decode its first success value as `T`.
    pub fn call_value<T, F>(&self, method: NativeMethod, args: Vec<Value>, done: F)
    where
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(CallResult<T>) + Send + 'static,
    {
        self.call(method, args, move |result| {
            done(result.and_then(|values| decode(method, first(values))))
        });
    }
}

/// Apply the normalizer to whichever error channel `method` uses.
fn interpret(method: NativeMethod, response: NativeResponse) -> CallResult<Vec<Value>> {
    match response {
        NativeResponse::Rejected { code, message } => {
            // A rejection is a failure even if its code reads as Ok.
            let err = ErrorNormalizer::normalize(RawError::Legacy { code, message })
                .unwrap_or_else(|| {
                    NormalizedError::from_condition(
                        ConditionCode::Error,
                        format!("{} was rejected without an error code", method),
                    )
                });
            Err(err)
        }
        NativeResponse::Resolved(values) => Ok(values),
        NativeResponse::Args(args) => match method.error_channel() {
            ErrorChannel::None => Ok(args),
            ErrorChannel::Positional => {
                let mut args = args.into_iter();
                let slot = args.next().unwrap_or(Value::Null);
                let mut values: Vec<Value> = args.collect();

                let slot = match slot {
                    Value::Object(mut envelope) if is_envelope(&envelope) => {
                        if values.is_empty() {
                            if let Some(v) = ENVELOPE_VALUE_FIELDS
                                .iter()
                                .find_map(|f| envelope.remove(*f))
                            {
                                values.push(v);
                            }
                        }
                        envelope.remove("error").unwrap_or(Value::Null)
                    }
                    other => other,
                };

                match ErrorNormalizer::normalize(slot) {
                    Some(err) => Err(err),
                    None => Ok(values),
                }
            }
        },
    }
}

fn is_envelope(obj: &serde_json::Map<String, Value>) -> bool {
    obj.contains_key("error") && !obj.contains_key("code") && !obj.contains_key("message")
}

fn first(values: Vec<Value>) -> Value {
    values.into_iter().next().unwrap_or(Value::Null)
}

/// Decode a native success value, accepting JSON-encoded strings.
///
/// Several entry points return their payload as a JSON string (the wallet
/// list, transaction lists); others return plain values.
pub(crate) fn decode<T: DeserializeOwned>(method: NativeMethod, value: Value) -> CallResult<T> {
    match serde_json::from_value::<T>(value.clone()) {
        Ok(v) => Ok(v),
        Err(direct) => {
            if let Value::String(text) = &value {
                if let Ok(v) = serde_json::from_str::<T>(text) {
                    return Ok(v);
                }
            }
            Err(Error::Decode {
                method: method.to_string(),
                reason: direct.to_string(),
            }
            .into())
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::testing::{capture, ScriptedNative};
    use serde_json::json;

    fn adapter(native: &Arc<ScriptedNative>) -> NativeCallAdapter {
        NativeCallAdapter::new(native.clone())
    }

    #[test]
    fn test_success_values_skip_error_slot() {
        let native = ScriptedNative::new();
        native.on("listUsernames", NativeResponse::ok(vec![json!(["alice", "bob"])]));

        let (done, result) = capture::<Vec<String>>();
        adapter(&native).call_value(NativeMethod::ListUsernames, vec![], done);

        assert_eq!(result.take().unwrap().unwrap(), vec!["alice", "bob"]);
        assert_eq!(native.calls("listUsernames"), 1);
    }

    #[test]
    fn test_json_string_values_are_decoded() {
        let native = ScriptedNative::new();
        native.on(
            "getWallets",
            NativeResponse::ok(vec![json!(r#"[{"uuid":"w1","name":"Spending"}]"#)]),
        );

        let (done, result) = capture::<Vec<Value>>();
        adapter(&native).call_value(NativeMethod::GetWallets, vec![], done);

        let wallets = result.take().unwrap().unwrap();
        assert_eq!(wallets[0]["uuid"], json!("w1"));
    }

    #[test]
    fn test_error_first_argument() {
        let native = ScriptedNative::new();
        native.on(
            "checkPassword",
            NativeResponse::Args(vec![
                json!(r#"{"code":"EABCERRORDOMAIN18","message":"bad password"}"#),
                Value::Null,
            ]),
        );

        let (done, result) = capture::<bool>();
        adapter(&native).call_value(NativeMethod::CheckPassword, vec![json!("wrong")], done);

        let err = result.take().unwrap().unwrap_err();
        assert_eq!((err.code, err.message.as_str()), (18, "bad password"));
    }

    #[test]
    fn test_envelope_error_and_value() {
        let native = ScriptedNative::new();
        native.on(
            "pinLoginEnabled",
            NativeResponse::Args(vec![json!({"error": null, "response": true})]),
        );
        let (done, result) = capture::<bool>();
        adapter(&native).call_value(NativeMethod::PinLoginEnabled, vec![json!("alice")], done);
        assert!(result.take().unwrap().unwrap());

        native.on(
            "pinLoginEnabled",
            NativeResponse::Args(vec![json!({"error": {"code": 16, "message": "no account"}})]),
        );
        let (done, result) = capture::<bool>();
        adapter(&native).call_value(NativeMethod::PinLoginEnabled, vec![json!("zed")], done);
        assert!(result
            .take()
            .unwrap()
            .unwrap_err()
            .is(ConditionCode::AccountDoesNotExist));
    }

    #[test]
    fn test_rejection_is_always_an_error() {
        let native = ScriptedNative::new();
        native.on(
            "changePIN",
            NativeResponse::Rejected {
                code: "EABCERRORDOMAIN0".into(),
                message: String::new(),
            },
        );

        let (done, result) = capture::<()>();
        adapter(&native).call_unit(NativeMethod::ChangePin, vec![json!("1234")], done);
        assert!(result.take().unwrap().unwrap_err().is(ConditionCode::Error));
    }

    #[test]
    fn test_legacy_success_continuation() {
        let native = ScriptedNative::new();
        native.on(
            "getWallets",
            NativeResponse::Resolved(vec![json!([{"uuid": "w1", "name": "Spending"}])]),
        );

        let (done, result) = capture::<Vec<Value>>();
        adapter(&native).call_value(NativeMethod::GetWallets, vec![], done);
        assert_eq!(result.take().unwrap().unwrap()[0]["name"], json!("Spending"));

        native.on("changePIN", NativeResponse::Resolved(vec![]));
        let (done, result) = capture::<()>();
        adapter(&native).call_unit(NativeMethod::ChangePin, vec![json!("1234")], done);
        assert!(result.take().unwrap().is_ok());
    }

    #[test]
    fn test_no_error_channel_passes_everything_through() {
        let native = ScriptedNative::new();
        native.on("logout", NativeResponse::Args(vec![json!("bye")]));

        let (done, result) = capture::<Vec<Value>>();
        adapter(&native).call(NativeMethod::Logout, vec![], done);
        assert_eq!(result.take().unwrap().unwrap(), vec![json!("bye")]);
    }

    #[test]
    fn test_undecodable_value_is_parse_error() {
        let native = ScriptedNative::new();
        native.on("accountHasPassword", NativeResponse::ok(vec![json!("not a bool")]));

        let (done, result) = capture::<bool>();
        adapter(&native).call_value(NativeMethod::AccountHasPassword, vec![json!("a")], done);
        assert!(result.take().unwrap().unwrap_err().is(ConditionCode::ParseError));
    }
}
