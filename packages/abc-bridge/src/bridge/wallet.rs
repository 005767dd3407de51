//! Value types returned by account queries and carried by events.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A wallet as reported by the native layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    /// Wallet identifier
    pub uuid: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Whether the wallet is archived
    #[serde(default)]
    pub archived: bool,
    /// Everything else the native layer reported (balance, currency, ...)
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Wallet {
    /// Build a wallet from an event payload, if it carries one.
    ///
    /// Accepts either a nested `wallet` object or the wallet fields inline
    /// next to `uuid`; a bare `{uuid}` is not enough.
    pub(crate) fn from_event_payload(payload: &Value) -> Option<Wallet> {
        if let Some(nested) = payload.get("wallet").filter(|w| w.is_object()) {
            return serde_json::from_value(nested.clone()).ok();
        }
        let obj = payload.as_object()?;
        let has_details = obj
            .keys()
            .any(|k| !matches!(k.as_str(), "uuid" | "txid" | "transaction"));
        if !has_details {
            return None;
        }
        let mut fields = obj.clone();
        fields.remove("txid");
        fields.remove("transaction");
        serde_json::from_value(Value::Object(fields)).ok()
    }
}

/// A wallet transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction id
    pub txid: String,
    /// Amount, timestamps, metadata ...
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Transaction {
    pub(crate) fn from_event_payload(payload: &Value) -> Option<Transaction> {
        payload
            .get("transaction")
            .filter(|t| t.is_object())
            .and_then(|t| serde_json::from_value(t.clone()).ok())
    }
}

/// BitID signature over a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitIdSignature {
    /// Address the signature verifies against
    pub address: String,
    /// Base64 signature
    pub signature: String,
}

/// OTP (two-factor) settings of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OtpDetails {
    /// Whether OTP is required to log in
    pub enabled: bool,
    /// Reset timeout in seconds
    #[serde(default)]
    pub timeout: i64,
}
