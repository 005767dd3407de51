//! Bridge configuration.
//!
//! Loaded from JSON (the shape a host app ships in its bundle) or from
//! environment variables:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `ABC_API_KEY` | `api_key` |
//! | `ABC_HBITS_KEY` | `hbits_key` |
//! | `ABC_TRUST_EVENT_PAYLOADS` | `trust_event_payloads` (`1`/`true`/`yes`) |
//! | `ABC_LOG` | `logging.filter` |

use std::env;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bridge::{ContextOptions, RouterOptions};
use crate::error::{Error, Result};

/// Configuration for [`AbcBridge`](crate::AbcBridge).
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeConfig {
    /// API key passed to native `init`
    pub api_key: Option<String>,
    /// Hidden-bits key passed to native `init`
    pub hbits_key: Option<String>,
    /// Build wallet/transaction objects from event payloads instead of
    /// re-querying the native layer
    pub trust_event_payloads: bool,
    /// Log output settings
    pub logging: LoggingConfig,
}

/// Log output settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence
    pub filter: Option<String>,
    /// Disable ANSI colors (log files, device consoles)
    pub plain: bool,
}

impl BridgeConfig {
    /// Parse a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let trust_event_payloads = match non_empty("ABC_TRUST_EVENT_PAYLOADS") {
            None => false,
            Some(v) => parse_flag(&v).ok_or_else(|| {
                Error::Config(format!("ABC_TRUST_EVENT_PAYLOADS: not a boolean: {:?}", v))
            })?,
        };

        Ok(Self {
            api_key: non_empty("ABC_API_KEY"),
            hbits_key: non_empty("ABC_HBITS_KEY"),
            trust_event_payloads,
            logging: LoggingConfig {
                filter: non_empty("ABC_LOG"),
                plain: false,
            },
        })
    }

    /// The configured API key, or a configuration error.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| Error::Config("no API key configured".into()))
    }

    /// Options for native `init`.
    pub fn context_options(&self) -> ContextOptions {
        ContextOptions {
            hbits_key: self.hbits_key.clone(),
        }
    }

    /// Options for the event router.
    pub fn router_options(&self) -> RouterOptions {
        RouterOptions {
            trust_event_payloads: self.trust_event_payloads,
        }
    }
}

// Keys stay out of logs.
impl fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("hbits_key", &self.hbits_key.as_ref().map(|_| "<redacted>"))
            .field("trust_event_payloads", &self.trust_event_payloads)
            .field("logging", &self.logging)
            .finish()
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_from_json() {
        let config = BridgeConfig::from_json(
            r#"{"apiKey":"k","trustEventPayloads":true,"logging":{"filter":"warn"}}"#,
        )
        .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("k"));
        assert!(config.trust_event_payloads);
        assert_eq!(config.logging.filter.as_deref(), Some("warn"));
        assert!(config.router_options().trust_event_payloads);

        assert!(BridgeConfig::from_json("{}").unwrap().api_key.is_none());
        assert!(matches!(
            BridgeConfig::from_json("[1]"),
            Err(Error::Config(_))
        ));
        assert_eq!(BridgeConfig::from_json("{").unwrap_err().code(), 22);
    }

    #[test]
    fn test_from_env_vars() {
        let config = BridgeConfig::from_lookup(lookup(&[
            ("ABC_API_KEY", "key"),
            ("ABC_HBITS_KEY", ""),
            ("ABC_TRUST_EVENT_PAYLOADS", "Yes"),
        ]))
        .unwrap();
        assert_eq!(config.require_api_key().unwrap(), "key");
        assert_eq!(config.hbits_key, None);
        assert!(config.trust_event_payloads);

        let empty = BridgeConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(empty, BridgeConfig::default());
        assert_eq!(empty.require_api_key().unwrap_err().code(), 22);

        assert!(BridgeConfig::from_lookup(lookup(&[("ABC_TRUST_EVENT_PAYLOADS", "maybe")])).is_err());
    }

    #[test]
    fn test_debug_redacts_keys() {
        let config = BridgeConfig {
            api_key: Some("secret-key".into()),
            ..BridgeConfig::default()
        };
        let shown = format!("{:?}", config);
        assert!(!shown.contains("secret-key"));
        assert!(shown.contains("redacted"));
    }
}
