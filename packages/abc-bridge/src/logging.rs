//! Tracing subscriber setup for host apps that don't install their own.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

/// Filter used when neither `RUST_LOG` nor the config sets one.
#[cfg(not(feature = "verbose-logging"))]
pub const DEFAULT_FILTER: &str = "info,abc_bridge=debug";
/// Filter used when neither `RUST_LOG` nor the config sets one.
#[cfg(feature = "verbose-logging")]
pub const DEFAULT_FILTER: &str = "debug,abc_bridge=trace";

/// Build the filter: `RUST_LOG` first, then the configured directive, then
/// [`DEFAULT_FILTER`].
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directive = config.filter.as_deref().unwrap_or(DEFAULT_FILTER);
    EnvFilter::try_new(directive).map_err(|e| Error::Logging(format!("{}: {}", directive, e)))
}

/// Install a global fmt subscriber.
///
/// Returns `Ok(false)` if a subscriber was already installed; calling this
/// more than once is harmless.
pub fn init_logging(config: &LoggingConfig) -> Result<bool> {
    let filter = env_filter(config)?;
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(!config.plain)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("abc-bridge v{} logging initialized", crate::version());
    }
    Ok(installed)
}
