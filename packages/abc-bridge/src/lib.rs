//! # ABC Bridge
//!
//! Application-side bridge to the native Airbitz Core (ABC) SDK: account
//! creation and login, credential and OTP management, an encrypted per-account
//! data store, and routing of native broadcast events to the logged-in
//! account's handlers.
//!
//! The SDK itself is opaque. The bridge talks to it through two seams, a
//! [`NativeModule`](bridge::NativeModule) that runs entry points and answers
//! through a completion, and a [`NativeEventEmitter`](bridge::NativeEventEmitter)
//! that broadcasts events.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          ABC BRIDGE MODULES                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐  ┌──────────────┐   │
//! │  │   Context   │  │   Account   │  │  DataStore  │  │ EventRouter  │   │
//! │  │             │  │             │  │             │  │              │   │
//! │  │ - Create    │  │ - Logout    │  │ - Write     │  │ - Subscribe  │   │
//! │  │ - Login     │  │ - Password  │  │ - Read      │  │ - Match name │   │
//! │  │ - Local     │  │ - PIN / OTP │  │ - Remove    │  │ - Re-query   │   │
//! │  └──────┬──────┘  └──────┬──────┘  └──────┬──────┘  └──────┬───────┘   │
//! │         │                │                │                │           │
//! │         └────────────────┴───────┬────────┘                │           │
//! │                                  ▼                         ▼           │
//! │  ┌─────────────────────────────────────┐  ┌───────────────────────────┐│
//! │  │        NativeCallAdapter            │  │     SessionRegistry       ││
//! │  │  ErrorNormalizer │ ConditionCode    │  │  context │ active account ││
//! │  └─────────────────────────────────────┘  └───────────────────────────┘│
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`bridge`] - Facades, adapter, normalizer, registry and event routing
//! - [`condition`] - The native condition-code table
//! - [`error`] - `NormalizedError` and bridge-internal errors
//! - [`config`] - Bridge configuration (JSON / environment)
//! - [`logging`] - Tracing subscriber setup
//!
//! ## Example
//!
//! ```ignore
//! use abc_bridge::{AbcBridge, BridgeConfig, CallbackSet};
//!
//! let bridge = AbcBridge::new(native, emitter.as_ref(), BridgeConfig::from_env()?);
//! bridge.ensure_context(|ctx| {
//!     let ctx = ctx?;
//!     ctx.login_with_password("alice", "pw", None, CallbackSet::new(), |account| {
//!         // ...
//!     });
//! });
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod bridge;
pub mod condition;
pub mod config;
pub mod error;
pub mod logging;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use bridge::{
    resolve, Account, CallResult, CallbackSet, Context, ContextOptions, DataStore,
    ErrorNormalizer, EventRouter, NativeEventEmitter, NativeModule, SessionRegistry, Transaction,
    Wallet,
};
pub use condition::{ConditionCode, ConditionFamily};
pub use config::{BridgeConfig, LoggingConfig};
pub use error::{Error, NormalizedError, Result};

// ============================================================================
// BRIDGE INSTANCE
// ============================================================================

use once_cell::sync::OnceCell;
use std::sync::Arc;

use bridge::NativeCallAdapter;

/// Process-wide bridge, for hosts that want one.
static BRIDGE_INSTANCE: OnceCell<Arc<AbcBridge>> = OnceCell::new();

/// The wired-up bridge.
///
/// ## Lifecycle
///
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                         ABC BRIDGE LIFECYCLE                            │
/// ├─────────────────────────────────────────────────────────────────────────┤
/// │                                                                         │
/// │  1. AbcBridge::new ──► wire adapter + registry ──► router subscribes    │
/// │                                                                         │
/// │  2. ensure_context ──► native init (once) ──► Context                   │
/// │                                                                         │
/// │  3. login / create ──► Account becomes active ──► events routed to it   │
/// │                                                                         │
/// │  4. logout ──► active slot cleared ──► events dropped                   │
/// │                                                                         │
/// │  The Context and the event subscription live until process exit.       │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub struct AbcBridge {
    config: BridgeConfig,
    registry: Arc<SessionRegistry>,
    router: Arc<EventRouter>,
}

impl AbcBridge {
    /// Wire the bridge to a native module and subscribe to its events.
    pub fn new(
        native: Arc<dyn NativeModule>,
        emitter: &dyn NativeEventEmitter,
        config: BridgeConfig,
    ) -> Self {
        let adapter = NativeCallAdapter::new(native);
        let registry = SessionRegistry::new(adapter);
        let router = EventRouter::new(registry.clone(), config.router_options());
        router.subscribe(emitter);
        tracing::debug!(config = ?config, "abc bridge created");

        Self {
            config,
            registry,
            router,
        }
    }

    /// Make `bridge` the process-wide instance.
    ///
    /// If one is already installed it is returned and `bridge` is dropped.
    pub fn install(bridge: AbcBridge) -> Arc<AbcBridge> {
        let candidate = Arc::new(bridge);
        let installed = BRIDGE_INSTANCE.get_or_init(|| candidate.clone());
        if !Arc::ptr_eq(installed, &candidate) {
            tracing::debug!("abc bridge already installed");
        }
        installed.clone()
    }

    /// The process-wide instance, if installed.
    pub fn instance() -> Option<Arc<AbcBridge>> {
        BRIDGE_INSTANCE.get().cloned()
    }

    /// Obtain the Context using the configured keys.
    pub fn ensure_context<F>(&self, done: F)
    where
        F: FnOnce(CallResult<Arc<Context>>) + Send + 'static,
    {
        let api_key = match self.config.require_api_key() {
            Ok(key) => key.to_string(),
            Err(e) => return done(Err(e.into())),
        };
        self.registry
            .ensure_context(&api_key, &self.config.context_options(), done);
    }

    /// Obtain the Context with explicit keys.
    pub fn ensure_context_with<F>(&self, api_key: &str, options: &ContextOptions, done: F)
    where
        F: FnOnce(CallResult<Arc<Context>>) + Send + 'static,
    {
        self.registry.ensure_context(api_key, options, done);
    }

    /// The Account events are routed to.
    pub fn active_account(&self) -> Option<Arc<Account>> {
        self.registry.active_account()
    }

    /// The session registry.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// The event router.
    pub fn router(&self) -> &Arc<EventRouter> {
        &self.router
    }

    /// The configuration this bridge was built with.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }
}

// ============================================================================
// VERSION INFO
// ============================================================================

/// Returns the version of the bridge
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Returns build information for debugging
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        target: if cfg!(target_os = "ios") {
            "ios"
        } else if cfg!(target_os = "android") {
            "android"
        } else {
            "host"
        },
        profile: if cfg!(debug_assertions) {
            "debug"
        } else {
            "release"
        },
        callback_set_version: bridge::CALLBACK_SET_VERSION,
    }
}

/// Build information for debugging
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Crate version
    pub version: &'static str,
    /// Mobile target the bridge was built for, or `"host"` for tests and tools
    pub target: &'static str,
    /// Build profile (debug/release)
    pub profile: &'static str,
    /// Callback-set shape version
    pub callback_set_version: u32,
}

// ============================================================================
// TESTS
// ============================================================================
