//! # Session Registry
//!
//! Holds the two pieces of process-wide bridge state:
//!
//! - the context slot, filled once by a successful (or already-done) native
//!   `init` and never cleared afterwards
//! - the active-account slot, the only Account native events are routed to
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         CONTEXT SLOT STATES                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   Empty ──ensure_context──► Pending(waiters) ──init ok──► Ready(ctx)    │
//! │     ▲                              │            or Reinitialization     │
//! │     └──────── init failed ◄────────┘                                    │
//! │                                                                         │
//! │   Ready: every ensure_context gets the same Context, no native call.    │
//! │   Pending: callers join the waiter list, no second native init.         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use super::account::Account;
use super::adapter::{CallResult, Completion, NativeCallAdapter};
use super::context::Context;
use super::native::NativeMethod;
use crate::condition::ConditionCode;

/// Optional arguments to native context initialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextOptions {
    /// Hidden-bits key passed through to `init`
    #[serde(default)]
    pub hbits_key: Option<String>,
}

enum ContextSlot {
    Empty,
    Pending(Vec<Completion<Arc<Context>>>),
    Ready(Arc<Context>),
}

/// Process-wide context and active-account state.
pub struct SessionRegistry {
    adapter: NativeCallAdapter,
    context: Mutex<ContextSlot>,
    active: RwLock<Option<Arc<Account>>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new(adapter: NativeCallAdapter) -> Arc<Self> {
        Arc::new(Self {
            adapter,
            context: Mutex::new(ContextSlot::Empty),
            active: RwLock::new(None),
        })
    }

    /// Hand `done` the process-wide Context, initializing the native layer
    /// on first use.
    ///
    /// Concurrent callers share one native `init`. A native report that the
    /// layer is already initialized counts as success.
    pub fn ensure_context<F>(self: &Arc<Self>, api_key: &str, options: &ContextOptions, done: F)
    where
        F: FnOnce(CallResult<Arc<Context>>) + Send + 'static,
    {
        {
            let mut slot = self.context.lock();
            match &mut *slot {
                ContextSlot::Ready(ctx) => {
                    let ctx = ctx.clone();
                    drop(slot);
                    done(Ok(ctx));
                    return;
                }
                ContextSlot::Pending(waiters) => {
                    debug!(waiters = waiters.len() + 1, "context initialization in flight");
                    waiters.push(Box::new(done));
                    return;
                }
                ContextSlot::Empty => {
                    let waiter: Completion<Arc<Context>> = Box::new(done);
                    *slot = ContextSlot::Pending(vec![waiter]);
                }
            }
        }

        info!("initializing native context");
        let registry = self.clone();
        let hbits = options.hbits_key.clone().unwrap_or_default();
        self.adapter.call_unit(
            NativeMethod::Init,
            vec![json!(api_key), json!(hbits)],
            move |result| registry.finish_init(result),
        );
    }

    fn finish_init(self: &Arc<Self>, result: CallResult<()>) {
        let outcome = match result {
            Ok(()) => Ok(()),
            Err(e) if e.is(ConditionCode::Reinitialization) => {
                debug!("native context was already initialized");
                Ok(())
            }
            Err(e) => Err(e),
        };

        let (waiters, delivered) = {
            let mut slot = self.context.lock();
            let waiters = match std::mem::replace(&mut *slot, ContextSlot::Empty) {
                ContextSlot::Pending(waiters) => waiters,
                other => {
                    *slot = other;
                    return;
                }
            };
            let delivered = match outcome {
                Ok(()) => {
                    let ctx = Arc::new(Context::new(self.adapter.clone(), self.clone()));
                    *slot = ContextSlot::Ready(ctx.clone());
                    info!("native context ready");
                    Ok(ctx)
                }
                Err(e) => Err(e),
            };
            (waiters, delivered)
        };

        for waiter in waiters {
            waiter(delivered.clone());
        }
    }

    /// The Context, once initialized.
    pub fn context(&self) -> Option<Arc<Context>> {
        match &*self.context.lock() {
            ContextSlot::Ready(ctx) => Some(ctx.clone()),
            _ => None,
        }
    }

    /// The Account events are currently routed to.
    pub fn active_account(&self) -> Option<Arc<Account>> {
        self.active.read().clone()
    }

    /// Whether `account` is the active one.
    pub fn is_active(&self, account: &Arc<Account>) -> bool {
        self.active
            .read()
            .as_ref()
            .is_some_and(|a| Arc::ptr_eq(a, account))
    }

    /// Make `account` the active one, returning the Account it replaced.
    pub(crate) fn set_active_account(&self, account: Arc<Account>) -> Option<Arc<Account>> {
        let previous = self.active.write().replace(account);
        if let Some(prev) = &previous {
            debug!(username = %prev.username(), "replacing active account");
        }
        previous
    }

    /// Empty the active-account slot.
    pub(crate) fn clear_active_account(&self) -> Option<Arc<Account>> {
        self.active.write().take()
    }
}
