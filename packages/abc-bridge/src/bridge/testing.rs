//! Scripted native doubles for unit tests.
//!
//! [`ScriptedNative`] records every call and answers from a per-method queue
//! of scripted replies; [`RecordingEmitter`] keeps registered listeners so a
//! test can fire native events by name.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use serde_json::Value;

use super::account::Account;
use super::adapter::CallResult;
use super::callbacks::CallbackSet;
use super::context::Context;
use super::native::{
    NativeCompletion, NativeEventEmitter, NativeEventHandler, NativeModule, NativeResponse,
};
use super::wallet::{Transaction, Wallet};
use crate::{AbcBridge, BridgeConfig};

enum Script {
    Reply(NativeResponse),
    Hold,
    Drop,
}

/// Native module double.
///
/// Unscripted calls succeed with no values.
#[derive(Default)]
pub struct ScriptedNative {
    calls: Mutex<Vec<(String, Vec<Value>)>>,
    scripts: Mutex<HashMap<String, VecDeque<Script>>>,
    held: Mutex<Vec<(String, NativeCompletion)>>,
}

impl ScriptedNative {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, method: &str, script: Script) {
        self.scripts
            .lock()
            .entry(method.to_string())
            .or_default()
            .push_back(script);
    }

    /// Queue the reply for the next call to `method`.
    pub fn on(&self, method: &str, response: NativeResponse) {
        self.push(method, Script::Reply(response));
    }

    /// Hold the next call to `method` until [`release`](Self::release).
    pub fn hold(&self, method: &str) {
        self.push(method, Script::Hold);
    }

    /// Drop the next completion for `method` without calling it.
    pub fn drop_next(&self, method: &str) {
        self.push(method, Script::Drop);
    }

    /// Complete the oldest held call to `method`. Returns false if none is held.
    pub fn release(&self, method: &str, response: NativeResponse) -> bool {
        let reply = {
            let mut held = self.held.lock();
            match held.iter().position(|(m, _)| m == method) {
                Some(i) => held.remove(i).1,
                None => return false,
            }
        };
        reply(response);
        true
    }

    /// Number of calls made to `method`.
    pub fn calls(&self, method: &str) -> usize {
        self.calls.lock().iter().filter(|(m, _)| m == method).count()
    }

    /// Arguments of the most recent call to `method`.
    pub fn last_args(&self, method: &str) -> Option<Vec<Value>> {
        self.calls
            .lock()
            .iter()
            .rev()
            .find(|(m, _)| m == method)
            .map(|(_, a)| a.clone())
    }
}

impl NativeModule for ScriptedNative {
    fn call(&self, method: &str, args: Vec<Value>, reply: NativeCompletion) {
        self.calls.lock().push((method.to_string(), args));
        let script = self
            .scripts
            .lock()
            .get_mut(method)
            .and_then(VecDeque::pop_front);

        // Locks are released before the reply runs; replies re-enter.
        match script {
            Some(Script::Reply(response)) => reply(response),
            Some(Script::Hold) => self.held.lock().push((method.to_string(), reply)),
            Some(Script::Drop) => drop(reply),
            None => reply(NativeResponse::ok(vec![])),
        }
    }
}

/// Native module that completes every call on a fresh worker thread and
/// waits for it, like a host wrapping a synchronous platform dispatch.
pub struct WorkerNative(pub Arc<ScriptedNative>);

impl NativeModule for WorkerNative {
    fn call(&self, method: &str, args: Vec<Value>, reply: NativeCompletion) {
        let inner = self.0.clone();
        let method = method.to_string();
        thread::spawn(move || inner.call(&method, args, reply))
            .join()
            .expect("native worker panicked");
    }
}

/// Event emitter double.
#[derive(Default)]
pub struct RecordingEmitter {
    listeners: Mutex<HashMap<String, Vec<NativeEventHandler>>>,
}

impl RecordingEmitter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of listeners registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.lock().get(event).map_or(0, Vec::len)
    }

    /// Deliver `payload` to every listener of `event`.
    pub fn emit(&self, event: &str, payload: Value) {
        let handlers = self.listeners.lock().get(event).cloned().unwrap_or_default();
        for handler in handlers {
            handler(payload.clone());
        }
    }
}

impl NativeEventEmitter for RecordingEmitter {
    fn add_listener(&self, event: &str, handler: NativeEventHandler) {
        self.listeners
            .lock()
            .entry(event.to_string())
            .or_default()
            .push(handler);
    }
}

/// Slot filled by a continuation built with [`capture`].
pub struct Captured<T>(Arc<Mutex<Option<CallResult<T>>>>);

impl<T> Captured<T> {
    pub fn take(&self) -> Option<CallResult<T>> {
        self.0.lock().take()
    }

    pub fn is_pending(&self) -> bool {
        self.0.lock().is_none()
    }
}

/// Continuation that stores its result for later inspection.
pub fn capture<T: Send + 'static>() -> (impl FnOnce(CallResult<T>) + Send + 'static, Captured<T>)
{
    let slot = Arc::new(Mutex::new(None));
    let writer = slot.clone();
    (move |result| *writer.lock() = Some(result), Captured(slot))
}

/// Counts handler invocations.
#[derive(Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    pub fn account(&self) -> impl Fn(&Arc<Account>) + Send + Sync + 'static {
        let hits = self.0.clone();
        move |_| {
            hits.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn wallet(&self) -> impl Fn(&Arc<Account>, &Wallet) + Send + Sync + 'static {
        let hits = self.0.clone();
        move |_, _| {
            hits.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn transaction(
        &self,
    ) -> impl Fn(&Arc<Account>, &Wallet, &Transaction) + Send + Sync + 'static {
        let hits = self.0.clone();
        move |_, _, _| {
            hits.fetch_add(1, Ordering::SeqCst);
        }
    }
}

// ============================================================================
// BRIDGE HARNESS
// ============================================================================

pub fn test_config() -> BridgeConfig {
    BridgeConfig {
        api_key: Some("test-api-key".into()),
        ..BridgeConfig::default()
    }
}

pub fn test_bridge() -> (Arc<ScriptedNative>, Arc<RecordingEmitter>, AbcBridge) {
    test_bridge_with(test_config())
}

pub fn test_bridge_with(
    config: BridgeConfig,
) -> (Arc<ScriptedNative>, Arc<RecordingEmitter>, AbcBridge) {
    let native = ScriptedNative::new();
    let emitter = RecordingEmitter::new();
    let bridge = AbcBridge::new(native.clone(), emitter.as_ref(), config);
    (native, emitter, bridge)
}

/// Bridge whose native calls complete on worker threads. Replies are
/// scripted on the returned [`ScriptedNative`].
pub fn test_bridge_on_worker() -> (Arc<ScriptedNative>, Arc<RecordingEmitter>, AbcBridge) {
    let native = ScriptedNative::new();
    let emitter = RecordingEmitter::new();
    let bridge = AbcBridge::new(
        Arc::new(WorkerNative(native.clone())),
        emitter.as_ref(),
        test_config(),
    );
    (native, emitter, bridge)
}

/// The bridge's Context, initializing it if needed.
pub fn context(bridge: &AbcBridge) -> Arc<Context> {
    let (done, ctx) = capture::<Arc<Context>>();
    bridge.ensure_context(done);
    ctx.take()
        .expect("native init completes synchronously")
        .expect("init succeeds")
}

/// Password-login `username` with the native layer answering success.
pub fn login(
    bridge: &AbcBridge,
    native: &ScriptedNative,
    username: &str,
    callbacks: CallbackSet,
) -> Arc<Account> {
    let ctx = context(bridge);
    native.on("passwordLogin", NativeResponse::ok(vec![Value::from(username)]));
    let (done, account) = capture::<Arc<Account>>();
    ctx.login_with_password(username, "password", None, callbacks, done);
    account
        .take()
        .expect("login completes synchronously")
        .expect("login succeeds")
}
