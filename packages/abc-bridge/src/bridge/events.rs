//! # Event Router
//!
//! Subscribes once to the native broadcast channel and turns each delivery
//! into at most one call on the active Account's callback set.
//!
//! ## Routing
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          EVENT ROUTING                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  native event ──► active account? ──no──► drop                          │
//! │                        │ yes                                            │
//! │                        ▼                                                │
//! │              { name }  ──► name matches? ──► handler(account)           │
//! │              { uuid }  ──► getWallets ──► still active? ──► handler     │
//! │              { uuid, txid } ──► getWallets + getTransactions ──► ...    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Wallet-scoped events are resolved by re-querying the native layer. The
//! result is delivered only if the Account that was active when the event
//! arrived is still active when the query completes. With
//! [`RouterOptions::trust_event_payloads`] set, wallet and transaction
//! objects carried in the payload are used directly.
//!
//! Handler calls are serialized; a handler that causes a nested delivery on
//! the same thread proceeds without deadlocking. The serial lock is never
//! held across a native re-query, so a native module may complete on any
//! thread, including one the dispatching thread waits on.

use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::account::Account;
use super::adapter::CallResult;
use super::native::{EventScope, NativeEvent, NativeEventEmitter};
use super::session::SessionRegistry;
use super::wallet::{Transaction, Wallet};
use crate::error::Error;

/// Router behaviour switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterOptions {
    /// Build wallet/transaction objects from event payloads when present
    #[serde(default)]
    pub trust_event_payloads: bool,
}

/// Subscription state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterState {
    /// Not yet listening
    Idle,
    /// Listening for the rest of the process lifetime
    Subscribed,
}

/// Routes native broadcast events to the active Account.
pub struct EventRouter {
    registry: Arc<SessionRegistry>,
    options: RouterOptions,
    state: Mutex<RouterState>,
    serial: ReentrantMutex<()>,
}

impl EventRouter {
    /// Create an idle router.
    pub fn new(registry: Arc<SessionRegistry>, options: RouterOptions) -> Arc<Self> {
        Arc::new(Self {
            registry,
            options,
            state: Mutex::new(RouterState::Idle),
            serial: ReentrantMutex::new(()),
        })
    }

    /// Subscription state.
    pub fn state(&self) -> RouterState {
        *self.state.lock()
    }

    /// Switches this router was built with.
    pub fn options(&self) -> RouterOptions {
        self.options
    }

    /// Register for every native event. Returns false if already subscribed.
    pub fn subscribe(self: &Arc<Self>, emitter: &dyn NativeEventEmitter) -> bool {
        {
            let mut state = self.state.lock();
            if *state == RouterState::Subscribed {
                debug!("event router already subscribed");
                return false;
            }
            *state = RouterState::Subscribed;
        }

        for event in NativeEvent::ALL {
            let router = Arc::downgrade(self);
            emitter.add_listener(
                event.as_str(),
                Arc::new(move |payload| {
                    if let Some(router) = router.upgrade() {
                        router.deliver(event, payload);
                    }
                }),
            );
        }
        info!(events = NativeEvent::ALL.len(), "subscribed to native events");
        true
    }

    /// Deliver a native event by channel name.
    pub fn dispatch(self: &Arc<Self>, event: &str, payload: Value) {
        match NativeEvent::from_name(event) {
            Some(event) => self.deliver(event, payload),
            None => debug!(event, "ignoring unknown native event"),
        }
    }

    fn deliver(self: &Arc<Self>, event: NativeEvent, payload: Value) {
        // The guard covers routing only; native re-queries are issued after
        // it is released and their completions take it again.
        let requery = {
            let _serial = self.serial.lock();
            debug!(event = event.as_str(), "native event");

            let Some(account) = self.registry.active_account() else {
                debug!(event = event.as_str(), "no active account, dropping event");
                return;
            };
            if !account.callbacks().handles(event) {
                debug!(event = event.as_str(), "no handler registered");
                return;
            }

            match event.scope() {
                EventScope::Account => {
                    self.deliver_account(event, &payload, account);
                    return;
                }
                EventScope::Wallet => self.route_wallet(event, &payload, account),
                EventScope::Transaction => self.route_transaction(event, &payload, account),
            }
        };

        match requery {
            Some(Requery::Wallet { event, account, uuid }) => {
                self.requery_wallet(event, account, uuid)
            }
            Some(Requery::Transaction { account, uuid, txid }) => {
                self.requery_transaction(account, uuid, txid)
            }
            None => {}
        }
    }

    fn deliver_account(&self, event: NativeEvent, payload: &Value, account: Arc<Account>) {
        // No name means the native layer's single logged-in user.
        if let Some(name) = payload.get("name").and_then(Value::as_str) {
            if name != account.username() {
                debug!(event = event.as_str(), "event names another account, dropping");
                return;
            }
        }
        let callbacks = account.callbacks();
        if let Some(handler) = callbacks.account_handler(event) {
            handler(&account);
        }
    }

    fn route_wallet(
        &self,
        event: NativeEvent,
        payload: &Value,
        account: Arc<Account>,
    ) -> Option<Requery> {
        let uuid = required_str(event, payload, "uuid")?;

        if self.options.trust_event_payloads {
            if let Some(wallet) = Wallet::from_event_payload(payload) {
                if wallet.uuid == uuid {
                    self.finish_wallet(event, &account, wallet);
                    return None;
                }
            }
        }
        Some(Requery::Wallet { event, account, uuid })
    }

    fn requery_wallet(self: &Arc<Self>, event: NativeEvent, account: Arc<Account>, uuid: String) {
        let router = self.clone();
        let origin = account.clone();
        account.get_wallets(move |result| {
            let _serial = router.serial.lock();
            if let Some(wallet) = find_wallet(event, result, &uuid) {
                router.finish_wallet(event, &origin, wallet);
            }
        });
    }

    fn finish_wallet(&self, event: NativeEvent, origin: &Arc<Account>, wallet: Wallet) {
        let Some(account) = self.still_active(event, origin) else {
            return;
        };
        let callbacks = account.callbacks();
        if let Some(handler) = callbacks.wallet_handler(event) {
            handler(&account, &wallet);
        }
    }

    fn route_transaction(
        &self,
        event: NativeEvent,
        payload: &Value,
        account: Arc<Account>,
    ) -> Option<Requery> {
        let (Some(uuid), Some(txid)) = (
            required_str(event, payload, "uuid"),
            required_str(event, payload, "txid"),
        ) else {
            return None;
        };

        if self.options.trust_event_payloads {
            let wallet = Wallet::from_event_payload(payload).filter(|w| w.uuid == uuid);
            let tx = Transaction::from_event_payload(payload).filter(|t| t.txid == txid);
            if let (Some(wallet), Some(tx)) = (wallet, tx) {
                self.finish_transaction(&account, wallet, tx);
                return None;
            }
        }
        Some(Requery::Transaction { account, uuid, txid })
    }

    fn requery_transaction(self: &Arc<Self>, account: Arc<Account>, uuid: String, txid: String) {
        let event = NativeEvent::IncomingBitcoin;
        let router = self.clone();
        let origin = account.clone();
        account.get_wallets(move |result| {
            let Some(wallet) = find_wallet(event, result, &uuid) else {
                return;
            };
            let lookup = origin.clone();
            lookup.get_transactions(&uuid, move |result| {
                let _serial = router.serial.lock();
                let tx = match result {
                    Ok(txs) => txs.into_iter().find(|t| t.txid == txid),
                    Err(e) => {
                        warn!(event = event.as_str(), code = e.code, "transaction lookup failed");
                        return;
                    }
                };
                match tx {
                    Some(tx) => router.finish_transaction(&origin, wallet, tx),
                    None => debug!(event = event.as_str(), "transaction not found, dropping"),
                }
            });
        });
    }

    fn finish_transaction(&self, origin: &Arc<Account>, wallet: Wallet, tx: Transaction) {
        let Some(account) = self.still_active(NativeEvent::IncomingBitcoin, origin) else {
            return;
        };
        let callbacks = account.callbacks();
        if let Some(handler) = callbacks.transaction_handler() {
            handler(&account, &wallet, &tx);
        }
    }

    fn still_active(&self, event: NativeEvent, origin: &Arc<Account>) -> Option<Arc<Account>> {
        let current = self
            .registry
            .active_account()
            .filter(|a| Arc::ptr_eq(a, origin));
        if current.is_none() {
            debug!(event = event.as_str(), "active account changed, dropping event");
        }
        current
    }
}

/// A native lookup still needed before delivery.
enum Requery {
    Wallet {
        event: NativeEvent,
        account: Arc<Account>,
        uuid: String,
    },
    Transaction {
        account: Arc<Account>,
        uuid: String,
        txid: String,
    },
}

fn required_str(event: NativeEvent, payload: &Value, field: &'static str) -> Option<String> {
    let value = payload.get(field).and_then(Value::as_str).map(str::to_owned);
    if value.is_none() {
        let err = Error::MalformedEvent {
            event: event.as_str().to_string(),
            field,
        };
        warn!(error = %err, "dropping malformed event");
    }
    value
}

fn find_wallet(event: NativeEvent, result: CallResult<Vec<Wallet>>, uuid: &str) -> Option<Wallet> {
    match result {
        Ok(wallets) => {
            let found = wallets.into_iter().find(|w| w.uuid == uuid);
            if found.is_none() {
                debug!(event = event.as_str(), "wallet not found, dropping");
            }
            found
        }
        Err(e) => {
            warn!(event = event.as_str(), code = e.code, "wallet lookup failed");
            None
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::callbacks::CallbackSet;
    use crate::bridge::native::NativeResponse;
    use crate::bridge::testing::{
        capture, login, test_bridge, test_bridge_on_worker, test_bridge_with, test_config,
        Counter, RecordingEmitter, ScriptedNative,
    };
    use crate::{AbcBridge, BridgeConfig};
    use serde_json::json;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    fn server_down() -> NativeResponse {
        NativeResponse::Args(vec![json!({"code": 24, "message": "server down"})])
    }

    #[test]
    fn test_subscribes_once() {
        let (_native, emitter, bridge) = test_bridge();
        assert_eq!(bridge.router().state(), RouterState::Subscribed);
        assert_eq!(emitter.listener_count("abcAccountAccountChanged"), 1);
        assert_eq!(emitter.listener_count("abcAccountIncomingBitcoin"), 1);

        assert!(!bridge.router().subscribe(emitter.as_ref()));
        assert_eq!(emitter.listener_count("abcAccountAccountChanged"), 1);
    }

    #[test]
    fn test_events_for_replaced_account_are_dropped() {
        let (native, emitter, bridge) = test_bridge();
        let alice_hits = Counter::new();
        let bob_hits = Counter::new();
        login(&bridge, &native, "alice", CallbackSet::new().on_account_changed(alice_hits.account()));
        login(&bridge, &native, "bob", CallbackSet::new().on_account_changed(bob_hits.account()));

        emitter.emit("abcAccountAccountChanged", json!({"name": "alice"}));
        assert_eq!((alice_hits.get(), bob_hits.get()), (0, 0));

        emitter.emit("abcAccountAccountChanged", json!({"name": "bob"}));
        emitter.emit("abcAccountAccountChanged", json!({}));
        assert_eq!((alice_hits.get(), bob_hits.get()), (0, 2));
    }

    #[test]
    fn test_no_active_account_drops_everything() {
        let (native, emitter, bridge) = test_bridge();
        let hits = Counter::new();
        let alice = login(&bridge, &native, "alice", CallbackSet::new().on_otp_required(hits.account()));

        let (done, result) = capture::<()>();
        alice.logout(done);
        assert!(result.take().unwrap().is_ok());

        emitter.emit("abcAccountOTPRequired", json!({"name": "alice"}));
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_wallet_event_requeries() {
        let (native, emitter, bridge) = test_bridge();
        let names = Arc::new(Mutex::new(Vec::new()));
        let sink = names.clone();
        login(
            &bridge,
            &native,
            "alice",
            CallbackSet::new().on_wallet_changed(move |_, w| sink.lock().push(w.name.clone())),
        );

        native.on(
            "getWallets",
            NativeResponse::ok(vec![json!([{"uuid": "w1", "name": "Spending"}])]),
        );
        emitter.emit("abcAccountWalletChanged", json!({"uuid": "w1"}));
        assert_eq!(*names.lock(), vec!["Spending".to_string()]);

        native.on("getWallets", NativeResponse::ok(vec![json!([])]));
        emitter.emit("abcAccountWalletChanged", json!({"uuid": "w9"}));
        assert_eq!(names.lock().len(), 1);
        assert_eq!(native.calls("getWallets"), 2);
    }

    #[test]
    fn test_requery_result_dropped_after_account_switch() {
        let (native, emitter, bridge) = test_bridge();
        let hits = Counter::new();
        login(&bridge, &native, "alice", CallbackSet::new().on_wallet_loaded(hits.wallet()));

        native.hold("getWallets");
        emitter.emit("abcAccountWalletLoaded", json!({"uuid": "w1"}));
        login(&bridge, &native, "bob", CallbackSet::new().on_wallet_loaded(hits.wallet()));

        assert!(native.release(
            "getWallets",
            NativeResponse::ok(vec![json!([{"uuid": "w1"}])])
        ));
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_incoming_bitcoin_dropped_after_account_switch() {
        let (native, emitter, bridge) = test_bridge();
        let hits = Counter::new();
        login(&bridge, &native, "alice", CallbackSet::new().on_incoming_bitcoin(hits.transaction()));

        native.on("getWallets", NativeResponse::ok(vec![json!([{"uuid": "w1"}])]));
        native.hold("getTransactions");
        emitter.emit("abcAccountIncomingBitcoin", json!({"uuid": "w1", "txid": "t1"}));
        login(&bridge, &native, "bob", CallbackSet::new().on_incoming_bitcoin(hits.transaction()));

        assert!(native.release(
            "getTransactions",
            NativeResponse::ok(vec![json!([{"txid": "t1"}])])
        ));
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_failed_requery_drops_event() {
        let (native, emitter, bridge) = test_bridge();
        let wallet_hits = Counter::new();
        let tx_hits = Counter::new();
        login(
            &bridge,
            &native,
            "alice",
            CallbackSet::new()
                .on_wallet_changed(wallet_hits.wallet())
                .on_incoming_bitcoin(tx_hits.transaction()),
        );

        native.on("getWallets", server_down());
        emitter.emit("abcAccountWalletChanged", json!({"uuid": "w1"}));
        assert_eq!(wallet_hits.get(), 0);

        native.on("getWallets", server_down());
        emitter.emit("abcAccountIncomingBitcoin", json!({"uuid": "w1", "txid": "t1"}));
        assert_eq!(native.calls("getTransactions"), 0);

        native.on("getWallets", NativeResponse::ok(vec![json!([{"uuid": "w1"}])]));
        native.on("getTransactions", server_down());
        emitter.emit("abcAccountIncomingBitcoin", json!({"uuid": "w1", "txid": "t1"}));
        assert_eq!(tx_hits.get(), 0);
        assert_eq!(native.calls("getWallets"), 3);
    }

    #[test]
    fn test_requery_completing_on_worker_thread() {
        let (native, _emitter, bridge) = test_bridge_on_worker();
        let wallet_hits = Counter::new();
        let tx_hits = Counter::new();
        login(
            &bridge,
            &native,
            "alice",
            CallbackSet::new()
                .on_wallet_loaded(wallet_hits.wallet())
                .on_incoming_bitcoin(tx_hits.transaction()),
        );
        native.on("getWallets", NativeResponse::ok(vec![json!([{"uuid": "w1"}])]));
        native.on("getWallets", NativeResponse::ok(vec![json!([{"uuid": "w1"}])]));
        native.on("getTransactions", NativeResponse::ok(vec![json!([{"txid": "t1"}])]));

        let (done, finished) = mpsc::channel();
        let router = bridge.router().clone();
        thread::spawn(move || {
            router.dispatch("abcAccountWalletLoaded", json!({"uuid": "w1"}));
            router.dispatch("abcAccountIncomingBitcoin", json!({"uuid": "w1", "txid": "t1"}));
            let _ = done.send(());
        });

        assert!(finished.recv_timeout(Duration::from_secs(3)).is_ok());
        assert_eq!((wallet_hits.get(), tx_hits.get()), (1, 1));
    }

    #[test]
    fn test_trusted_payload_skips_query() {
        let (native, emitter, bridge) = test_bridge_trusting();
        let hits = Counter::new();
        login(&bridge, &native, "alice", CallbackSet::new().on_wallet_loaded(hits.wallet()));

        emitter.emit(
            "abcAccountWalletLoaded",
            json!({"uuid": "w1", "wallet": {"uuid": "w1", "name": "A"}}),
        );
        assert_eq!(hits.get(), 1);
        assert_eq!(native.calls("getWallets"), 0);

        // A bare id still needs the query.
        native.on("getWallets", NativeResponse::ok(vec![json!([{"uuid": "w1"}])]));
        emitter.emit("abcAccountWalletLoaded", json!({"uuid": "w1"}));
        assert_eq!(hits.get(), 2);
        assert_eq!(native.calls("getWallets"), 1);
    }

    fn test_bridge_trusting() -> (Arc<ScriptedNative>, Arc<RecordingEmitter>, AbcBridge) {
        test_bridge_with(BridgeConfig {
            trust_event_payloads: true,
            ..test_config()
        })
    }

    #[test]
    fn test_incoming_bitcoin() {
        let (native, emitter, bridge) = test_bridge();
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        login(
            &bridge,
            &native,
            "alice",
            CallbackSet::new().on_incoming_bitcoin(move |a, w, t| {
                *sink.lock() = Some((a.username().to_string(), w.uuid.clone(), t.txid.clone()));
            }),
        );

        native.on("getWallets", NativeResponse::ok(vec![json!([{"uuid": "w1"}])]));
        native.on(
            "getTransactions",
            NativeResponse::ok(vec![json!([{"txid": "t0"}, {"txid": "t1"}])]),
        );
        emitter.emit("abcAccountIncomingBitcoin", json!({"uuid": "w1", "txid": "t1"}));

        assert_eq!(
            seen.lock().clone(),
            Some(("alice".to_string(), "w1".to_string(), "t1".to_string()))
        );
        assert_eq!(native.last_args("getTransactions").unwrap(), vec![json!("w1")]);
    }

    #[test]
    fn test_malformed_and_unknown_events_are_ignored() {
        let (native, emitter, bridge) = test_bridge();
        let hits = Counter::new();
        login(&bridge, &native, "alice", CallbackSet::new().on_wallet_changed(hits.wallet()));

        emitter.emit("abcAccountWalletChanged", json!({"name": "alice"}));
        bridge.router().dispatch("abcAccountSomethingNew", json!({}));
        assert_eq!(hits.get(), 0);
        assert_eq!(native.calls("getWallets"), 0);
    }

    #[test]
    fn test_replaced_callbacks_are_used() {
        let (native, emitter, bridge) = test_bridge();
        let old = Counter::new();
        let new = Counter::new();
        let alice = login(&bridge, &native, "alice", CallbackSet::new().on_otp_skew(old.account()));

        alice.set_callbacks(CallbackSet::new().on_otp_skew(new.account()));
        emitter.emit("abcAccountOTPSkew", json!({"name": "alice"}));
        assert_eq!((old.get(), new.get()), (0, 1));
    }

    #[test]
    fn test_nested_delivery_does_not_deadlock() {
        let (native, _emitter, bridge) = test_bridge();
        let inner = Counter::new();
        let router = bridge.router().clone();
        let inner_handler = inner.account();
        login(
            &bridge,
            &native,
            "alice",
            CallbackSet::new()
                .on_wallets_loading(move |_| {
                    router.dispatch("abcAccountWalletsLoaded", json!({"name": "alice"}))
                })
                .on_wallets_loaded(inner_handler),
        );

        bridge
            .router()
            .dispatch("abcAccountWalletsLoading", json!({"name": "alice"}));
        assert_eq!(inner.get(), 1);
    }
}
