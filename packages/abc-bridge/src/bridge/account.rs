//! # Account Facade
//!
//! A logged-in user. Created only by a successful login or account creation
//! on the [`Context`](super::context::Context); becomes the active account at
//! that moment.
//!
//! Operations forward to the native layer, which tracks a single logged-in
//! user. Calling them on an Account that has since been logged out or
//! replaced acts on whatever user the native layer currently holds.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::adapter::{decode, CallResult, NativeCallAdapter};
use super::callbacks::CallbackSet;
use super::datastore::DataStore;
use super::native::NativeMethod;
use super::session::SessionRegistry;
use super::wallet::{BitIdSignature, OtpDetails, Transaction, Wallet};

/// A logged-in user.
pub struct Account {
    username: String,
    callbacks: RwLock<Arc<CallbackSet>>,
    data_store: DataStore,
    adapter: NativeCallAdapter,
    registry: Arc<SessionRegistry>,
}

impl Account {
    pub(crate) fn new(
        username: String,
        callbacks: CallbackSet,
        adapter: NativeCallAdapter,
        registry: Arc<SessionRegistry>,
    ) -> Arc<Self> {
        Arc::new(Self {
            username,
            callbacks: RwLock::new(Arc::new(callbacks)),
            data_store: DataStore::new(adapter.clone()),
            adapter,
            registry,
        })
    }

    /// Username this Account was logged in as.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The current callback set.
    pub fn callbacks(&self) -> Arc<CallbackSet> {
        self.callbacks.read().clone()
    }

    /// Replace the whole callback set. Events delivered afterwards use it.
    pub fn set_callbacks(&self, callbacks: CallbackSet) {
        *self.callbacks.write() = Arc::new(callbacks);
    }

    /// Encrypted key/value storage of this account.
    pub fn data_store(&self) -> &DataStore {
        &self.data_store
    }

    /// Whether native events are still routed to this Account.
    pub fn is_active(self: &Arc<Self>) -> bool {
        self.registry.is_active(self)
    }

    // ========================================================================
    // SESSION
    // ========================================================================

    /// Log out of the native layer.
    ///
    /// The active-account slot is empty by the time `done` runs.
    pub fn logout<F>(self: &Arc<Self>, done: F)
    where
        F: FnOnce(CallResult<()>) + Send + 'static,
    {
        let registry = self.registry.clone();
        let username = self.username.clone();
        self.adapter
            .call_unit(NativeMethod::Logout, vec![], move |result| {
                if result.is_ok() {
                    if let Some(prev) = registry.clear_active_account() {
                        if prev.username() != username {
                            debug!(active = %prev.username(), "logout cleared a different account");
                        }
                    }
                    info!(username = %username, "logged out");
                }
                done(result)
            });
    }

    // ========================================================================
    // CREDENTIALS
    // ========================================================================

    /// Change the account password.
    pub fn change_password<F>(&self, password: &str, done: F)
    where
        F: FnOnce(CallResult<()>) + Send + 'static,
    {
        self.adapter
            .call_unit(NativeMethod::ChangePassword, vec![json!(password)], done);
    }

    /// Change the account PIN.
    pub fn change_pin<F>(&self, pin: &str, done: F)
    where
        F: FnOnce(CallResult<()>) + Send + 'static,
    {
        self.adapter
            .call_unit(NativeMethod::ChangePin, vec![json!(pin)], done);
    }

    /// Whether `password` is the account password.
    ///
    /// The native layer may answer `false` or fail with `BadPassword`; both
    /// reach `done` unchanged.
    pub fn check_password<F>(&self, password: &str, done: F)
    where
        F: FnOnce(CallResult<bool>) + Send + 'static,
    {
        self.adapter
            .call_value(NativeMethod::CheckPassword, vec![json!(password)], done);
    }

    /// Whether `pin` is the account PIN.
    pub fn check_pin<F>(&self, pin: &str, done: F)
    where
        F: FnOnce(CallResult<bool>) + Send + 'static,
    {
        self.adapter
            .call_value(NativeMethod::CheckPin, vec![json!(pin)], done);
    }

    /// Whether the account has a password at all.
    pub fn password_exists<F>(&self, done: F)
    where
        F: FnOnce(CallResult<bool>) + Send + 'static,
    {
        self.adapter
            .call_value(NativeMethod::PasswordExists, vec![], done);
    }

    /// Enable or disable PIN login on this device.
    pub fn pin_login_setup<F>(&self, enable: bool, done: F)
    where
        F: FnOnce(CallResult<()>) + Send + 'static,
    {
        self.adapter
            .call_unit(NativeMethod::PinLoginSetup, vec![json!(enable)], done);
    }

    /// Whether PIN login is enabled for this account on this device.
    pub fn pin_login_enabled<F>(&self, done: F)
    where
        F: FnOnce(CallResult<bool>) + Send + 'static,
    {
        self.adapter
            .call_value(NativeMethod::IsPinLoginEnabled, vec![], done);
    }

    // ========================================================================
    // OTP
    // ========================================================================

    /// Install an OTP secret on this device.
    pub fn set_otp_key<F>(&self, key: &str, done: F)
    where
        F: FnOnce(CallResult<()>) + Send + 'static,
    {
        self.adapter
            .call_unit(NativeMethod::SetOtpKey, vec![json!(key)], done);
    }

    /// The OTP secret stored on this device, if any.
    pub fn otp_local_key<F>(&self, done: F)
    where
        F: FnOnce(CallResult<Option<String>>) + Send + 'static,
    {
        self.adapter.call_value(
            NativeMethod::GetOtpLocalKey,
            vec![],
            move |result: CallResult<Option<String>>| {
                done(result.map(|key| key.filter(|k| !k.is_empty())))
            },
        );
    }

    /// OTP settings stored on the server.
    pub fn otp_details<F>(&self, done: F)
    where
        F: FnOnce(CallResult<OtpDetails>) + Send + 'static,
    {
        self.adapter
            .call_value(NativeMethod::GetOtpDetails, vec![], done);
    }

    /// Require OTP for logins, with the given reset timeout in seconds.
    pub fn enable_otp<F>(&self, timeout_secs: i64, done: F)
    where
        F: FnOnce(CallResult<()>) + Send + 'static,
    {
        self.adapter
            .call_unit(NativeMethod::SetOtpAuth, vec![json!(timeout_secs)], done);
    }

    /// Stop requiring OTP for logins.
    pub fn disable_otp<F>(&self, done: F)
    where
        F: FnOnce(CallResult<()>) + Send + 'static,
    {
        self.adapter
            .call_unit(NativeMethod::RemoveOtpAuth, vec![], done);
    }

    /// Cancel a pending OTP reset request.
    pub fn cancel_otp_reset_request<F>(&self, done: F)
    where
        F: FnOnce(CallResult<()>) + Send + 'static,
    {
        self.adapter
            .call_unit(NativeMethod::RemoveOtpResetRequest, vec![], done);
    }

    /// Whether an OTP reset is pending.
    pub fn has_otp_reset_pending<F>(&self, done: F)
    where
        F: FnOnce(CallResult<bool>) + Send + 'static,
    {
        self.adapter
            .call_value(NativeMethod::HasOtpResetPending, vec![], done);
    }

    // ========================================================================
    // WALLETS & SIGNING
    // ========================================================================

    /// Sign `message` with the key derived for `uri`.
    ///
    /// The native layer answers either with one `{address, signature}` object
    /// or with the two strings as separate values.
    pub fn bitid_sign<F>(&self, uri: &str, message: &str, done: F)
    where
        F: FnOnce(CallResult<BitIdSignature>) + Send + 'static,
    {
        self.adapter.call(
            NativeMethod::BitidSign,
            vec![json!(uri), json!(message)],
            move |result| {
                done(result.and_then(|values| {
                    if let [Value::String(address), Value::String(signature), ..] =
                        values.as_slice()
                    {
                        return Ok(BitIdSignature {
                            address: address.clone(),
                            signature: signature.clone(),
                        });
                    }
                    decode(
                        NativeMethod::BitidSign,
                        values.into_iter().next().unwrap_or(Value::Null),
                    )
                }))
            },
        );
    }

    /// Every wallet of the account.
    pub fn get_wallets<F>(&self, done: F)
    where
        F: FnOnce(CallResult<Vec<Wallet>>) + Send + 'static,
    {
        self.adapter
            .call_value(NativeMethod::GetWallets, vec![], done);
    }

    /// Transactions of one wallet.
    pub fn get_transactions<F>(&self, wallet_uuid: &str, done: F)
    where
        F: FnOnce(CallResult<Vec<Transaction>>) + Send + 'static,
    {
        self.adapter
            .call_value(NativeMethod::GetTransactions, vec![json!(wallet_uuid)], done);
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("username", &self.username)
            .field("callbacks", &*self.callbacks.read())
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================
