//! # Context Facade
//!
//! Pre-login operations: account creation, the two login flavours, and the
//! local-account queries. Obtained from
//! [`SessionRegistry::ensure_context`](super::session::SessionRegistry::ensure_context);
//! one per process.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           LOGIN FLOW                                    │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  login_with_password ──► passwordLogin ──► ok ──► Account::new          │
//! │                                │                    │                   │
//! │                                │                    ▼                   │
//! │                                │          registry.set_active_account   │
//! │                                │                    │                   │
//! │                                ▼                    ▼                   │
//! │                       err ─► done(Err)       done(Ok(account))          │
//! │                       (active slot untouched)                           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::info;

use super::account::Account;
use super::adapter::{CallResult, NativeCallAdapter};
use super::callbacks::CallbackSet;
use super::native::NativeMethod;
use super::session::SessionRegistry;

/// The initialized native context.
pub struct Context {
    adapter: NativeCallAdapter,
    registry: Arc<SessionRegistry>,
}

impl Context {
    pub(crate) fn new(adapter: NativeCallAdapter, registry: Arc<SessionRegistry>) -> Self {
        Self { adapter, registry }
    }

    // ========================================================================
    // ACCOUNT CREATION & LOGIN
    // ========================================================================

    /// Create an account and log it in.
    pub fn create_account<F>(
        &self,
        username: &str,
        password: &str,
        pin: &str,
        callbacks: CallbackSet,
        done: F,
    ) where
        F: FnOnce(CallResult<Arc<Account>>) + Send + 'static,
    {
        self.login(
            NativeMethod::CreateAccount,
            vec![json!(username), json!(password), json!(pin)],
            username,
            callbacks,
            done,
        );
    }

    /// Log in with username and password, plus an OTP secret when the
    /// account requires one.
    ///
    /// On an OTP failure the error's `otp_reset_token()` can be passed to
    /// [`request_otp_reset`](Self::request_otp_reset).
    pub fn login_with_password<F>(
        &self,
        username: &str,
        password: &str,
        otp: Option<&str>,
        callbacks: CallbackSet,
        done: F,
    ) where
        F: FnOnce(CallResult<Arc<Account>>) + Send + 'static,
    {
        self.login(
            NativeMethod::PasswordLogin,
            vec![json!(username), json!(password), json!(otp)],
            username,
            callbacks,
            done,
        );
    }

    /// Log in with username and PIN.
    pub fn login_with_pin<F>(&self, username: &str, pin: &str, callbacks: CallbackSet, done: F)
    where
        F: FnOnce(CallResult<Arc<Account>>) + Send + 'static,
    {
        self.login(
            NativeMethod::PinLogin,
            vec![json!(username), json!(pin)],
            username,
            callbacks,
            done,
        );
    }

    fn login<F>(
        &self,
        method: NativeMethod,
        args: Vec<Value>,
        username: &str,
        callbacks: CallbackSet,
        done: F,
    ) where
        F: FnOnce(CallResult<Arc<Account>>) + Send + 'static,
    {
        let adapter = self.adapter.clone();
        let registry = self.registry.clone();
        let requested = username.to_string();

        self.adapter.call(method, args, move |result| {
            let values = match result {
                Ok(values) => values,
                Err(e) => return done(Err(e)),
            };
            // The native layer may canonicalize the username.
            let username = values
                .first()
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .unwrap_or(requested);

            let account = Account::new(username, callbacks, adapter, registry.clone());
            registry.set_active_account(account.clone());
            info!(username = %account.username(), method = %method, "account logged in");
            done(Ok(account))
        });
    }

    // ========================================================================
    // LOCAL ACCOUNTS
    // ========================================================================

    /// Whether `username` has a password (as opposed to PIN-only / recovery).
    pub fn account_has_password<F>(&self, username: &str, done: F)
    where
        F: FnOnce(CallResult<bool>) + Send + 'static,
    {
        self.adapter
            .call_value(NativeMethod::AccountHasPassword, vec![json!(username)], done);
    }

    /// Remove an account's data from this device.
    pub fn delete_local_account<F>(&self, username: &str, done: F)
    where
        F: FnOnce(CallResult<()>) + Send + 'static,
    {
        self.adapter
            .call_unit(NativeMethod::DeleteLocalAccount, vec![json!(username)], done);
    }

    /// Usernames with data on this device.
    pub fn list_usernames<F>(&self, done: F)
    where
        F: FnOnce(CallResult<Vec<String>>) + Send + 'static,
    {
        self.adapter
            .call_value(NativeMethod::ListUsernames, vec![], done);
    }

    /// Whether `username` can still be registered.
    ///
    /// A native reply without a value counts as available; a taken name is
    /// usually reported as an `AccountAlreadyExists` error instead.
    pub fn username_available<F>(&self, username: &str, done: F)
    where
        F: FnOnce(CallResult<bool>) + Send + 'static,
    {
        self.adapter.call_value(
            NativeMethod::UsernameAvailable,
            vec![json!(username)],
            move |result: CallResult<Option<bool>>| done(result.map(|v| v.unwrap_or(true))),
        );
    }

    /// Whether `username` can log in with a PIN on this device.
    pub fn pin_login_enabled<F>(&self, username: &str, done: F)
    where
        F: FnOnce(CallResult<bool>) + Send + 'static,
    {
        self.adapter
            .call_value(NativeMethod::PinLoginEnabled, vec![json!(username)], done);
    }

    /// Whether `username` has data on this device.
    pub fn account_exists_local<F>(&self, username: &str, done: F)
    where
        F: FnOnce(CallResult<bool>) + Send + 'static,
    {
        self.adapter
            .call_value(NativeMethod::AccountExistsLocal, vec![json!(username)], done);
    }

    // ========================================================================
    // OTP RESET
    // ========================================================================

    /// Local usernames with an OTP reset pending on the server.
    pub fn list_pending_otp_reset_usernames<F>(&self, done: F)
    where
        F: FnOnce(CallResult<Vec<String>>) + Send + 'static,
    {
        self.adapter.call_value(
            NativeMethod::ListPendingOtpResetUsernames,
            vec![],
            move |result: CallResult<Option<Vec<String>>>| {
                done(result.map(Option::unwrap_or_default))
            },
        );
    }

    /// Ask the server to disable OTP for `username` after the reset delay.
    pub fn request_otp_reset<F>(&self, username: &str, token: &str, done: F)
    where
        F: FnOnce(CallResult<()>) + Send + 'static,
    {
        self.adapter.call_unit(
            NativeMethod::RequestOtpReset,
            vec![json!(username), json!(token)],
            done,
        );
    }

    // ========================================================================
    // LAST ACCESSED
    // ========================================================================

    /// Username of the account most recently logged in on this device.
    pub fn last_accessed_account<F>(&self, done: F)
    where
        F: FnOnce(CallResult<Option<String>>) + Send + 'static,
    {
        self.adapter.call_value(
            NativeMethod::GetLastAccessedAccount,
            vec![],
            move |result: CallResult<Option<String>>| {
                done(result.map(|name| name.filter(|n| !n.is_empty())))
            },
        );
    }

    /// Record `username` as the most recently used account.
    pub fn set_last_accessed_account<F>(&self, username: &str, done: F)
    where
        F: FnOnce(CallResult<()>) + Send + 'static,
    {
        self.adapter.call_unit(
            NativeMethod::SetLastAccessedAccount,
            vec![json!(username)],
            done,
        );
    }

    /// The active Account, if it is logged in as `username`.
    pub fn logged_in_account(&self, username: &str) -> Option<Arc<Account>> {
        self.registry
            .active_account()
            .filter(|a| a.username() == username)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context").finish_non_exhaustive()
    }
}

// ============================================================================
// TESTS
// ============================================================================
