//! # Native Contract
//!
//! The two seams to the opaque native SDK: a call-with-completion module and
//! a broadcast event emitter. Everything behind them (credential storage,
//! cryptography, networking, wallet logic) is out of the bridge's hands.

use std::sync::Arc;

use serde_json::Value;

// ============================================================================
// CALLS
// ============================================================================

/// What a native entry point hands back to its completion.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeResponse {
    /// Single completion with positional arguments `(error, ...values)`.
    ///
    /// The error slot may be `null`, a JSON-encoded error string, a
    /// structured `{code, message}` object, or an envelope object carrying the
    /// error under a named `error` field. Legacy success continuations carry
    /// no error slot and must be reported as [`NativeResponse::Resolved`].
    Args(Vec<Value>),
    /// Legacy separate success continuation `(...values)`.
    Resolved(Vec<Value>),
    /// Legacy separate error continuation `(code, message)`.
    Rejected {
        /// Error code string, possibly domain-prefixed
        code: String,
        /// Error message
        message: String,
    },
}

impl NativeResponse {
    /// Successful reply carrying the given values.
    pub fn ok(values: Vec<Value>) -> Self {
        let mut args = Vec::with_capacity(values.len() + 1);
        args.push(Value::Null);
        args.extend(values);
        NativeResponse::Args(args)
    }
}

/// Completion the native module must invoke exactly once per call.
pub type NativeCompletion = Box<dyn FnOnce(NativeResponse) + Send + 'static>;

/// The native SDK module.
///
/// Implementations forward to the platform module (`AirbitzCoreRCT` on
/// React Native hosts) and invoke `reply` when the native work finishes, on
/// whatever thread the SDK uses.
pub trait NativeModule: Send + Sync {
    /// Invoke the entry point `method` with positional `args`.
    fn call(&self, method: &str, args: Vec<Value>, reply: NativeCompletion);
}

/// How an entry point reports failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorChannel {
    /// First completion argument, or a legacy rejection
    Positional,
    /// No error channel: any reply means the operation finished
    None,
}

/// Every native entry point the bridge calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum NativeMethod {
    // ── Context ─────────────────────────────────────────────────
    Init,
    CreateAccount,
    PasswordLogin,
    PinLogin,
    AccountHasPassword,
    DeleteLocalAccount,
    ListUsernames,
    UsernameAvailable,
    PinLoginEnabled,
    AccountExistsLocal,
    ListPendingOtpResetUsernames,
    RequestOtpReset,
    GetLastAccessedAccount,
    SetLastAccessedAccount,

    // ── Account ─────────────────────────────────────────────────
    Logout,
    ChangePassword,
    ChangePin,
    CheckPassword,
    CheckPin,
    PasswordExists,
    PinLoginSetup,
    IsPinLoginEnabled,
    SetOtpKey,
    GetOtpLocalKey,
    GetOtpDetails,
    SetOtpAuth,
    RemoveOtpAuth,
    RemoveOtpResetRequest,
    HasOtpResetPending,
    BitidSign,
    GetWallets,
    GetTransactions,

    // ── Data store ──────────────────────────────────────────────
    DataWrite,
    DataRead,
    DataRemoveKey,
    DataRemoveFolder,
    DataListKeys,
}

impl NativeMethod {
    /// Entry point name on the native module.
    pub fn as_str(&self) -> &'static str {
        match self {
            NativeMethod::Init => "init",
            NativeMethod::CreateAccount => "createAccount",
            NativeMethod::PasswordLogin => "passwordLogin",
            NativeMethod::PinLogin => "pinLogin",
            NativeMethod::AccountHasPassword => "accountHasPassword",
            NativeMethod::DeleteLocalAccount => "deleteLocalAccount",
            NativeMethod::ListUsernames => "listUsernames",
            NativeMethod::UsernameAvailable => "usernameAvailable",
            NativeMethod::PinLoginEnabled => "pinLoginEnabled",
            NativeMethod::AccountExistsLocal => "accountExistsLocal",
            NativeMethod::ListPendingOtpResetUsernames => "listPendingOTPResetUsernames",
            NativeMethod::RequestOtpReset => "requestOTPReset",
            NativeMethod::GetLastAccessedAccount => "getLastAccessedAccount",
            NativeMethod::SetLastAccessedAccount => "setLastAccessedAccount",
            NativeMethod::Logout => "logout",
            NativeMethod::ChangePassword => "changePassword",
            NativeMethod::ChangePin => "changePIN",
            NativeMethod::CheckPassword => "checkPassword",
            NativeMethod::CheckPin => "checkPIN",
            NativeMethod::PasswordExists => "passwordExists",
            NativeMethod::PinLoginSetup => "pinLoginSetup",
            NativeMethod::IsPinLoginEnabled => "isPINLoginEnabled",
            NativeMethod::SetOtpKey => "setOTPKey",
            NativeMethod::GetOtpLocalKey => "getOTPLocalKey",
            NativeMethod::GetOtpDetails => "getOTPDetails",
            NativeMethod::SetOtpAuth => "setOTPAuth",
            NativeMethod::RemoveOtpAuth => "removeOTPAuth",
            NativeMethod::RemoveOtpResetRequest => "removeOTPResetRequest",
            NativeMethod::HasOtpResetPending => "hasOTPResetPending",
            NativeMethod::BitidSign => "bitidSign",
            NativeMethod::GetWallets => "getWallets",
            NativeMethod::GetTransactions => "getTransactions",
            NativeMethod::DataWrite => "dataWrite",
            NativeMethod::DataRead => "dataRead",
            NativeMethod::DataRemoveKey => "dataRemoveKey",
            NativeMethod::DataRemoveFolder => "dataRemoveFolder",
            NativeMethod::DataListKeys => "dataListKeys",
        }
    }

    /// Error channel this entry point uses.
    pub fn error_channel(&self) -> ErrorChannel {
        match self {
            NativeMethod::Logout => ErrorChannel::None,
            _ => ErrorChannel::Positional,
        }
    }
}

impl std::fmt::Display for NativeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// EVENTS
// ============================================================================

/// Handler registered for one native broadcast event.
pub type NativeEventHandler = Arc<dyn Fn(Value) + Send + Sync + 'static>;

/// The native broadcast channel (`NativeAppEventEmitter` on React Native).
pub trait NativeEventEmitter: Send + Sync {
    /// Register `handler` for every delivery of `event`.
    fn add_listener(&self, event: &str, handler: NativeEventHandler);
}

/// Broadcast events the bridge subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum NativeEvent {
    AccountChanged,
    RemotePasswordChange,
    OtpRequired,
    OtpSkew,
    WalletsLoading,
    WalletsLoaded,
    WalletsChanged,
    BlockHeightChanged,
    WalletLoaded,
    WalletChanged,
    IncomingBitcoin,
}

/// How an event names its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventScope {
    /// Payload carries the account `name`
    Account,
    /// Payload carries a wallet `uuid`
    Wallet,
    /// Payload carries a wallet `uuid` and a transaction `txid`
    Transaction,
}

impl NativeEvent {
    /// All subscribed events.
    pub const ALL: [NativeEvent; 11] = [
        NativeEvent::AccountChanged,
        NativeEvent::RemotePasswordChange,
        NativeEvent::OtpRequired,
        NativeEvent::OtpSkew,
        NativeEvent::WalletsLoading,
        NativeEvent::WalletsLoaded,
        NativeEvent::WalletsChanged,
        NativeEvent::BlockHeightChanged,
        NativeEvent::WalletLoaded,
        NativeEvent::WalletChanged,
        NativeEvent::IncomingBitcoin,
    ];

    /// Channel name on the native emitter.
    pub fn as_str(&self) -> &'static str {
        match self {
            NativeEvent::AccountChanged => "abcAccountAccountChanged",
            NativeEvent::RemotePasswordChange => "abcAccountRemotePasswordChange",
            NativeEvent::OtpRequired => "abcAccountOTPRequired",
            NativeEvent::OtpSkew => "abcAccountOTPSkew",
            NativeEvent::WalletsLoading => "abcAccountWalletsLoading",
            NativeEvent::WalletsLoaded => "abcAccountWalletsLoaded",
            NativeEvent::WalletsChanged => "abcAccountWalletsChanged",
            NativeEvent::BlockHeightChanged => "abcAccountBlockHeightChanged",
            NativeEvent::WalletLoaded => "abcAccountWalletLoaded",
            NativeEvent::WalletChanged => "abcAccountWalletChanged",
            NativeEvent::IncomingBitcoin => "abcAccountIncomingBitcoin",
        }
    }

    /// Parse a channel name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().find(|e| e.as_str() == name).copied()
    }

    /// What the payload identifies.
    pub fn scope(&self) -> EventScope {
        match self {
            NativeEvent::WalletLoaded | NativeEvent::WalletChanged => EventScope::Wallet,
            NativeEvent::IncomingBitcoin => EventScope::Transaction,
            _ => EventScope::Account,
        }
    }
}
