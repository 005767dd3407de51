//! # Condition Codes
//!
//! The static table of native SDK condition codes. Applications compare
//! [`NormalizedError::code`](crate::NormalizedError::code) against it; the
//! bridge itself only reads it (to strip symbolic codes and to recognise the
//! tolerated `Reinitialization` failure).
//!
//! ## Code Families
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        CONDITION CODE FAMILIES                          │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Initialization   NotInitialized, Reinitialization (tolerated)          │
//! │  Credential       BadPassword, InvalidOtp, AccountAlreadyExists, ...    │
//! │  Storage          DirReadError, FileReadError, FileDoesNotExist, ...    │
//! │  Crypto           DecryptError, EncryptError, ScryptError, ...          │
//! │  Protocol         JsonError, ParseError (also the normalizer's own)     │
//! │  Network          UrlError, ServerError, Obsolete                       │
//! │  Domain           InsufficientFunds, InvalidWalletId, SpendDust, ...    │
//! │  General          Ok, Error, NullPtr, SysError, ...                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Prefix the native SDK puts in front of symbolic code names.
pub const SYMBOLIC_PREFIX: &str = "ABCConditionCode";

/// Native SDK condition codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum ConditionCode {
    Ok,
    Error,
    NullPtr,
    NoAvailAccountSpace,
    DirReadError,
    FileOpenError,
    FileReadError,
    FileWriteError,
    FileDoesNotExist,
    UnknownCryptoType,
    InvalidCryptoType,
    DecryptError,
    DecryptFailure,
    EncryptError,
    ScryptError,
    AccountAlreadyExists,
    AccountDoesNotExist,
    JsonError,
    BadPassword,
    WalletAlreadyExists,
    UrlError,
    SysError,
    NotInitialized,
    Reinitialization,
    ServerError,
    NoRecoveryQuestions,
    NotSupported,
    MutexError,
    NoTransaction,
    EmptyWallet,
    ParseError,
    InvalidWalletId,
    NoRequest,
    InsufficientFunds,
    Synchronizing,
    NonNumericPin,
    NoAvailableAddress,
    InvalidPinWait,
    PinExpired,
    InvalidOtp,
    SpendDust,
    Obsolete,
}

/// Broad grouping of condition codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionFamily {
    /// Context setup state
    Initialization,
    /// Passwords, PINs, OTP and account existence
    Credential,
    /// Local file/directory access
    Storage,
    /// Encryption and key stretching
    Crypto,
    /// Malformed JSON or unparseable payloads
    Protocol,
    /// Server and transport failures
    Network,
    /// Wallet and spending rules
    Domain,
    /// Everything else
    General,
}

/// Every code, in numeric order.
pub const ALL: [ConditionCode; 42] = [
    ConditionCode::Ok,
    ConditionCode::Error,
    ConditionCode::NullPtr,
    ConditionCode::NoAvailAccountSpace,
    ConditionCode::DirReadError,
    ConditionCode::FileOpenError,
    ConditionCode::FileReadError,
    ConditionCode::FileWriteError,
    ConditionCode::FileDoesNotExist,
    ConditionCode::UnknownCryptoType,
    ConditionCode::InvalidCryptoType,
    ConditionCode::DecryptError,
    ConditionCode::DecryptFailure,
    ConditionCode::EncryptError,
    ConditionCode::ScryptError,
    ConditionCode::AccountAlreadyExists,
    ConditionCode::AccountDoesNotExist,
    ConditionCode::JsonError,
    ConditionCode::BadPassword,
    ConditionCode::WalletAlreadyExists,
    ConditionCode::UrlError,
    ConditionCode::SysError,
    ConditionCode::NotInitialized,
    ConditionCode::Reinitialization,
    ConditionCode::ServerError,
    ConditionCode::NoRecoveryQuestions,
    ConditionCode::NotSupported,
    ConditionCode::MutexError,
    ConditionCode::NoTransaction,
    ConditionCode::EmptyWallet,
    ConditionCode::ParseError,
    ConditionCode::InvalidWalletId,
    ConditionCode::NoRequest,
    ConditionCode::InsufficientFunds,
    ConditionCode::Synchronizing,
    ConditionCode::NonNumericPin,
    ConditionCode::NoAvailableAddress,
    ConditionCode::InvalidPinWait,
    ConditionCode::PinExpired,
    ConditionCode::InvalidOtp,
    ConditionCode::SpendDust,
    ConditionCode::Obsolete,
];

static BY_CODE: Lazy<HashMap<i32, ConditionCode>> =
    Lazy::new(|| ALL.iter().map(|c| (c.code(), *c)).collect());

static BY_NAME: Lazy<HashMap<&'static str, ConditionCode>> =
    Lazy::new(|| ALL.iter().map(|c| (c.name(), *c)).collect());

impl ConditionCode {
    /// Stable integer value used on the wire.
    pub fn code(&self) -> i32 {
        match self {
            ConditionCode::Ok => 0,
            ConditionCode::Error => 1,
            ConditionCode::NullPtr => 2,
            ConditionCode::NoAvailAccountSpace => 3,
            ConditionCode::DirReadError => 4,
            ConditionCode::FileOpenError => 5,
            ConditionCode::FileReadError => 6,
            ConditionCode::FileWriteError => 7,
            ConditionCode::FileDoesNotExist => 8,
            ConditionCode::UnknownCryptoType => 9,
            ConditionCode::InvalidCryptoType => 10,
            ConditionCode::DecryptError => 11,
            ConditionCode::DecryptFailure => 12,
            ConditionCode::EncryptError => 13,
            ConditionCode::ScryptError => 14,
            ConditionCode::AccountAlreadyExists => 15,
            ConditionCode::AccountDoesNotExist => 16,
            ConditionCode::JsonError => 17,
            ConditionCode::BadPassword => 18,
            ConditionCode::WalletAlreadyExists => 19,
            ConditionCode::UrlError => 20,
            ConditionCode::SysError => 21,
            ConditionCode::NotInitialized => 22,
            ConditionCode::Reinitialization => 23,
            ConditionCode::ServerError => 24,
            ConditionCode::NoRecoveryQuestions => 25,
            ConditionCode::NotSupported => 26,
            ConditionCode::MutexError => 27,
            ConditionCode::NoTransaction => 28,
            ConditionCode::EmptyWallet => 29,
            ConditionCode::ParseError => 30,
            ConditionCode::InvalidWalletId => 31,
            ConditionCode::NoRequest => 32,
            ConditionCode::InsufficientFunds => 33,
            ConditionCode::Synchronizing => 34,
            ConditionCode::NonNumericPin => 35,
            ConditionCode::NoAvailableAddress => 36,
            ConditionCode::InvalidPinWait => 37,
            ConditionCode::PinExpired => 38,
            ConditionCode::InvalidOtp => 39,
            ConditionCode::SpendDust => 40,
            ConditionCode::Obsolete => 1000,
        }
    }

    /// Symbolic name without the `ABCConditionCode` prefix.
    pub fn name(&self) -> &'static str {
        match self {
            ConditionCode::Ok => "Ok",
            ConditionCode::Error => "Error",
            ConditionCode::NullPtr => "NULLPtr",
            ConditionCode::NoAvailAccountSpace => "NoAvailAccountSpace",
            ConditionCode::DirReadError => "DirReadError",
            ConditionCode::FileOpenError => "FileOpenError",
            ConditionCode::FileReadError => "FileReadError",
            ConditionCode::FileWriteError => "FileWriteError",
            ConditionCode::FileDoesNotExist => "FileDoesNotExist",
            ConditionCode::UnknownCryptoType => "UnknownCryptoType",
            ConditionCode::InvalidCryptoType => "InvalidCryptoType",
            ConditionCode::DecryptError => "DecryptError",
            ConditionCode::DecryptFailure => "DecryptFailure",
            ConditionCode::EncryptError => "EncryptError",
            ConditionCode::ScryptError => "ScryptError",
            ConditionCode::AccountAlreadyExists => "AccountAlreadyExists",
            ConditionCode::AccountDoesNotExist => "AccountDoesNotExist",
            ConditionCode::JsonError => "JSONError",
            ConditionCode::BadPassword => "BadPassword",
            ConditionCode::WalletAlreadyExists => "WalletAlreadyExists",
            ConditionCode::UrlError => "URLError",
            ConditionCode::SysError => "SysError",
            ConditionCode::NotInitialized => "NotInitialized",
            ConditionCode::Reinitialization => "Reinitialization",
            ConditionCode::ServerError => "ServerError",
            ConditionCode::NoRecoveryQuestions => "NoRecoveryQuestions",
            ConditionCode::NotSupported => "NotSupported",
            ConditionCode::MutexError => "MutexError",
            ConditionCode::NoTransaction => "NoTransaction",
            ConditionCode::EmptyWallet => "EmptyWallet",
            ConditionCode::ParseError => "ParseError",
            ConditionCode::InvalidWalletId => "InvalidWalletID",
            ConditionCode::NoRequest => "NoRequest",
            ConditionCode::InsufficientFunds => "InsufficientFunds",
            ConditionCode::Synchronizing => "Synchronizing",
            ConditionCode::NonNumericPin => "NonNumericPin",
            ConditionCode::NoAvailableAddress => "NoAvailableAddress",
            ConditionCode::InvalidPinWait => "InvalidPinWait",
            ConditionCode::PinExpired => "PinExpired",
            ConditionCode::InvalidOtp => "InvalidOTP",
            ConditionCode::SpendDust => "SpendDust",
            ConditionCode::Obsolete => "Obsolete",
        }
    }

    /// Look up a code by its integer value.
    pub fn from_code(code: i32) -> Option<Self> {
        BY_CODE.get(&code).copied()
    }

    /// Look up a code by symbolic name.
    ///
    /// Accepts both the bare name (`BadPassword`) and the prefixed form
    /// (`ABCConditionCodeBadPassword`). Matching ignores ASCII case, so
    /// `InvalidOTP` and `InvalidOtp` resolve to the same code.
    pub fn from_name(name: &str) -> Option<Self> {
        let bare = name.strip_prefix(SYMBOLIC_PREFIX).unwrap_or(name);
        BY_NAME.get(bare).copied().or_else(|| {
            ALL.iter()
                .find(|c| c.name().eq_ignore_ascii_case(bare))
                .copied()
        })
    }

    /// Family this code belongs to.
    pub fn family(&self) -> ConditionFamily {
        use ConditionCode::*;
        match self {
            NotInitialized | Reinitialization => ConditionFamily::Initialization,
            AccountAlreadyExists | AccountDoesNotExist | BadPassword | InvalidOtp
            | NonNumericPin | InvalidPinWait | PinExpired | NoRecoveryQuestions => {
                ConditionFamily::Credential
            }
            NoAvailAccountSpace | DirReadError | FileOpenError | FileReadError
            | FileWriteError | FileDoesNotExist => ConditionFamily::Storage,
            UnknownCryptoType | InvalidCryptoType | DecryptError | DecryptFailure
            | EncryptError | ScryptError => ConditionFamily::Crypto,
            JsonError | ParseError => ConditionFamily::Protocol,
            UrlError | ServerError | Obsolete => ConditionFamily::Network,
            WalletAlreadyExists | NoTransaction | EmptyWallet | InvalidWalletId | NoRequest
            | InsufficientFunds | Synchronizing | NoAvailableAddress | SpendDust => {
                ConditionFamily::Domain
            }
            Ok | Error | NullPtr | SysError | NotSupported | MutexError => {
                ConditionFamily::General
            }
        }
    }

    /// Short English description for logs and fallback messages.
    pub fn description(&self) -> &'static str {
        use ConditionCode::*;
        match self {
            Ok => "The function completed without an error",
            Error => "An error occurred",
            NullPtr => "Unexpected NULL pointer",
            NoAvailAccountSpace => "Max number of accounts have been created",
            DirReadError => "Could not read directory",
            FileOpenError => "Could not open file",
            FileReadError => "Could not read from file",
            FileWriteError => "Could not write to file",
            FileDoesNotExist => "No such file",
            UnknownCryptoType => "Unknown crypto type",
            InvalidCryptoType => "Invalid crypto type",
            DecryptError => "Decryption error",
            DecryptFailure => "Decryption failure due to incorrect key",
            EncryptError => "Encryption error",
            ScryptError => "Scrypt error",
            AccountAlreadyExists => "Account already exists",
            AccountDoesNotExist => "Account does not exist",
            JsonError => "JSON parsing error",
            BadPassword => "Incorrect password",
            WalletAlreadyExists => "Wallet already exists",
            UrlError => "URL call failure",
            SysError => "An call to an external API failed",
            NotInitialized => "No required initialization made",
            Reinitialization => "Initialization after already initializing",
            ServerError => "Server error",
            NoRecoveryQuestions => "The user has not set recovery questions",
            NotSupported => "Functionality not supported",
            MutexError => "Mutex error if some type",
            NoTransaction => "Transaction not found",
            EmptyWallet => "The wallet has no funds",
            ParseError => "Failed to parse input text",
            InvalidWalletId => "Invalid wallet ID",
            NoRequest => "Request (address) not found",
            InsufficientFunds => "Not enough money to send transaction",
            Synchronizing => "We are still sync-ing",
            NonNumericPin => "Problem with the PIN",
            NoAvailableAddress => "Unable to find an address",
            InvalidPinWait => "The user has entered a bad PIN, and must wait",
            PinExpired => "The PIN login has expired",
            InvalidOtp => "Two-factor authentication required",
            SpendDust => "Trying to send too little money",
            Obsolete => "The server says this app is obsolete and needs to be upgraded",
        }
    }
}

impl std::fmt::Display for ConditionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", SYMBOLIC_PREFIX, self.name())
    }
}

// ============================================================================
// TESTS
// ============================================================================
