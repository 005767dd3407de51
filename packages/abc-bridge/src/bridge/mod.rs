//! # Bridge
//!
//! Facade objects over the native Airbitz Core module.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        BRIDGE ARCHITECTURE                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Application                                                            │
//! │      │  continuations                       ▲  callback sets            │
//! │      ▼                                      │                           │
//! │  ┌───────────────────────────┐   ┌──────────────────────────┐           │
//! │  │ Context │ Account │ Store │   │       EventRouter        │           │
//! │  └───────────────────────────┘   └──────────────────────────┘           │
//! │      │                 ▲                    ▲                           │
//! │      ▼                 │                    │ active account           │
//! │  ┌───────────────────────────┐   ┌──────────────────────────┐           │
//! │  │    NativeCallAdapter      │   │     SessionRegistry      │           │
//! │  │   (+ ErrorNormalizer)     │   │  context │ active acct   │           │
//! │  └───────────────────────────┘   └──────────────────────────┘           │
//! │      │                                      ▲                           │
//! │      ▼                                      │ broadcast events          │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          NativeModule          │       NativeEventEmitter       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Every continuation receives `Result<T, NormalizedError>`. Native errors in
//! any of their historical shapes pass through [`ErrorNormalizer`] first.

pub mod account;
pub mod adapter;
pub mod callbacks;
pub mod completion;
pub mod context;
pub mod datastore;
pub mod events;
pub mod native;
pub mod normalize;
pub mod session;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testing;

pub use account::Account;
pub use adapter::{CallResult, Completion, NativeCallAdapter};
pub use callbacks::{CallbackSet, CALLBACK_SET_VERSION};
pub use completion::resolve;
pub use context::Context;
pub use datastore::DataStore;
pub use events::{EventRouter, RouterOptions, RouterState};
pub use native::{
    NativeEvent, NativeEventEmitter, NativeEventHandler, NativeMethod, NativeModule,
    NativeResponse,
};
pub use normalize::{ErrorNormalizer, RawError};
pub use session::{ContextOptions, SessionRegistry};
pub use wallet::{BitIdSignature, OtpDetails, Transaction, Wallet};
