//! Per-account application handlers.
//!
//! A [`CallbackSet`] is supplied at login and may be replaced wholesale with
//! [`Account::set_callbacks`](super::account::Account::set_callbacks). Every
//! handler is optional; unset handlers behave as no-ops.

use std::fmt;
use std::sync::Arc;

use super::account::Account;
use super::native::NativeEvent;
use super::wallet::{Transaction, Wallet};

/// Version of the callback-set shape.
pub const CALLBACK_SET_VERSION: u32 = 1;

/// Handler for account-scoped events.
pub type AccountHandler = Arc<dyn Fn(&Arc<Account>) + Send + Sync + 'static>;
/// Handler for wallet-scoped events.
pub type WalletHandler = Arc<dyn Fn(&Arc<Account>, &Wallet) + Send + Sync + 'static>;
/// Handler for incoming transactions.
pub type TransactionHandler =
    Arc<dyn Fn(&Arc<Account>, &Wallet, &Transaction) + Send + Sync + 'static>;

/// Application handlers, one per native event.
#[derive(Clone, Default)]
pub struct CallbackSet {
    account_changed: Option<AccountHandler>,
    remote_password_change: Option<AccountHandler>,
    otp_required: Option<AccountHandler>,
    otp_skew: Option<AccountHandler>,
    wallets_loading: Option<AccountHandler>,
    wallets_loaded: Option<AccountHandler>,
    wallets_changed: Option<AccountHandler>,
    block_height_changed: Option<AccountHandler>,
    wallet_loaded: Option<WalletHandler>,
    wallet_changed: Option<WalletHandler>,
    incoming_bitcoin: Option<TransactionHandler>,
}

macro_rules! setter {
    ($name:ident, $field:ident, $handler:ty, ($($arg:ty),+)) => {
        #[doc = concat!("Set the `", stringify!($field), "` handler.")]
        pub fn $name<F>(mut self, f: F) -> Self
        where
            F: Fn($($arg),+) + Send + Sync + 'static,
        {
            self.$field = Some(Arc::new(f) as $handler);
            self
        }
    };
}

impl CallbackSet {
    /// Empty set: every handler is a no-op.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shape version this set implements.
    pub fn version(&self) -> u32 {
        CALLBACK_SET_VERSION
    }

    setter!(on_account_changed, account_changed, AccountHandler, (&Arc<Account>));
    setter!(on_remote_password_change, remote_password_change, AccountHandler, (&Arc<Account>));
    setter!(on_otp_required, otp_required, AccountHandler, (&Arc<Account>));
    setter!(on_otp_skew, otp_skew, AccountHandler, (&Arc<Account>));
    setter!(on_wallets_loading, wallets_loading, AccountHandler, (&Arc<Account>));
    setter!(on_wallets_loaded, wallets_loaded, AccountHandler, (&Arc<Account>));
    setter!(on_wallets_changed, wallets_changed, AccountHandler, (&Arc<Account>));
    setter!(on_block_height_changed, block_height_changed, AccountHandler, (&Arc<Account>));
    setter!(on_wallet_loaded, wallet_loaded, WalletHandler, (&Arc<Account>, &Wallet));
    setter!(on_wallet_changed, wallet_changed, WalletHandler, (&Arc<Account>, &Wallet));
    setter!(
        on_incoming_bitcoin,
        incoming_bitcoin,
        TransactionHandler,
        (&Arc<Account>, &Wallet, &Transaction)
    );

    /// Whether a handler is registered for `event`.
    pub fn handles(&self, event: NativeEvent) -> bool {
        match event {
            NativeEvent::WalletLoaded => self.wallet_loaded.is_some(),
            NativeEvent::WalletChanged => self.wallet_changed.is_some(),
            NativeEvent::IncomingBitcoin => self.incoming_bitcoin.is_some(),
            other => self.account_handler(other).is_some(),
        }
    }

    pub(crate) fn account_handler(&self, event: NativeEvent) -> Option<&AccountHandler> {
        match event {
            NativeEvent::AccountChanged => self.account_changed.as_ref(),
            NativeEvent::RemotePasswordChange => self.remote_password_change.as_ref(),
            NativeEvent::OtpRequired => self.otp_required.as_ref(),
            NativeEvent::OtpSkew => self.otp_skew.as_ref(),
            NativeEvent::WalletsLoading => self.wallets_loading.as_ref(),
            NativeEvent::WalletsLoaded => self.wallets_loaded.as_ref(),
            NativeEvent::WalletsChanged => self.wallets_changed.as_ref(),
            NativeEvent::BlockHeightChanged => self.block_height_changed.as_ref(),
            _ => None,
        }
    }

    pub(crate) fn wallet_handler(&self, event: NativeEvent) -> Option<&WalletHandler> {
        match event {
            NativeEvent::WalletLoaded => self.wallet_loaded.as_ref(),
            NativeEvent::WalletChanged => self.wallet_changed.as_ref(),
            _ => None,
        }
    }

    pub(crate) fn transaction_handler(&self) -> Option<&TransactionHandler> {
        self.incoming_bitcoin.as_ref()
    }
}

impl fmt::Debug for CallbackSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let set: Vec<&str> = NativeEvent::ALL
            .iter()
            .filter(|e| self.handles(**e))
            .map(|e| e.as_str())
            .collect();
        f.debug_struct("CallbackSet")
            .field("version", &CALLBACK_SET_VERSION)
            .field("handlers", &set)
            .finish()
    }
}
