//! Backend contracts for the payment engine.
//!
//! This module defines the behaviour a store must expose in order to back the Soirée payment
//! engine.
//!
//! * [`PaymentLedgerDatabase`] defines the mutating flows: paying for quotes, releasing and
//!   refunding escrow, the all-or-nothing cart checkout, wishlist gifting and gateway settlement.
//!   It is the only path through which wallet balances change, and every mutation appends the
//!   matching ledger entries inside the same atomic unit of work.
//! * [`WalletManagement`] provides read views over wallets, ledger entries, quotes, orders,
//!   contributions and cart items. Reads always reflect the latest committed state; there is no
//!   cache in front of the store.
mod data_objects;
mod ledger_database;
mod wallet_management;

pub use data_objects::{CheckoutOutcome, FeePolicy, PaymentOutcome, RefundOutcome, SettlementOutcome, WalletHistory};
pub use ledger_database::{LedgerError, PaymentLedgerDatabase};
pub use wallet_management::{WalletApiError, WalletManagement};
