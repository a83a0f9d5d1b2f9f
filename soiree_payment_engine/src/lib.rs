//! Soirée Payment Engine
//!
//! The payment core of the Soirée event marketplace: it moves money between user wallets when a
//! vendor quote is paid, holds vendor earnings in escrow until the client confirms the order
//! complete, settles verified payment-gateway credits into wallets exactly once per reference, and
//! supports direct cash gifting into an event wishlist.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@sqlite`]). You should never need to access the
//!    database directly. Instead, use the public API provided by the engine. The exception is the
//!    data types used in the database, which are defined in the `db_types` module and are public.
//! 2. The engine public API ([`mod@ledger_api`]). This provides the public-facing functionality:
//!    escrow, checkout, gateway settlement and wallet views. Specific backends need to implement
//!    the traits in the [`mod@traits`] module in order to act as a store for the engine.
//!
//! The engine also provides a set of events that can be subscribed to. These events are emitted
//! when certain actions occur, for example when an order is paid for. A simple actor framework is
//! used so that you can hook into these events and perform custom actions.
pub mod db_types;
pub mod events;
mod ledger_api;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::{db_url, new_pool, SqliteDatabase};
pub use traits::{LedgerError, PaymentLedgerDatabase, WalletApiError, WalletManagement};

pub use ledger_api::{CheckoutApi, EscrowApi, SettlementApi, WalletApi};
