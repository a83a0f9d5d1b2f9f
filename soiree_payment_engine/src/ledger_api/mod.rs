//! # Soirée payment engine public API
//!
//! The `ledger_api` module exposes the programmatic API for the payment engine. The API is
//! modular, so that clients can pick and choose the functionality they want, or run different
//! parts (e.g. settlement webhooks and the checkout surface) on different machines.
//!
//! * [`escrow_api`] covers the quote payment lifecycle: paying for a quote, confirming an order
//!   complete, disputes and refunds.
//! * [`checkout_api`] handles cart maintenance, the all-or-nothing cart checkout, and wishlist
//!   cash gifts and promises.
//! * [`settlement_api`] applies verified external gateway credits to wallets, exactly once per
//!   reference.
//! * [`wallet_api`] provides the read-only views: wallets, ledger statements and per-order entry
//!   sets.
//!
//! # API usage
//!
//! The pattern for using all the APIs is the same. An API instance is created by supplying a
//! database backend that implements the specific backend traits required by the API.
//!
//! ```rust,ignore
//! use soiree_payment_engine::{SqliteDatabase, WalletApi};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! // SqliteDatabase implements WalletManagement
//! let api = WalletApi::new(db);
//! let history = api.history_for_user("alice").await?;
//! ```

pub mod checkout_api;
pub mod escrow_api;
pub mod settlement_api;
pub mod wallet_api;

pub use checkout_api::CheckoutApi;
pub use escrow_api::EscrowApi;
pub use settlement_api::SettlementApi;
pub use wallet_api::WalletApi;
