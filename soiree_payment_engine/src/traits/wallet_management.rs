use thiserror::Error;

use crate::{
    db_types::{CartItem, LedgerEntry, Order, Quote, Wallet, WishlistContribution},
    traits::WalletHistory,
};

#[derive(Debug, Clone, Error)]
pub enum WalletApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("User error constructing query: {0}")]
    QueryError(String),
}

impl From<sqlx::Error> for WalletApiError {
    fn from(e: sqlx::Error) -> Self {
        WalletApiError::DatabaseError(e.to_string())
    }
}

/// Read views over the ledger store.
///
/// The mutating machinery lives in [`crate::traits::PaymentLedgerDatabase`]; `WalletManagement`
/// only answers questions. Every method reads the latest committed state.
#[allow(async_fn_in_trait)]
pub trait WalletManagement {
    /// Fetches the wallet for the given user. If the user has never touched money, `None` is
    /// returned.
    async fn fetch_wallet(&self, user_id: &str) -> Result<Option<Wallet>, WalletApiError>;

    async fn fetch_wallet_by_id(&self, wallet_id: i64) -> Result<Option<Wallet>, WalletApiError>;

    /// The wallet together with its full ledger statement, newest entry last.
    async fn history_for_user(&self, user_id: &str) -> Result<Option<WalletHistory>, WalletApiError>;

    /// All ledger entries recorded against the given order, across both wallets involved.
    async fn entries_for_order(&self, order_id: i64) -> Result<Vec<LedgerEntry>, WalletApiError>;

    async fn fetch_quote(&self, quote_id: i64) -> Result<Option<Quote>, WalletApiError>;

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, WalletApiError>;

    /// The order spawned by the given quote, if it has been paid for. Quotes map to at most one
    /// order.
    async fn fetch_order_for_quote(&self, quote_id: i64) -> Result<Option<Order>, WalletApiError>;

    async fn contributions_for_item(&self, wishlist_item_id: i64)
        -> Result<Vec<WishlistContribution>, WalletApiError>;

    /// The payer's pending cart intents, oldest first.
    async fn fetch_cart_items(&self, owner_id: &str) -> Result<Vec<CartItem>, WalletApiError>;
}
