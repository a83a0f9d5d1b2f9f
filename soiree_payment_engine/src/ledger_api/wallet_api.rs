//! Unified read-only views over wallets and the ledger.
use std::fmt::Debug;

use crate::{
    db_types::{LedgerEntry, Order, Quote, Wallet, WishlistContribution},
    traits::{WalletApiError, WalletHistory, WalletManagement},
};

/// The `WalletApi` answers questions; it never moves money.
pub struct WalletApi<B> {
    db: B,
}

impl<B: Debug> Debug for WalletApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WalletApi ({:?})", self.db)
    }
}

impl<B> WalletApi<B>
where B: WalletManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Fetches the wallet for the given user. Users who have never touched money have no wallet.
    pub async fn wallet_for_user(&self, user_id: &str) -> Result<Option<Wallet>, WalletApiError> {
        self.db.fetch_wallet(user_id).await
    }

    pub async fn wallet_by_id(&self, wallet_id: i64) -> Result<Option<Wallet>, WalletApiError> {
        self.db.fetch_wallet_by_id(wallet_id).await
    }

    /// The wallet and its full ledger statement, newest entry last.
    pub async fn history_for_user(&self, user_id: &str) -> Result<Option<WalletHistory>, WalletApiError> {
        self.db.history_for_user(user_id).await
    }

    /// Every ledger entry recorded against the given order, across both wallets involved. For a
    /// completed or refunded order the entries net to zero.
    pub async fn entries_for_order(&self, order_id: i64) -> Result<Vec<LedgerEntry>, WalletApiError> {
        self.db.entries_for_order(order_id).await
    }

    pub async fn quote(&self, quote_id: i64) -> Result<Option<Quote>, WalletApiError> {
        self.db.fetch_quote(quote_id).await
    }

    pub async fn order(&self, order_id: i64) -> Result<Option<Order>, WalletApiError> {
        self.db.fetch_order(order_id).await
    }

    /// The order a paid quote turned into, if any.
    pub async fn order_for_quote(&self, quote_id: i64) -> Result<Option<Order>, WalletApiError> {
        self.db.fetch_order_for_quote(quote_id).await
    }

    /// All gifts and promises recorded against a wishlist item, oldest first.
    pub async fn contributions_for_item(
        &self,
        wishlist_item_id: i64,
    ) -> Result<Vec<WishlistContribution>, WalletApiError> {
        self.db.contributions_for_item(wishlist_item_id).await
    }
}
