use spe_common::MinorUnits;
use thiserror::Error;

use crate::{
    db_types::{CartItem, NewCartItem, NewQuote, Order, Quote, QuoteStatus, Wallet, WishlistContribution},
    traits::{
        data_objects::{CheckoutOutcome, FeePolicy, PaymentOutcome, RefundOutcome, SettlementOutcome},
        WalletApiError,
        WalletManagement,
    },
};

/// This trait defines the highest level of behaviour for stores backing the Soirée payment engine.
///
/// This behaviour includes:
/// * Atomic get-or-create of wallets, keyed on the user id uniqueness constraint.
/// * The quote payment / escrow hold / release / refund lifecycle.
/// * The all-or-nothing cart checkout.
/// * Wishlist cash gifting and promise records.
/// * Idempotent settlement of external gateway credits.
///
/// Every mutating method runs as a single short-lived atomic transaction: either all of its
/// balance updates and ledger entries commit, or none do. Status transitions are
/// compare-and-swaps inside the same transaction as the balance mutation, never a separate read
/// followed by a write.
#[allow(async_fn_in_trait)]
pub trait PaymentLedgerDatabase: Clone + WalletManagement {
    /// The URL of the store.
    fn url(&self) -> &str;

    /// Fetches the wallet for the user, creating an empty one if it does not exist. The
    /// get-or-create is atomic on the `user_id` uniqueness constraint.
    async fn fetch_or_create_wallet(&self, user_id: &str) -> Result<Wallet, LedgerError>;

    /// Stores a new quote in `Pending` status.
    async fn insert_quote(&self, quote: NewQuote) -> Result<Quote, LedgerError>;

    /// Moves a pending quote to `Rejected` or `RevisionRequested`. No money moves. The caller
    /// must be the quote's client. Fails with [`LedgerError::QuoteNotPending`] if the quote has
    /// already been resolved.
    async fn decline_quote(&self, quote_id: i64, caller: &str, new_status: QuoteStatus) -> Result<Quote, LedgerError>;

    /// Pays for a pending quote. In a single atomic transaction:
    /// * the quote status is compare-and-swapped from `Pending` to `Accepted`;
    /// * the payer's available balance is debited by the price (`Payment`, `Completed`);
    /// * the vendor's active-order balance is credited by the price (`EscrowHold`, `Held`);
    /// * the order is created in `Active` status.
    ///
    /// Fails with `InsufficientFunds` or `QuoteNotPending` with no side effects.
    async fn pay_for_quote(&self, quote_id: i64, payer: &str) -> Result<PaymentOutcome, LedgerError>;

    /// Confirms an order complete and releases its escrow. Only the order's client may call.
    /// In a single atomic transaction:
    /// * the order status is compare-and-swapped from `Active` to `Completed`;
    /// * the held amount moves from the vendor's active-order balance to their available balance,
    ///   minus the service fee dictated by `fees`;
    /// * the matching `Held` entry flips to `EscrowRelease` / `Completed`;
    /// * a non-zero fee is recorded as a `Payout` debit entry.
    ///
    /// A second call on the same order observes the completed order and fails with
    /// [`LedgerError::OrderNotActive`], balances untouched.
    async fn complete_order(&self, order_id: i64, caller: &str, fees: &FeePolicy) -> Result<Order, LedgerError>;

    /// Flags an active order as disputed. Either party to the order may call. No money moves;
    /// the escrow stays put until resolution.
    async fn dispute_order(&self, order_id: i64, caller: &str) -> Result<Order, LedgerError>;

    /// Resolves an `Active` or `InDispute` order by returning the escrowed amount to the payer.
    /// The order is compare-and-swapped to `Cancelled`, so an escrowed order resolves to exactly
    /// one terminal state: released or refunded, never both.
    async fn refund_order(&self, order_id: i64) -> Result<RefundOutcome, LedgerError>;

    /// Queues a cart intent for later checkout. Returns the stored item.
    async fn add_cart_item(&self, item: NewCartItem) -> Result<CartItem, LedgerError>;

    /// Removes all pending cart items for the owner. Returns the number removed.
    async fn clear_cart(&self, owner_id: &str) -> Result<u64, LedgerError>;

    /// Settles every pending cart item for the payer inside ONE atomic transaction.
    ///
    /// The total cost (quote prices plus cash-gift amounts; promises are free) is validated
    /// against the payer's available balance up front; an unaffordable cart aborts before any
    /// item is touched. Quote items run the same flow as [`Self::pay_for_quote`]; cash gifts
    /// debit the payer and credit the wishlist host directly (`Gift`, no escrow); promises append
    /// a contribution record only. Cart items are cleared in the same transaction. If any single
    /// item fails validation, the entire batch rolls back and no balance changes.
    async fn checkout(&self, owner_id: &str) -> Result<CheckoutOutcome, LedgerError>;

    /// A guest gifts cash directly into the wishlist host's available balance. No escrow, since
    /// there is no deliverable to confirm.
    async fn contribute_cash(
        &self,
        wishlist_item_id: i64,
        host_id: &str,
        amount: MinorUnits,
        guest_id: &str,
    ) -> Result<WishlistContribution, LedgerError>;

    /// Records a promise toward a wishlist item. Purely a commitment record; no money moves.
    async fn record_promise(&self, wishlist_item_id: i64, guest_id: &str)
        -> Result<WishlistContribution, LedgerError>;

    /// Credits a wallet with a verified external gateway payment, exactly once per `reference`.
    /// Re-applying a reference is a no-op (`credited: false`). This method only ever credits.
    async fn apply_gateway_credit(
        &self,
        reference: &str,
        amount: MinorUnits,
        user_id: &str,
    ) -> Result<SettlementOutcome, LedgerError>;

    /// Closes the store connection.
    async fn close(&mut self) -> Result<(), LedgerError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("{0}")]
    WalletError(#[from] WalletApiError),
    #[error("Invalid request: {0}")]
    ValidationError(String),
    #[error("Not permitted: {0}")]
    Unauthorized(String),
    #[error("Insufficient funds: {required} required but only {available} available")]
    InsufficientFunds { required: MinorUnits, available: MinorUnits },
    #[error("Quote {0} does not exist")]
    QuoteNotFound(i64),
    #[error("Quote {0} has already been resolved")]
    QuoteNotPending(i64),
    #[error("Order {0} does not exist")]
    OrderNotFound(i64),
    #[error("Order {0} is not in a state that allows this transition")]
    OrderNotActive(i64),
    #[error("No wallet exists for user {0}")]
    WalletNotFound(String),
    #[error("Settlement reference {0} has already been applied")]
    DuplicateReference(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}

impl LedgerError {
    /// True for the terminal-conflict family: the caller must correct the condition before any
    /// retry can succeed. The engine never retries these itself.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            LedgerError::InsufficientFunds { .. }
                | LedgerError::QuoteNotPending(_)
                | LedgerError::OrderNotActive(_)
                | LedgerError::DuplicateReference(_)
        )
    }
}
