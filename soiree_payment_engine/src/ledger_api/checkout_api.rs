//! Cart maintenance, the all-or-nothing checkout, and wishlist gifting.
use std::fmt::Debug;

use log::*;
use spe_common::MinorUnits;

use crate::{
    db_types::{CartItem, NewCartItem, WishlistContribution},
    events::{EventProducers, OrderPaidEvent, WalletCreditedEvent},
    traits::{CheckoutOutcome, LedgerError, PaymentLedgerDatabase},
};

/// `CheckoutApi` lets guests queue up payment intents (quotes to pay, cash gifts, promises) and
/// settle the lot in one atomic batch. A checkout either lands every item in the cart or none of
/// them.
pub struct CheckoutApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for CheckoutApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi")
    }
}

impl<B> CheckoutApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> CheckoutApi<B>
where B: PaymentLedgerDatabase
{
    /// Queues an intent to pay for the given quote.
    pub async fn add_quote_to_cart(&self, owner_id: &str, quote_id: i64) -> Result<CartItem, LedgerError> {
        let quote = self
            .db
            .fetch_quote(quote_id)
            .await
            .map_err(LedgerError::from)?
            .ok_or(LedgerError::QuoteNotFound(quote_id))?;
        if quote.client_id != owner_id {
            return Err(LedgerError::Unauthorized(format!("quote #{quote_id} was not issued to [{owner_id}]")));
        }
        let item = self.db.add_cart_item(NewCartItem::quote(owner_id, quote_id)).await?;
        debug!("🛒️ [{owner_id}] added quote #{quote_id} to their cart");
        Ok(item)
    }

    /// Queues an intent to gift `amount` in cash toward a wishlist item. The amount must be
    /// positive.
    pub async fn add_gift_to_cart(
        &self,
        owner_id: &str,
        wishlist_item_id: i64,
        host_id: &str,
        amount: MinorUnits,
    ) -> Result<CartItem, LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::ValidationError(format!("gift amount must be positive, got {amount}")));
        }
        if host_id == owner_id {
            return Err(LedgerError::ValidationError("you cannot gift cash to yourself".to_string()));
        }
        let item = self.db.add_cart_item(NewCartItem::cash_gift(owner_id, wishlist_item_id, host_id, amount)).await?;
        debug!("🛒️🎁️ [{owner_id}] added a {amount} gift for item #{wishlist_item_id} to their cart");
        Ok(item)
    }

    /// Queues a promise toward a wishlist item. Promises are free and always settle.
    pub async fn add_promise_to_cart(&self, owner_id: &str, wishlist_item_id: i64) -> Result<CartItem, LedgerError> {
        let item = self.db.add_cart_item(NewCartItem::promise(owner_id, wishlist_item_id)).await?;
        debug!("🛒️ [{owner_id}] added a promise for item #{wishlist_item_id} to their cart");
        Ok(item)
    }

    /// The owner's pending cart, oldest item first.
    pub async fn cart_items(&self, owner_id: &str) -> Result<Vec<CartItem>, LedgerError> {
        self.db.fetch_cart_items(owner_id).await.map_err(LedgerError::from)
    }

    /// Empties the owner's cart without settling anything. Returns the number of items removed.
    pub async fn clear_cart(&self, owner_id: &str) -> Result<u64, LedgerError> {
        self.db.clear_cart(owner_id).await
    }

    /// Settles every item in the owner's cart in a single atomic transaction.
    ///
    /// If the total cost exceeds the owner's available balance, or any single item fails
    /// validation, nothing settles and the cart is left intact. On success the cart is empty and
    /// the order-paid hook fires once per paid quote.
    pub async fn checkout(&self, owner_id: &str) -> Result<CheckoutOutcome, LedgerError> {
        let outcome = self.db.checkout(owner_id).await?;
        info!(
            "🛒️ [{owner_id}] checked out: {} orders paid, {} contributions, {} spent",
            outcome.paid_orders.len(),
            outcome.contributions.len(),
            outcome.total_spent
        );
        for order in &outcome.paid_orders {
            for emitter in &self.producers.order_paid_producer {
                emitter.publish_event(OrderPaidEvent::new(order.clone())).await;
            }
        }
        Ok(outcome)
    }

    /// A guest gifts cash directly into the wishlist host's wallet, outside of any cart.
    pub async fn contribute_cash(
        &self,
        wishlist_item_id: i64,
        host_id: &str,
        amount: MinorUnits,
        guest_id: &str,
    ) -> Result<WishlistContribution, LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::ValidationError(format!("gift amount must be positive, got {amount}")));
        }
        if host_id == guest_id {
            return Err(LedgerError::ValidationError("you cannot gift cash to yourself".to_string()));
        }
        let contribution = self.db.contribute_cash(wishlist_item_id, host_id, amount, guest_id).await?;
        debug!("🎁️ [{guest_id}] gifted {amount} toward item #{wishlist_item_id}");
        self.call_wallet_credited_hook(host_id, amount, &format!("gift:{}", contribution.id)).await;
        Ok(contribution)
    }

    /// Records a promise toward a wishlist item. No money moves.
    pub async fn record_promise(
        &self,
        wishlist_item_id: i64,
        guest_id: &str,
    ) -> Result<WishlistContribution, LedgerError> {
        let contribution = self.db.record_promise(wishlist_item_id, guest_id).await?;
        debug!("🎁️ [{guest_id}] promised a gift toward item #{wishlist_item_id}");
        Ok(contribution)
    }

    async fn call_wallet_credited_hook(&self, user_id: &str, amount: MinorUnits, reference: &str) {
        if self.producers.wallet_credited_producer.is_empty() {
            return;
        }
        match self.db.fetch_wallet(user_id).await {
            Ok(Some(wallet)) => {
                for emitter in &self.producers.wallet_credited_producer {
                    let event = WalletCreditedEvent {
                        wallet: wallet.clone(),
                        amount,
                        reference: reference.to_string(),
                    };
                    emitter.publish_event(event).await;
                }
            },
            Ok(None) => warn!("🎁️ Wallet for [{user_id}] vanished after being credited. Skipping hook."),
            Err(e) => warn!("🎁️ Could not fetch wallet for [{user_id}] to notify hooks: {e}"),
        }
    }
}
