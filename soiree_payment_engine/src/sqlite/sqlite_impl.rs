//! `SqliteDatabase` is a concrete implementation of a Soirée payment engine store.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the
//! [`crate::traits`] module.
//!
//! Every money flow here follows the same shape: begin a transaction, make the compare-and-swap
//! status transition the first write, compose the low-level [`db`] helpers over that transaction,
//! and commit. An error anywhere drops the transaction and rolls the whole flow back, so no
//! caller can ever observe one side of a transfer without the other.
use std::fmt::Debug;

use log::*;
use spe_common::MinorUnits;
use sqlx::{SqliteConnection, SqlitePool};

use super::db::{carts, contributions, db_url, ledger, new_pool, orders, quotes, wallets};
use crate::{
    db_types::{
        CartItem,
        CartItemKind,
        ContributionKind,
        EntryKind,
        EntryStatus,
        LedgerEntry,
        NewCartItem,
        NewLedgerEntry,
        NewQuote,
        Order,
        OrderStatus,
        Quote,
        QuoteStatus,
        Wallet,
        WishlistContribution,
    },
    traits::{
        CheckoutOutcome,
        FeePolicy,
        LedgerError,
        PaymentLedgerDatabase,
        PaymentOutcome,
        RefundOutcome,
        SettlementOutcome,
        WalletApiError,
        WalletHistory,
        WalletManagement,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL from the environment.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Pays for a pending quote on the given connection. Embedding this in a transaction makes the
/// whole flow atomic; [`SqliteDatabase::checkout`] reuses it so a batch of quote payments shares
/// one transaction with the rest of the cart.
///
/// The quote CAS is the first statement, so of two racing payers exactly one proceeds past it.
async fn pay_quote_flow(
    quote_id: i64,
    payer: &str,
    conn: &mut SqliteConnection,
) -> Result<(Order, Wallet), LedgerError> {
    let quote = match quotes::transition_quote(quote_id, QuoteStatus::Pending, QuoteStatus::Accepted, &mut *conn)
        .await?
    {
        Some(quote) => quote,
        None => {
            return match quotes::fetch_quote(quote_id, &mut *conn).await? {
                Some(_) => Err(LedgerError::QuoteNotPending(quote_id)),
                None => Err(LedgerError::QuoteNotFound(quote_id)),
            };
        },
    };
    // Quotes are issued to a specific client. A failure here rolls the CAS back with the rest of
    // the transaction.
    if quote.client_id != payer {
        return Err(LedgerError::Unauthorized(format!("{payer} is not the client quote #{quote_id} was issued to")));
    }
    let payer_wallet = wallets::fetch_or_create_wallet(payer, &mut *conn).await?;
    if !wallets::debit_available(payer_wallet.id, quote.price, &mut *conn).await? {
        return Err(LedgerError::InsufficientFunds {
            required: quote.price,
            available: payer_wallet.available_balance,
        });
    }
    let order = orders::insert_order(&quote, &mut *conn).await?;
    let payment = NewLedgerEntry::debit(payer_wallet.id, quote.price, EntryKind::Payment, EntryStatus::Completed)
        .for_order(order.id)
        .with_description(format!("Payment for quote #{quote_id}"));
    ledger::insert_entry(payment, &mut *conn).await?;
    let vendor_wallet = wallets::fetch_or_create_wallet(&quote.vendor_id, &mut *conn).await?;
    wallets::credit_active(vendor_wallet.id, quote.price, &mut *conn).await?;
    let hold = NewLedgerEntry::credit(vendor_wallet.id, quote.price, EntryKind::EscrowHold, EntryStatus::Held)
        .for_order(order.id)
        .with_description(format!("Escrow hold for quote #{quote_id}"));
    ledger::insert_entry(hold, &mut *conn).await?;
    let payer_wallet = wallets::wallet_by_id(payer_wallet.id, &mut *conn)
        .await?
        .ok_or_else(|| LedgerError::DatabaseError(format!("Wallet #{} vanished mid-transaction", payer_wallet.id)))?;
    debug!("📦️ Quote #{quote_id} paid. Order #{} is active with {} in escrow.", order.id, order.escrow_amount);
    Ok((order, payer_wallet))
}

/// Moves a cash gift from the guest to the wishlist host's available balance and appends the
/// contribution record. No escrow: there is no deliverable to confirm.
async fn cash_gift_flow(
    wishlist_item_id: i64,
    host_id: &str,
    amount: MinorUnits,
    guest_id: &str,
    conn: &mut SqliteConnection,
) -> Result<WishlistContribution, LedgerError> {
    let guest_wallet = wallets::fetch_or_create_wallet(guest_id, &mut *conn).await?;
    if !wallets::debit_available(guest_wallet.id, amount, &mut *conn).await? {
        return Err(LedgerError::InsufficientFunds { required: amount, available: guest_wallet.available_balance });
    }
    let gift_out = NewLedgerEntry::debit(guest_wallet.id, amount, EntryKind::Gift, EntryStatus::Completed)
        .with_description(format!("Cash gift toward wishlist item #{wishlist_item_id}"));
    ledger::insert_entry(gift_out, &mut *conn).await?;
    let host_wallet = wallets::fetch_or_create_wallet(host_id, &mut *conn).await?;
    wallets::credit_available(host_wallet.id, amount, &mut *conn).await?;
    let gift_in = NewLedgerEntry::credit(host_wallet.id, amount, EntryKind::Gift, EntryStatus::Completed)
        .with_description(format!("Cash gift received for wishlist item #{wishlist_item_id}"));
    ledger::insert_entry(gift_in, &mut *conn).await?;
    let contribution =
        contributions::insert_contribution(wishlist_item_id, guest_id, ContributionKind::Cash, amount, conn).await?;
    debug!("🎁️ {guest_id} gifted {amount} to {host_id} for wishlist item #{wishlist_item_id}");
    Ok(contribution)
}

impl PaymentLedgerDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn fetch_or_create_wallet(&self, user_id: &str) -> Result<Wallet, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let wallet = wallets::fetch_or_create_wallet(user_id, &mut conn).await?;
        Ok(wallet)
    }

    async fn insert_quote(&self, quote: NewQuote) -> Result<Quote, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        quotes::insert_quote(quote, &mut conn).await
    }

    async fn decline_quote(&self, quote_id: i64, caller: &str, new_status: QuoteStatus) -> Result<Quote, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let quote = match quotes::transition_quote(quote_id, QuoteStatus::Pending, new_status, &mut tx).await? {
            Some(quote) => quote,
            None => {
                return match quotes::fetch_quote(quote_id, &mut tx).await? {
                    Some(_) => Err(LedgerError::QuoteNotPending(quote_id)),
                    None => Err(LedgerError::QuoteNotFound(quote_id)),
                };
            },
        };
        if quote.client_id != caller {
            return Err(LedgerError::Unauthorized(format!(
                "{caller} is not the client quote #{quote_id} was issued to"
            )));
        }
        tx.commit().await?;
        debug!("💬️ Quote #{quote_id} moved to {new_status} by {caller}");
        Ok(quote)
    }

    async fn pay_for_quote(&self, quote_id: i64, payer: &str) -> Result<PaymentOutcome, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let (order, payer_wallet) = pay_quote_flow(quote_id, payer, &mut tx).await?;
        tx.commit().await?;
        Ok(PaymentOutcome { order, new_available_balance: payer_wallet.available_balance })
    }

    async fn complete_order(&self, order_id: i64, caller: &str, fees: &FeePolicy) -> Result<Order, LedgerError> {
        let mut tx = self.pool.begin().await?;
        // CAS first: of two concurrent completions exactly one sees the Active row.
        let order = match orders::transition_order(order_id, &[OrderStatus::Active], OrderStatus::Completed, &mut tx)
            .await?
        {
            Some(order) => order,
            None => {
                return match orders::fetch_order(order_id, &mut tx).await? {
                    Some(_) => Err(LedgerError::OrderNotActive(order_id)),
                    None => Err(LedgerError::OrderNotFound(order_id)),
                };
            },
        };
        if order.client_id != caller {
            return Err(LedgerError::Unauthorized(format!(
                "Only the order's client may confirm completion of order #{order_id}"
            )));
        }
        let vendor_wallet = wallets::wallet_for_user(&order.vendor_id, &mut tx)
            .await?
            .ok_or_else(|| LedgerError::WalletNotFound(order.vendor_id.clone()))?;
        if !wallets::debit_active(vendor_wallet.id, order.escrow_amount, &mut tx).await? {
            // The escrow balance no longer covers its own order. Roll back and flag it.
            return Err(LedgerError::DatabaseError(format!(
                "Escrow balance of wallet #{} cannot cover order #{order_id}",
                vendor_wallet.id
            )));
        }
        let fee = fees.fee_for(order.escrow_amount);
        let net = order.escrow_amount - fee;
        wallets::credit_available(vendor_wallet.id, net, &mut tx).await?;
        ledger::release_held_entry(order.id, &mut tx).await?;
        if fee.is_positive() {
            let payout = NewLedgerEntry::debit(vendor_wallet.id, fee, EntryKind::Payout, EntryStatus::Completed)
                .for_order(order.id)
                .with_description(format!("Platform service fee ({} bps)", fees.basis_points()));
            ledger::insert_entry(payout, &mut tx).await?;
        }
        tx.commit().await?;
        debug!("📦️ Order #{order_id} completed. {net} released to {} ({fee} fee).", order.vendor_id);
        Ok(order)
    }

    async fn dispute_order(&self, order_id: i64, caller: &str) -> Result<Order, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let order = match orders::transition_order(order_id, &[OrderStatus::Active], OrderStatus::InDispute, &mut tx)
            .await?
        {
            Some(order) => order,
            None => {
                return match orders::fetch_order(order_id, &mut tx).await? {
                    Some(_) => Err(LedgerError::OrderNotActive(order_id)),
                    None => Err(LedgerError::OrderNotFound(order_id)),
                };
            },
        };
        if order.client_id != caller && order.vendor_id != caller {
            return Err(LedgerError::Unauthorized(format!("{caller} is not a party to order #{order_id}")));
        }
        tx.commit().await?;
        info!("📦️ Order #{order_id} flagged as disputed by {caller}. Escrow stays put until resolution.");
        Ok(order)
    }

    async fn refund_order(&self, order_id: i64) -> Result<RefundOutcome, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let order = match orders::transition_order(
            order_id,
            &[OrderStatus::Active, OrderStatus::InDispute],
            OrderStatus::Cancelled,
            &mut tx,
        )
        .await?
        {
            Some(order) => order,
            None => {
                return match orders::fetch_order(order_id, &mut tx).await? {
                    Some(_) => Err(LedgerError::OrderNotActive(order_id)),
                    None => Err(LedgerError::OrderNotFound(order_id)),
                };
            },
        };
        let amount = order.escrow_amount;
        let vendor_wallet = wallets::wallet_for_user(&order.vendor_id, &mut tx)
            .await?
            .ok_or_else(|| LedgerError::WalletNotFound(order.vendor_id.clone()))?;
        if !wallets::debit_active(vendor_wallet.id, amount, &mut tx).await? {
            return Err(LedgerError::DatabaseError(format!(
                "Escrow balance of wallet #{} cannot cover refund of order #{order_id}",
                vendor_wallet.id
            )));
        }
        let payer_wallet = wallets::wallet_for_user(&order.client_id, &mut tx)
            .await?
            .ok_or_else(|| LedgerError::WalletNotFound(order.client_id.clone()))?;
        wallets::credit_available(payer_wallet.id, amount, &mut tx).await?;
        ledger::fail_held_entry(order.id, &mut tx).await?;
        let refund_out = NewLedgerEntry::debit(vendor_wallet.id, amount, EntryKind::Refund, EntryStatus::Completed)
            .for_order(order.id)
            .with_description(format!("Escrow refunded for order #{order_id}"));
        ledger::insert_entry(refund_out, &mut tx).await?;
        let refund_in = NewLedgerEntry::credit(payer_wallet.id, amount, EntryKind::Refund, EntryStatus::Completed)
            .for_order(order.id)
            .with_description(format!("Refund received for order #{order_id}"));
        ledger::insert_entry(refund_in, &mut tx).await?;
        tx.commit().await?;
        info!("📦️ Order #{order_id} cancelled. {amount} returned to {}.", order.client_id);
        Ok(RefundOutcome { order, refunded: amount })
    }

    async fn add_cart_item(&self, item: NewCartItem) -> Result<CartItem, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        carts::insert_item(item, &mut conn).await
    }

    async fn clear_cart(&self, owner_id: &str) -> Result<u64, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        carts::clear_for_owner(owner_id, &mut conn).await
    }

    async fn checkout(&self, owner_id: &str) -> Result<CheckoutOutcome, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let items = carts::items_for_owner(owner_id, &mut tx).await?;
        if items.is_empty() {
            return Err(LedgerError::ValidationError(format!("The cart for {owner_id} is empty")));
        }
        // Total first: an unaffordable cart must abort before any item is touched.
        let mut total = MinorUnits::default();
        for item in &items {
            match item.kind {
                CartItemKind::Quote => {
                    let quote_id = item
                        .quote_id
                        .ok_or_else(|| LedgerError::ValidationError(format!("Cart item #{} has no quote", item.id)))?;
                    let quote = quotes::fetch_quote(quote_id, &mut tx)
                        .await?
                        .ok_or(LedgerError::QuoteNotFound(quote_id))?;
                    total = total + quote.price;
                },
                CartItemKind::CashGift => {
                    let amount = item.amount.ok_or_else(|| {
                        LedgerError::ValidationError(format!("Cart item #{} has no gift amount", item.id))
                    })?;
                    total = total + amount;
                },
                CartItemKind::Promise => {},
            }
        }
        let wallet = wallets::fetch_or_create_wallet(owner_id, &mut tx).await?;
        if wallet.available_balance < total {
            return Err(LedgerError::InsufficientFunds { required: total, available: wallet.available_balance });
        }
        trace!("🛒️ Checkout for {owner_id}: {} items totalling {total}", items.len());
        let mut outcome = CheckoutOutcome { total_spent: total, ..Default::default() };
        for item in items {
            match item.kind {
                CartItemKind::Quote => {
                    let quote_id = item
                        .quote_id
                        .ok_or_else(|| LedgerError::ValidationError(format!("Cart item #{} has no quote", item.id)))?;
                    let (order, _) = pay_quote_flow(quote_id, owner_id, &mut tx).await?;
                    outcome.paid_orders.push(order);
                },
                CartItemKind::CashGift => {
                    let (item_id, host_id, amount) = match (item.wishlist_item_id, item.host_id.as_deref(), item.amount)
                    {
                        (Some(i), Some(h), Some(a)) => (i, h, a),
                        _ => {
                            return Err(LedgerError::ValidationError(format!(
                                "Cart item #{} is missing gift details",
                                item.id
                            )));
                        },
                    };
                    let contribution = cash_gift_flow(item_id, host_id, amount, owner_id, &mut tx).await?;
                    outcome.contributions.push(contribution);
                },
                CartItemKind::Promise => {
                    let item_id = item.wishlist_item_id.ok_or_else(|| {
                        LedgerError::ValidationError(format!("Cart item #{} has no wishlist item", item.id))
                    })?;
                    let contribution = contributions::insert_contribution(
                        item_id,
                        owner_id,
                        ContributionKind::Promise,
                        MinorUnits::default(),
                        &mut tx,
                    )
                    .await?;
                    outcome.contributions.push(contribution);
                },
            }
        }
        // Clearing the cart rides in the same transaction: items disappear only if everything
        // above committed.
        carts::clear_for_owner(owner_id, &mut tx).await?;
        tx.commit().await?;
        debug!(
            "🛒️ Checkout for {owner_id} committed: {} orders paid, {} contributions, {total} spent",
            outcome.paid_orders.len(),
            outcome.contributions.len()
        );
        Ok(outcome)
    }

    async fn contribute_cash(
        &self,
        wishlist_item_id: i64,
        host_id: &str,
        amount: MinorUnits,
        guest_id: &str,
    ) -> Result<WishlistContribution, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let contribution = cash_gift_flow(wishlist_item_id, host_id, amount, guest_id, &mut tx).await?;
        tx.commit().await?;
        Ok(contribution)
    }

    async fn record_promise(
        &self,
        wishlist_item_id: i64,
        guest_id: &str,
    ) -> Result<WishlistContribution, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let contribution = contributions::insert_contribution(
            wishlist_item_id,
            guest_id,
            ContributionKind::Promise,
            MinorUnits::default(),
            &mut conn,
        )
        .await?;
        Ok(contribution)
    }

    async fn apply_gateway_credit(
        &self,
        reference: &str,
        amount: MinorUnits,
        user_id: &str,
    ) -> Result<SettlementOutcome, LedgerError> {
        let mut tx = self.pool.begin().await?;
        if ledger::entry_for_reference(reference, &mut tx).await?.is_some() {
            debug!("🏦️ Settlement reference {reference} already applied. Nothing to do.");
            let wallet = wallets::fetch_or_create_wallet(user_id, &mut tx).await?;
            tx.commit().await?;
            return Ok(SettlementOutcome { credited: false, wallet });
        }
        let wallet = wallets::fetch_or_create_wallet(user_id, &mut tx).await?;
        wallets::credit_available(wallet.id, amount, &mut tx).await?;
        // The unique index on reference backstops any writer that raced past the check above.
        let entry = NewLedgerEntry::credit(wallet.id, amount, EntryKind::Payment, EntryStatus::Completed)
            .with_reference(reference)
            .with_description(format!("Gateway settlement {reference}"));
        ledger::insert_entry(entry, &mut tx).await?;
        let wallet = wallets::wallet_by_id(wallet.id, &mut tx)
            .await?
            .ok_or_else(|| LedgerError::DatabaseError(format!("Wallet for {user_id} vanished mid-transaction")))?;
        tx.commit().await?;
        debug!("🏦️ Settlement {reference} credited {amount} to {user_id}");
        Ok(SettlementOutcome { credited: true, wallet })
    }

    async fn close(&mut self) -> Result<(), LedgerError> {
        self.pool.close().await;
        Ok(())
    }
}

impl WalletManagement for SqliteDatabase {
    async fn fetch_wallet(&self, user_id: &str) -> Result<Option<Wallet>, WalletApiError> {
        let mut conn = self.pool.acquire().await?;
        wallets::wallet_for_user(user_id, &mut conn).await
    }

    async fn fetch_wallet_by_id(&self, wallet_id: i64) -> Result<Option<Wallet>, WalletApiError> {
        let mut conn = self.pool.acquire().await?;
        wallets::wallet_by_id(wallet_id, &mut conn).await
    }

    async fn history_for_user(&self, user_id: &str) -> Result<Option<WalletHistory>, WalletApiError> {
        let mut conn = self.pool.acquire().await?;
        let Some(wallet) = wallets::wallet_for_user(user_id, &mut conn).await? else {
            return Ok(None);
        };
        let entries = ledger::entries_for_wallet(wallet.id, &mut conn).await?;
        Ok(Some(WalletHistory::new(wallet).with_entries(entries)))
    }

    async fn entries_for_order(&self, order_id: i64) -> Result<Vec<LedgerEntry>, WalletApiError> {
        let mut conn = self.pool.acquire().await?;
        ledger::entries_for_order(order_id, &mut conn).await
    }

    async fn fetch_quote(&self, quote_id: i64) -> Result<Option<Quote>, WalletApiError> {
        let mut conn = self.pool.acquire().await?;
        quotes::fetch_quote(quote_id, &mut conn).await
    }

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, WalletApiError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order(order_id, &mut conn).await
    }

    async fn fetch_order_for_quote(&self, quote_id: i64) -> Result<Option<Order>, WalletApiError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_quote(quote_id, &mut conn).await
    }

    async fn contributions_for_item(
        &self,
        wishlist_item_id: i64,
    ) -> Result<Vec<WishlistContribution>, WalletApiError> {
        let mut conn = self.pool.acquire().await?;
        contributions::contributions_for_item(wishlist_item_id, &mut conn).await
    }

    async fn fetch_cart_items(&self, owner_id: &str) -> Result<Vec<CartItem>, WalletApiError> {
        let mut conn = self.pool.acquire().await?;
        carts::items_for_owner(owner_id, &mut conn).await
    }
}
