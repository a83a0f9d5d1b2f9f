//! The quote payment and escrow lifecycle.
use std::fmt::Debug;

use log::*;
use spe_common::MinorUnits;

use crate::{
    db_types::{NewQuote, Order, Quote, QuoteStatus},
    events::{EventProducers, OrderCompletedEvent, OrderPaidEvent},
    traits::{FeePolicy, LedgerError, PaymentLedgerDatabase, PaymentOutcome, RefundOutcome},
};

/// `EscrowApi` is the primary API for moving money between wallets. Paying for a quote debits the
/// payer and holds the price in escrow against the vendor; confirming the order complete releases
/// the escrow (minus the service fee); a refund returns it to the payer.
pub struct EscrowApi<B> {
    db: B,
    producers: EventProducers,
    fees: FeePolicy,
}

impl<B> Debug for EscrowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EscrowApi")
    }
}

impl<B> EscrowApi<B> {
    pub fn new(db: B, producers: EventProducers, fees: FeePolicy) -> Self {
        Self { db, producers, fees }
    }

    pub fn fee_policy(&self) -> &FeePolicy {
        &self.fees
    }
}

impl<B> EscrowApi<B>
where B: PaymentLedgerDatabase
{
    /// Submits a new vendor quote in `Pending` status. The price must be positive.
    pub async fn create_quote(&self, quote: NewQuote) -> Result<Quote, LedgerError> {
        if !quote.price.is_positive() {
            return Err(LedgerError::ValidationError(format!("quote price must be positive, got {}", quote.price)));
        }
        if quote.vendor_id == quote.client_id {
            return Err(LedgerError::ValidationError("a vendor cannot quote themselves".to_string()));
        }
        let quote = self.db.insert_quote(quote).await?;
        debug!("💼️🧾️ Quote #{} created for client [{}]", quote.id, quote.client_id);
        Ok(quote)
    }

    /// The client declines a pending quote. No money moves.
    pub async fn reject_quote(&self, quote_id: i64, caller: &str) -> Result<Quote, LedgerError> {
        self.db.decline_quote(quote_id, caller, QuoteStatus::Rejected).await
    }

    /// The client sends a pending quote back to the vendor for revision. No money moves.
    pub async fn request_revision(&self, quote_id: i64, caller: &str) -> Result<Quote, LedgerError> {
        self.db.decline_quote(quote_id, caller, QuoteStatus::RevisionRequested).await
    }

    /// Pays for a pending quote on behalf of `payer`, who must be the quote's client.
    ///
    /// On success the quote is `Accepted`, an `Active` order exists, the payer's available balance
    /// is down by the price and the vendor's active-order balance is up by it. The order-paid hook
    /// fires after the transaction commits.
    pub async fn pay_for_quote(&self, quote_id: i64, payer: &str) -> Result<PaymentOutcome, LedgerError> {
        let outcome = self.db.pay_for_quote(quote_id, payer).await?;
        debug!(
            "💼️🧾️ Quote #{quote_id} paid by [{payer}]. Order #{} is active, {} left in the wallet",
            outcome.order.id, outcome.new_available_balance
        );
        self.call_order_paid_hook(&outcome.order).await;
        Ok(outcome)
    }

    /// The client confirms the order complete, releasing the escrow to the vendor minus the
    /// service fee. The order-completed hook fires after the transaction commits.
    pub async fn complete_order(&self, order_id: i64, caller: &str) -> Result<Order, LedgerError> {
        let order = self.db.complete_order(order_id, caller, &self.fees).await?;
        debug!("💼️📦️ Order #{order_id} completed. {} released to vendor [{}]", order.escrow_amount, order.vendor_id);
        self.call_order_completed_hook(&order).await;
        Ok(order)
    }

    /// Either party flags the order as disputed. The escrow stays put until resolution.
    pub async fn dispute_order(&self, order_id: i64, caller: &str) -> Result<Order, LedgerError> {
        let order = self.db.dispute_order(order_id, caller).await?;
        info!("💼️⚖️ Order #{order_id} flagged as disputed by [{caller}]");
        Ok(order)
    }

    /// Cancels an active or disputed order and returns the escrowed amount to the payer.
    pub async fn refund_order(&self, order_id: i64) -> Result<RefundOutcome, LedgerError> {
        let outcome = self.db.refund_order(order_id).await?;
        info!("💼️💸️ Order #{order_id} refunded. {} returned to [{}]", outcome.refunded, outcome.order.client_id);
        Ok(outcome)
    }

    /// The fee the platform would take if an order of the given value completed now.
    pub fn projected_fee(&self, amount: MinorUnits) -> MinorUnits {
        self.fees.fee_for(amount)
    }

    async fn call_order_paid_hook(&self, order: &Order) {
        for emitter in &self.producers.order_paid_producer {
            trace!("💼️📦️ Notifying order paid hook subscribers");
            let event = OrderPaidEvent::new(order.clone());
            emitter.publish_event(event).await;
        }
    }

    async fn call_order_completed_hook(&self, order: &Order) {
        for emitter in &self.producers.order_completed_producer {
            trace!("💼️📦️ Notifying order completed hook subscribers");
            let event = OrderCompletedEvent::new(order.clone());
            emitter.publish_event(event).await;
        }
    }
}
