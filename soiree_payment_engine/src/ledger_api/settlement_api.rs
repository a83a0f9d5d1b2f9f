//! Applies verified external gateway credits to wallets.
use std::fmt::Debug;

use log::*;
use spe_common::MinorUnits;

use crate::{
    events::{EventProducers, WalletCreditedEvent},
    traits::{LedgerError, PaymentLedgerDatabase, SettlementOutcome},
};

/// `SettlementApi` is the bridge between the external payment gateway and the ledger. It is called
/// once the gateway has *verified* a payment; all it does is credit the user's wallet, exactly
/// once per gateway reference no matter how many times the webhook is delivered.
pub struct SettlementApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for SettlementApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementApi")
    }
}

impl<B> SettlementApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> SettlementApi<B>
where B: PaymentLedgerDatabase
{
    /// Credits `user_id`'s wallet with a verified gateway payment.
    ///
    /// The reference must be non-empty and the amount positive. A reference that has already been
    /// applied is a no-op (`credited: false`); only a first-time application fires the
    /// wallet-credited hook.
    pub async fn apply_gateway_credit(
        &self,
        reference: &str,
        amount: MinorUnits,
        user_id: &str,
    ) -> Result<SettlementOutcome, LedgerError> {
        if reference.trim().is_empty() {
            return Err(LedgerError::ValidationError("settlement reference must not be empty".to_string()));
        }
        if !amount.is_positive() {
            return Err(LedgerError::ValidationError(format!("settlement amount must be positive, got {amount}")));
        }
        let outcome = self.db.apply_gateway_credit(reference, amount, user_id).await?;
        if outcome.credited {
            info!("🏦️ Settlement [{reference}] credited {amount} to [{user_id}]");
            self.call_wallet_credited_hook(&outcome, amount, reference).await;
        } else {
            debug!("🏦️ Settlement [{reference}] has already been applied. Ignoring.");
        }
        Ok(outcome)
    }

    async fn call_wallet_credited_hook(&self, outcome: &SettlementOutcome, amount: MinorUnits, reference: &str) {
        for emitter in &self.producers.wallet_credited_producer {
            trace!("🏦️ Notifying wallet credited hook subscribers");
            let event = WalletCreditedEvent {
                wallet: outcome.wallet.clone(),
                amount,
                reference: reference.to_string(),
            };
            emitter.publish_event(event).await;
        }
    }
}
