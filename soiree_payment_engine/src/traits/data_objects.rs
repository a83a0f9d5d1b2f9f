//! Result objects returned by the mutating flows, plus the service-fee policy.
use std::env;

use log::info;
use serde::{Deserialize, Serialize};
use spe_common::MinorUnits;

use crate::db_types::{LedgerEntry, Order, Wallet, WishlistContribution};

/// The result of successfully paying for a quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentOutcome {
    pub order: Order,
    /// The payer's available balance after the debit.
    pub new_available_balance: MinorUnits,
}

/// The result of a committed cart checkout. Either every intent in the cart landed, or the
/// checkout failed and none of them did; there is no partial variant of this type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutOutcome {
    pub paid_orders: Vec<Order>,
    pub contributions: Vec<WishlistContribution>,
    pub total_spent: MinorUnits,
}

/// The result of refunding an escrowed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundOutcome {
    pub order: Order,
    pub refunded: MinorUnits,
}

/// The result of applying a gateway settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementOutcome {
    /// False when the reference had already been applied (duplicate webhook delivery).
    pub credited: bool,
    pub wallet: Wallet,
}

/// A wallet plus its ledger statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletHistory {
    pub wallet: Wallet,
    pub entries: Vec<LedgerEntry>,
}

impl WalletHistory {
    pub fn new(wallet: Wallet) -> Self {
        Self { wallet, entries: Vec::new() }
    }

    pub fn with_entries(mut self, entries: Vec<LedgerEntry>) -> Self {
        self.entries = entries;
        self
    }
}

const FEE_BPS_ENV: &str = "SPE_SERVICE_FEE_BPS";

/// The platform service fee deducted from the vendor's earnings when escrow is released.
///
/// The fee policy is an external input: basis points of the escrowed amount, floor zero, applied
/// at release time. The default is no fee.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePolicy {
    basis_points: u16,
}

impl FeePolicy {
    pub fn new(basis_points: u16) -> Self {
        Self { basis_points }
    }

    /// Reads the fee from `SPE_SERVICE_FEE_BPS`. Unset or unparseable values mean no fee.
    pub fn from_env() -> Self {
        let basis_points = env::var(FEE_BPS_ENV).ok().and_then(|v| v.trim().parse::<u16>().ok()).unwrap_or_else(|| {
            info!("{FEE_BPS_ENV} is not set. No service fee will be charged.");
            0
        });
        Self { basis_points }
    }

    pub fn basis_points(&self) -> u16 {
        self.basis_points
    }

    /// The fee owed on the given amount, rounded down to the nearest minor unit.
    pub fn fee_for(&self, amount: MinorUnits) -> MinorUnits {
        MinorUnits::from(amount.value() * i64::from(self.basis_points) / 10_000)
    }
}
