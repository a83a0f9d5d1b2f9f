use serde::{Deserialize, Serialize};
use spe_common::MinorUnits;

use crate::db_types::{Order, Wallet};

/// A quote has been paid for and its order is active, with the price held in escrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// An order has been confirmed complete and its escrow released to the vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCompletedEvent {
    pub order: Order,
}

impl OrderCompletedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// An external gateway settlement has credited a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletCreditedEvent {
    pub wallet: Wallet,
    pub amount: MinorUnits,
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    OrderPaid(OrderPaidEvent),
    OrderCompleted(OrderCompletedEvent),
    WalletCredited(WalletCreditedEvent),
}
