//! Data types for records persisted by the payment engine.
//!
//! These types map 1:1 onto rows in the backing store. They are deliberately dumb: all state
//! transitions and balance arithmetic live behind the [`crate::traits::PaymentLedgerDatabase`]
//! trait so that no caller can mutate a wallet without the matching ledger entry.
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

pub use spe_common::MinorUnits;

#[derive(Debug, Clone, Error)]
#[error("Invalid status value: {0}")]
pub struct ConversionError(String);

//--------------------------------------      Wallet        ----------------------------------------------------------
/// A user's wallet. One per user, created lazily on first use.
///
/// `available_balance` is spendable now. `active_order_balance` holds vendor earnings in escrow
/// for orders that have not been confirmed complete. Both are non-negative at all times.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Wallet {
    pub id: i64,
    pub user_id: String,
    pub available_balance: MinorUnits,
    pub active_order_balance: MinorUnits,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------    EntryKind       ----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum EntryKind {
    /// A direct debit against a payer, or a gateway credit into a wallet.
    Payment,
    /// Vendor earnings entering escrow when a quote is paid.
    EscrowHold,
    /// Escrowed earnings released to the vendor's available balance.
    EscrowRelease,
    /// A cash gift into a wishlist host's wallet.
    Gift,
    /// A generic wallet-to-wallet movement.
    Transfer,
    /// A deduction leaving the ledger (e.g. the platform service fee).
    Payout,
    /// Escrowed funds returned to the payer after a cancellation or dispute.
    Refund,
}

impl Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EntryKind::Payment => "Payment",
            EntryKind::EscrowHold => "EscrowHold",
            EntryKind::EscrowRelease => "EscrowRelease",
            EntryKind::Gift => "Gift",
            EntryKind::Transfer => "Transfer",
            EntryKind::Payout => "Payout",
            EntryKind::Refund => "Refund",
        };
        write!(f, "{s}")
    }
}

impl FromStr for EntryKind {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Payment" => Ok(Self::Payment),
            "EscrowHold" => Ok(Self::EscrowHold),
            "EscrowRelease" => Ok(Self::EscrowRelease),
            "Gift" => Ok(Self::Gift),
            "Transfer" => Ok(Self::Transfer),
            "Payout" => Ok(Self::Payout),
            "Refund" => Ok(Self::Refund),
            s => Err(ConversionError(format!("Invalid entry kind: {s}"))),
        }
    }
}

//--------------------------------------   EntryStatus      ----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum EntryStatus {
    /// Recorded but not yet settled.
    Pending,
    /// Settled into the escrow side of a wallet; not yet spendable.
    Held,
    /// Fully settled.
    Completed,
    /// The entry will never settle. Held entries move here when the order is refunded.
    Failed,
}

impl Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EntryStatus::Pending => "Pending",
            EntryStatus::Held => "Held",
            EntryStatus::Completed => "Completed",
            EntryStatus::Failed => "Failed",
        };
        write!(f, "{s}")
    }
}

impl FromStr for EntryStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Held" => Ok(Self::Held),
            "Completed" => Ok(Self::Completed),
            "Failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid entry status: {s}"))),
        }
    }
}

//--------------------------------------   LedgerEntry      ----------------------------------------------------------
/// An immutable, append-only ledger record. Negative amounts are debits, positive are credits.
///
/// Every balance mutation writes one entry per affected wallet side, in the same transaction as
/// the mutation itself, so the entries for any order always net to the money that actually moved.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub wallet_id: i64,
    pub order_id: Option<i64>,
    pub kind: EntryKind,
    pub amount: MinorUnits,
    pub status: EntryStatus,
    /// External settlement reference. Unique across the ledger when present.
    pub reference: Option<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------  NewLedgerEntry    ----------------------------------------------------------
/// A ledger entry waiting to be appended.
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub wallet_id: i64,
    pub order_id: Option<i64>,
    pub kind: EntryKind,
    pub amount: MinorUnits,
    pub status: EntryStatus,
    pub reference: Option<String>,
    pub description: String,
}

impl NewLedgerEntry {
    /// A credit of `amount` into the wallet. The amount must be non-negative.
    pub fn credit(wallet_id: i64, amount: MinorUnits, kind: EntryKind, status: EntryStatus) -> Self {
        Self { wallet_id, order_id: None, kind, amount, status, reference: None, description: String::new() }
    }

    /// A debit of `amount` against the wallet. The stored amount is negated.
    pub fn debit(wallet_id: i64, amount: MinorUnits, kind: EntryKind, status: EntryStatus) -> Self {
        Self { wallet_id, order_id: None, kind, amount: -amount, status, reference: None, description: String::new() }
    }

    pub fn for_order(mut self, order_id: i64) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_reference<S: Into<String>>(mut self, reference: S) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }
}

//--------------------------------------   QuoteStatus      ----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum QuoteStatus {
    /// Issued by the vendor; awaiting the client's decision.
    Pending,
    /// Paid for. Only a successful payment reaches this state.
    Accepted,
    /// Declined by the client.
    Rejected,
    /// The client has asked the vendor for changes.
    RevisionRequested,
}

impl Display for QuoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            QuoteStatus::Pending => "Pending",
            QuoteStatus::Accepted => "Accepted",
            QuoteStatus::Rejected => "Rejected",
            QuoteStatus::RevisionRequested => "RevisionRequested",
        };
        write!(f, "{s}")
    }
}

impl FromStr for QuoteStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Accepted" => Ok(Self::Accepted),
            "Rejected" => Ok(Self::Rejected),
            "RevisionRequested" => Ok(Self::RevisionRequested),
            s => Err(ConversionError(format!("Invalid quote status: {s}"))),
        }
    }
}

//--------------------------------------      Quote         ----------------------------------------------------------
/// A vendor's priced proposal to a specific client, convertible to an order on payment.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quote {
    pub id: i64,
    pub vendor_id: String,
    pub client_id: String,
    pub price: MinorUnits,
    pub description: Option<String>,
    pub status: QuoteStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------     NewQuote       ----------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewQuote {
    pub vendor_id: String,
    pub client_id: String,
    pub price: MinorUnits,
    pub description: Option<String>,
}

impl NewQuote {
    pub fn new<S1: Into<String>, S2: Into<String>>(vendor_id: S1, client_id: S2, price: MinorUnits) -> Self {
        Self { vendor_id: vendor_id.into(), client_id: client_id.into(), price, description: None }
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }
}

//--------------------------------------   OrderStatus      ----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatus {
    /// The order is underway and owns the escrowed amount.
    Active,
    /// The client has confirmed delivery and the escrow has been released.
    Completed,
    /// The order was cancelled and the escrow refunded.
    Cancelled,
    /// A party has raised a dispute. Escrow stays put until resolution.
    InDispute,
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Active => "Active",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::InDispute => "InDispute",
        };
        write!(f, "{s}")
    }
}

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(Self::Active),
            "Completed" => Ok(Self::Completed),
            "Cancelled" => Ok(Self::Cancelled),
            "InDispute" => Ok(Self::InDispute),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------      Order         ----------------------------------------------------------
/// The contractual record created when a quote is paid for. Exactly one order per accepted quote.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub quote_id: i64,
    pub client_id: String,
    pub vendor_id: String,
    /// The amount held in the vendor's active-order balance while the order is `Active`.
    pub escrow_amount: MinorUnits,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//-------------------------------------- ContributionKind   ----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum ContributionKind {
    /// A commitment record only. No money moves.
    Promise,
    /// Money moved directly into the host's available balance. No escrow.
    Cash,
}

impl Display for ContributionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContributionKind::Promise => write!(f, "Promise"),
            ContributionKind::Cash => write!(f, "Cash"),
        }
    }
}

impl FromStr for ContributionKind {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Promise" => Ok(Self::Promise),
            "Cash" => Ok(Self::Cash),
            s => Err(ConversionError(format!("Invalid contribution kind: {s}"))),
        }
    }
}

//-------------------------------------- WishlistContribution --------------------------------------------------------
/// A guest's promise or cash gift toward an event wishlist item.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WishlistContribution {
    pub id: i64,
    pub wishlist_item_id: i64,
    pub guest_id: String,
    pub kind: ContributionKind,
    /// Zero for promises.
    pub amount: MinorUnits,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------  CartItemKind      ----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum CartItemKind {
    Quote,
    CashGift,
    Promise,
}

impl Display for CartItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CartItemKind::Quote => write!(f, "Quote"),
            CartItemKind::CashGift => write!(f, "CashGift"),
            CartItemKind::Promise => write!(f, "Promise"),
        }
    }
}

impl FromStr for CartItemKind {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Quote" => Ok(Self::Quote),
            "CashGift" => Ok(Self::CashGift),
            "Promise" => Ok(Self::Promise),
            s => Err(ConversionError(format!("Invalid cart item kind: {s}"))),
        }
    }
}

//--------------------------------------    CartItem        ----------------------------------------------------------
/// A queued, not-yet-committed intent. Exists only between creation and a successful or aborted
/// checkout, and is never partially consumed.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CartItem {
    pub id: i64,
    pub owner_id: String,
    pub kind: CartItemKind,
    /// Set for `Quote` items.
    pub quote_id: Option<i64>,
    /// Set for `CashGift` and `Promise` items.
    pub wishlist_item_id: Option<i64>,
    /// The wishlist host's user id, set for `CashGift` items.
    pub host_id: Option<String>,
    /// The gift amount, set for `CashGift` items.
    pub amount: Option<MinorUnits>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------   NewCartItem      ----------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewCartItem {
    pub owner_id: String,
    pub kind: CartItemKind,
    pub quote_id: Option<i64>,
    pub wishlist_item_id: Option<i64>,
    pub host_id: Option<String>,
    pub amount: Option<MinorUnits>,
}

impl NewCartItem {
    /// An intent to pay for the given quote.
    pub fn quote<S: Into<String>>(owner_id: S, quote_id: i64) -> Self {
        Self {
            owner_id: owner_id.into(),
            kind: CartItemKind::Quote,
            quote_id: Some(quote_id),
            wishlist_item_id: None,
            host_id: None,
            amount: None,
        }
    }

    /// An intent to gift `amount` in cash toward the host's wishlist item.
    pub fn cash_gift<S1: Into<String>, S2: Into<String>>(
        owner_id: S1,
        wishlist_item_id: i64,
        host_id: S2,
        amount: MinorUnits,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            kind: CartItemKind::CashGift,
            quote_id: None,
            wishlist_item_id: Some(wishlist_item_id),
            host_id: Some(host_id.into()),
            amount: Some(amount),
        }
    }

    /// An intent to promise (no money moves) toward the wishlist item.
    pub fn promise<S: Into<String>>(owner_id: S, wishlist_item_id: i64) -> Self {
        Self {
            owner_id: owner_id.into(),
            kind: CartItemKind::Promise,
            quote_id: None,
            wishlist_item_id: Some(wishlist_item_id),
            host_id: None,
            amount: None,
        }
    }
}
