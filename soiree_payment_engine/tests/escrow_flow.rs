//! The quote payment / escrow / release / refund lifecycle, end to end against a real SQLite
//! store.
mod support;

use soiree_payment_engine::{
    db_types::{EntryKind, EntryStatus, NewQuote, OrderStatus, QuoteStatus},
    events::EventProducers,
    traits::FeePolicy,
    EscrowApi,
    LedgerError,
    SqliteDatabase,
    WalletApi,
    WalletManagement,
};
use spe_common::MinorUnits;
use support::{fund_wallet, new_store};

fn escrow_api(db: &SqliteDatabase) -> EscrowApi<SqliteDatabase> {
    EscrowApi::new(db.clone(), EventProducers::default(), FeePolicy::default())
}

#[tokio::test]
async fn pay_hold_and_release() {
    let db = new_store().await;
    fund_wallet(&db, "alice", 10_000).await;
    let api = escrow_api(&db);

    let quote = api.create_quote(NewQuote::new("vera", "alice", MinorUnits::from(6_000))).await.unwrap();
    assert_eq!(quote.status, QuoteStatus::Pending);

    let outcome = api.pay_for_quote(quote.id, "alice").await.unwrap();
    assert_eq!(outcome.new_available_balance, MinorUnits::from(4_000));
    assert_eq!(outcome.order.status, OrderStatus::Active);
    assert_eq!(outcome.order.escrow_amount, MinorUnits::from(6_000));

    // The price sits in the vendor's active-order balance, not their spendable funds.
    let vera = db.fetch_wallet("vera").await.unwrap().unwrap();
    assert_eq!(vera.available_balance, MinorUnits::from(0));
    assert_eq!(vera.active_order_balance, MinorUnits::from(6_000));

    let order = api.complete_order(outcome.order.id, "alice").await.unwrap();
    assert_eq!(order.vendor_id, "vera");
    let vera = db.fetch_wallet("vera").await.unwrap().unwrap();
    assert_eq!(vera.available_balance, MinorUnits::from(6_000));
    assert_eq!(vera.active_order_balance, MinorUnits::from(0));

    // The release flipped the hold entry rather than adding a correction pair.
    let wallets = WalletApi::new(db);
    let spawned = wallets.order_for_quote(quote.id).await.unwrap().unwrap();
    assert_eq!(spawned.id, order.id);
    let entries = wallets.entries_for_order(order.id).await.unwrap();
    assert!(entries
        .iter()
        .any(|e| e.kind == EntryKind::EscrowRelease && e.status == EntryStatus::Completed));
    let net: MinorUnits = entries.iter().map(|e| e.amount).sum();
    assert_eq!(net, MinorUnits::from(0));
}

#[tokio::test]
async fn insufficient_funds_leaves_no_trace() {
    let db = new_store().await;
    fund_wallet(&db, "alice", 1_000).await;
    let api = escrow_api(&db);

    let quote = api.create_quote(NewQuote::new("vera", "alice", MinorUnits::from(5_000))).await.unwrap();
    let err = api.pay_for_quote(quote.id, "alice").await.unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
    assert!(err.is_conflict());

    // The whole transaction rolled back: quote still pending, no vendor wallet side effects.
    let quote = db.fetch_quote(quote.id).await.unwrap().unwrap();
    assert_eq!(quote.status, QuoteStatus::Pending);
    let alice = db.fetch_wallet("alice").await.unwrap().unwrap();
    assert_eq!(alice.available_balance, MinorUnits::from(1_000));
    assert!(db.fetch_wallet("vera").await.unwrap().is_none());
}

#[tokio::test]
async fn only_the_quoted_client_may_pay() {
    let db = new_store().await;
    fund_wallet(&db, "mallory", 10_000).await;
    let api = escrow_api(&db);

    let quote = api.create_quote(NewQuote::new("vera", "alice", MinorUnits::from(2_000))).await.unwrap();
    let err = api.pay_for_quote(quote.id, "mallory").await.unwrap_err();
    assert!(matches!(err, LedgerError::Unauthorized(_)));

    // The rejected payment must also roll back the status CAS.
    let quote = db.fetch_quote(quote.id).await.unwrap().unwrap();
    assert_eq!(quote.status, QuoteStatus::Pending);
    let mallory = db.fetch_wallet("mallory").await.unwrap().unwrap();
    assert_eq!(mallory.available_balance, MinorUnits::from(10_000));
}

#[tokio::test]
async fn resolved_quotes_cannot_be_paid() {
    let db = new_store().await;
    fund_wallet(&db, "alice", 10_000).await;
    let api = escrow_api(&db);

    let quote = api.create_quote(NewQuote::new("vera", "alice", MinorUnits::from(2_000))).await.unwrap();
    let rejected = api.reject_quote(quote.id, "alice").await.unwrap();
    assert_eq!(rejected.status, QuoteStatus::Rejected);

    let err = api.pay_for_quote(quote.id, "alice").await.unwrap_err();
    assert!(matches!(err, LedgerError::QuoteNotPending(_)));

    let err = api.pay_for_quote(9_999, "alice").await.unwrap_err();
    assert!(matches!(err, LedgerError::QuoteNotFound(9_999)));
}

#[tokio::test]
async fn revision_request_keeps_money_still() {
    let db = new_store().await;
    let api = escrow_api(&db);

    let quote = api.create_quote(NewQuote::new("vera", "alice", MinorUnits::from(2_000))).await.unwrap();
    let quote = api.request_revision(quote.id, "alice").await.unwrap();
    assert_eq!(quote.status, QuoteStatus::RevisionRequested);
    assert!(db.fetch_wallet("alice").await.unwrap().is_none());
    assert!(db.fetch_wallet("vera").await.unwrap().is_none());
}

#[tokio::test]
async fn double_completion_is_a_conflict() {
    let db = new_store().await;
    fund_wallet(&db, "alice", 10_000).await;
    let api = escrow_api(&db);

    let quote = api.create_quote(NewQuote::new("vera", "alice", MinorUnits::from(4_000))).await.unwrap();
    let outcome = api.pay_for_quote(quote.id, "alice").await.unwrap();
    api.complete_order(outcome.order.id, "alice").await.unwrap();

    let err = api.complete_order(outcome.order.id, "alice").await.unwrap_err();
    assert!(matches!(err, LedgerError::OrderNotActive(_)));
    assert!(err.is_conflict());

    // Balances were not touched by the losing call.
    let vera = db.fetch_wallet("vera").await.unwrap().unwrap();
    assert_eq!(vera.available_balance, MinorUnits::from(4_000));
}

#[tokio::test]
async fn only_the_client_confirms_completion() {
    let db = new_store().await;
    fund_wallet(&db, "alice", 10_000).await;
    let api = escrow_api(&db);

    let quote = api.create_quote(NewQuote::new("vera", "alice", MinorUnits::from(4_000))).await.unwrap();
    let outcome = api.pay_for_quote(quote.id, "alice").await.unwrap();

    // Not even the vendor can release their own escrow.
    let err = api.complete_order(outcome.order.id, "vera").await.unwrap_err();
    assert!(matches!(err, LedgerError::Unauthorized(_)));
    let order = db.fetch_order(outcome.order.id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Active);
    let vera = db.fetch_wallet("vera").await.unwrap().unwrap();
    assert_eq!(vera.active_order_balance, MinorUnits::from(4_000));
}

#[tokio::test]
async fn refund_returns_escrow_to_the_payer() {
    let db = new_store().await;
    fund_wallet(&db, "alice", 10_000).await;
    let api = escrow_api(&db);

    let quote = api.create_quote(NewQuote::new("vera", "alice", MinorUnits::from(7_000))).await.unwrap();
    let outcome = api.pay_for_quote(quote.id, "alice").await.unwrap();

    let disputed = api.dispute_order(outcome.order.id, "vera").await.unwrap();
    assert_eq!(disputed.status, OrderStatus::InDispute);

    let refund = api.refund_order(outcome.order.id).await.unwrap();
    assert_eq!(refund.refunded, MinorUnits::from(7_000));

    let alice = db.fetch_wallet("alice").await.unwrap().unwrap();
    assert_eq!(alice.available_balance, MinorUnits::from(10_000));
    let vera = db.fetch_wallet("vera").await.unwrap().unwrap();
    assert_eq!(vera.available_balance, MinorUnits::from(0));
    assert_eq!(vera.active_order_balance, MinorUnits::from(0));

    // A refunded order cannot subsequently be completed.
    let err = api.complete_order(outcome.order.id, "alice").await.unwrap_err();
    assert!(matches!(err, LedgerError::OrderNotActive(_)));

    let wallets = WalletApi::new(db);
    let entries = wallets.entries_for_order(outcome.order.id).await.unwrap();
    assert!(entries.iter().any(|e| e.kind == EntryKind::EscrowHold && e.status == EntryStatus::Failed));
    // The refund pair cancels both the payment and the hold, so the order still nets to zero.
    let net: MinorUnits = entries.iter().map(|e| e.amount).sum();
    assert_eq!(net, MinorUnits::from(0));
}

#[tokio::test]
async fn service_fee_is_deducted_at_release() {
    let db = new_store().await;
    fund_wallet(&db, "alice", 10_000).await;
    // 2.5% platform fee
    let api = EscrowApi::new(db.clone(), EventProducers::default(), FeePolicy::new(250));

    let quote = api.create_quote(NewQuote::new("vera", "alice", MinorUnits::from(10_000))).await.unwrap();
    assert_eq!(api.projected_fee(quote.price), MinorUnits::from(250));
    let outcome = api.pay_for_quote(quote.id, "alice").await.unwrap();
    api.complete_order(outcome.order.id, "alice").await.unwrap();

    let vera = db.fetch_wallet("vera").await.unwrap().unwrap();
    assert_eq!(vera.available_balance, MinorUnits::from(9_750));
    assert_eq!(vera.active_order_balance, MinorUnits::from(0));

    let wallets = WalletApi::new(db);
    let entries = wallets.entries_for_order(outcome.order.id).await.unwrap();
    let payout = entries.iter().find(|e| e.kind == EntryKind::Payout).expect("No payout entry");
    assert_eq!(payout.amount, MinorUnits::from(-250));
}

#[tokio::test]
async fn quote_validation() {
    let db = new_store().await;
    let api = escrow_api(&db);

    let err = api.create_quote(NewQuote::new("vera", "alice", MinorUnits::from(0))).await.unwrap_err();
    assert!(matches!(err, LedgerError::ValidationError(_)));
    let err = api.create_quote(NewQuote::new("vera", "vera", MinorUnits::from(100))).await.unwrap_err();
    assert!(matches!(err, LedgerError::ValidationError(_)));
    let err = api.reject_quote(1, "mallory").await.unwrap_err();
    assert!(matches!(err, LedgerError::QuoteNotFound(1)));
}
