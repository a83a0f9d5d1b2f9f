//! Cart maintenance and the all-or-nothing checkout.
mod support;

use soiree_payment_engine::{
    db_types::{ContributionKind, NewQuote, OrderStatus, QuoteStatus},
    events::EventProducers,
    traits::FeePolicy,
    CheckoutApi,
    EscrowApi,
    LedgerError,
    SqliteDatabase,
    WalletManagement,
};
use spe_common::MinorUnits;
use support::{fund_wallet, new_store};

fn apis(db: &SqliteDatabase) -> (EscrowApi<SqliteDatabase>, CheckoutApi<SqliteDatabase>) {
    let escrow = EscrowApi::new(db.clone(), EventProducers::default(), FeePolicy::default());
    let checkout = CheckoutApi::new(db.clone(), EventProducers::default());
    (escrow, checkout)
}

#[tokio::test]
async fn mixed_cart_settles_in_one_batch() {
    let db = new_store().await;
    fund_wallet(&db, "gina", 10_000).await;
    let (escrow, checkout) = apis(&db);

    let flowers = escrow.create_quote(NewQuote::new("vera", "gina", MinorUnits::from(3_000))).await.unwrap();
    let catering = escrow.create_quote(NewQuote::new("carlos", "gina", MinorUnits::from(4_500))).await.unwrap();
    checkout.add_quote_to_cart("gina", flowers.id).await.unwrap();
    checkout.add_quote_to_cart("gina", catering.id).await.unwrap();
    checkout.add_gift_to_cart("gina", 77, "heidi", MinorUnits::from(1_500)).await.unwrap();
    checkout.add_promise_to_cart("gina", 78).await.unwrap();
    assert_eq!(checkout.cart_items("gina").await.unwrap().len(), 4);

    let outcome = checkout.checkout("gina").await.unwrap();
    assert_eq!(outcome.paid_orders.len(), 2);
    assert_eq!(outcome.contributions.len(), 2);
    assert_eq!(outcome.total_spent, MinorUnits::from(9_000));
    assert!(outcome.paid_orders.iter().all(|o| o.status == OrderStatus::Active));

    let gina = db.fetch_wallet("gina").await.unwrap().unwrap();
    assert_eq!(gina.available_balance, MinorUnits::from(1_000));
    // Gifts land directly in the host's spendable balance, there is nothing to confirm.
    let heidi = db.fetch_wallet("heidi").await.unwrap().unwrap();
    assert_eq!(heidi.available_balance, MinorUnits::from(1_500));
    assert_eq!(heidi.active_order_balance, MinorUnits::from(0));
    // Both vendors hold their price in escrow.
    let vera = db.fetch_wallet("vera").await.unwrap().unwrap();
    assert_eq!(vera.active_order_balance, MinorUnits::from(3_000));
    let carlos = db.fetch_wallet("carlos").await.unwrap().unwrap();
    assert_eq!(carlos.active_order_balance, MinorUnits::from(4_500));

    let promises: Vec<_> = db.contributions_for_item(78).await.unwrap();
    assert_eq!(promises.len(), 1);
    assert_eq!(promises[0].kind, ContributionKind::Promise);
    assert_eq!(promises[0].amount, MinorUnits::from(0));

    assert!(checkout.cart_items("gina").await.unwrap().is_empty());
}

#[tokio::test]
async fn one_bad_item_rolls_back_the_whole_cart() {
    let db = new_store().await;
    fund_wallet(&db, "gina", 10_000).await;
    let (escrow, checkout) = apis(&db);

    let flowers = escrow.create_quote(NewQuote::new("vera", "gina", MinorUnits::from(3_000))).await.unwrap();
    let catering = escrow.create_quote(NewQuote::new("carlos", "gina", MinorUnits::from(4_500))).await.unwrap();
    checkout.add_quote_to_cart("gina", flowers.id).await.unwrap();
    checkout.add_quote_to_cart("gina", catering.id).await.unwrap();
    // The catering quote gets withdrawn between carting and checkout.
    escrow.reject_quote(catering.id, "gina").await.unwrap();

    let err = checkout.checkout("gina").await.unwrap_err();
    assert!(matches!(err, LedgerError::QuoteNotPending(_)));

    // Nothing settled: balance intact, first quote still pending, cart untouched.
    let gina = db.fetch_wallet("gina").await.unwrap().unwrap();
    assert_eq!(gina.available_balance, MinorUnits::from(10_000));
    let flowers = db.fetch_quote(flowers.id).await.unwrap().unwrap();
    assert_eq!(flowers.status, QuoteStatus::Pending);
    assert!(db.fetch_wallet("vera").await.unwrap().is_none());
    assert_eq!(checkout.cart_items("gina").await.unwrap().len(), 2);
}

#[tokio::test]
async fn unaffordable_cart_aborts_before_touching_anything() {
    let db = new_store().await;
    fund_wallet(&db, "gina", 5_000).await;
    let (escrow, checkout) = apis(&db);

    let flowers = escrow.create_quote(NewQuote::new("vera", "gina", MinorUnits::from(3_000))).await.unwrap();
    checkout.add_quote_to_cart("gina", flowers.id).await.unwrap();
    checkout.add_gift_to_cart("gina", 77, "heidi", MinorUnits::from(2_500)).await.unwrap();

    let err = checkout.checkout("gina").await.unwrap_err();
    let LedgerError::InsufficientFunds { required, available } = err else {
        panic!("Expected InsufficientFunds, got {err}");
    };
    assert_eq!(required, MinorUnits::from(5_500));
    assert_eq!(available, MinorUnits::from(5_000));

    let flowers = db.fetch_quote(flowers.id).await.unwrap().unwrap();
    assert_eq!(flowers.status, QuoteStatus::Pending);
    assert_eq!(checkout.cart_items("gina").await.unwrap().len(), 2);
}

#[tokio::test]
async fn empty_cart_checkout_is_an_error() {
    let db = new_store().await;
    let (_, checkout) = apis(&db);
    let err = checkout.checkout("gina").await.unwrap_err();
    assert!(matches!(err, LedgerError::ValidationError(_)));
}

#[tokio::test]
async fn clear_cart_settles_nothing() {
    let db = new_store().await;
    fund_wallet(&db, "gina", 10_000).await;
    let (escrow, checkout) = apis(&db);

    let flowers = escrow.create_quote(NewQuote::new("vera", "gina", MinorUnits::from(3_000))).await.unwrap();
    checkout.add_quote_to_cart("gina", flowers.id).await.unwrap();
    checkout.add_promise_to_cart("gina", 78).await.unwrap();

    assert_eq!(checkout.clear_cart("gina").await.unwrap(), 2);
    assert!(checkout.cart_items("gina").await.unwrap().is_empty());
    let gina = db.fetch_wallet("gina").await.unwrap().unwrap();
    assert_eq!(gina.available_balance, MinorUnits::from(10_000));
    assert!(db.contributions_for_item(78).await.unwrap().is_empty());
}

#[tokio::test]
async fn carting_someone_elses_quote_is_refused() {
    let db = new_store().await;
    let (escrow, checkout) = apis(&db);

    let flowers = escrow.create_quote(NewQuote::new("vera", "gina", MinorUnits::from(3_000))).await.unwrap();
    let err = checkout.add_quote_to_cart("mallory", flowers.id).await.unwrap_err();
    assert!(matches!(err, LedgerError::Unauthorized(_)));
    let err = checkout.add_quote_to_cart("gina", 999).await.unwrap_err();
    assert!(matches!(err, LedgerError::QuoteNotFound(999)));
}

#[tokio::test]
async fn direct_cash_gift() {
    let db = new_store().await;
    fund_wallet(&db, "gus", 2_000).await;
    let (_, checkout) = apis(&db);

    let contribution = checkout.contribute_cash(42, "heidi", MinorUnits::from(800), "gus").await.unwrap();
    assert_eq!(contribution.kind, ContributionKind::Cash);
    assert_eq!(contribution.amount, MinorUnits::from(800));

    let gus = db.fetch_wallet("gus").await.unwrap().unwrap();
    assert_eq!(gus.available_balance, MinorUnits::from(1_200));
    let heidi = db.fetch_wallet("heidi").await.unwrap().unwrap();
    assert_eq!(heidi.available_balance, MinorUnits::from(800));

    // A broke guest can still promise.
    let promise = checkout.record_promise(42, "penny").await.unwrap();
    assert_eq!(promise.kind, ContributionKind::Promise);
    assert_eq!(db.contributions_for_item(42).await.unwrap().len(), 2);

    let err = checkout.contribute_cash(42, "heidi", MinorUnits::from(5_000), "gus").await.unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
    let err = checkout.contribute_cash(42, "heidi", MinorUnits::from(0), "gus").await.unwrap_err();
    assert!(matches!(err, LedgerError::ValidationError(_)));
    let err = checkout.contribute_cash(42, "heidi", MinorUnits::from(100), "heidi").await.unwrap_err();
    assert!(matches!(err, LedgerError::ValidationError(_)));
}
