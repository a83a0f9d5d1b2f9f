use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{LedgerEntry, NewLedgerEntry},
    traits::{LedgerError, WalletApiError},
};

/// Appends a ledger entry. A duplicate settlement reference trips the partial unique index and
/// surfaces as [`LedgerError::DuplicateReference`].
pub async fn insert_entry(entry: NewLedgerEntry, conn: &mut SqliteConnection) -> Result<LedgerEntry, LedgerError> {
    let reference = entry.reference.clone();
    let result: Result<LedgerEntry, sqlx::Error> = sqlx::query_as(
        r#"
            INSERT INTO ledger_entries (wallet_id, order_id, kind, amount, status, reference, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(entry.wallet_id)
    .bind(entry.order_id)
    .bind(entry.kind.to_string())
    .bind(entry.amount.value())
    .bind(entry.status.to_string())
    .bind(entry.reference)
    .bind(entry.description)
    .fetch_one(conn)
    .await;
    let entry = result.map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => {
            LedgerError::DuplicateReference(reference.unwrap_or_default())
        },
        _ => LedgerError::from(e),
    })?;
    trace!("🧾️ Ledger entry #{} ({} {}) appended for wallet #{}", entry.id, entry.kind, entry.amount, entry.wallet_id);
    Ok(entry)
}

pub async fn entries_for_wallet(
    wallet_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<LedgerEntry>, WalletApiError> {
    let entries = sqlx::query_as("SELECT * FROM ledger_entries WHERE wallet_id = $1 ORDER BY created_at ASC, id ASC")
        .bind(wallet_id)
        .fetch_all(conn)
        .await?;
    Ok(entries)
}

pub async fn entries_for_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<LedgerEntry>, WalletApiError> {
    let entries = sqlx::query_as("SELECT * FROM ledger_entries WHERE order_id = $1 ORDER BY created_at ASC, id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(entries)
}

pub async fn entry_for_reference(
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<LedgerEntry>, WalletApiError> {
    let entry = sqlx::query_as("SELECT * FROM ledger_entries WHERE reference = $1")
        .bind(reference)
        .fetch_optional(conn)
        .await?;
    Ok(entry)
}

/// Flips the order's `Held` entry to `EscrowRelease` / `Completed`. Exactly one such entry exists
/// for an active order; its absence means the ledger and the order disagree.
pub async fn release_held_entry(order_id: i64, conn: &mut SqliteConnection) -> Result<LedgerEntry, LedgerError> {
    let entry: Option<LedgerEntry> = sqlx::query_as(
        r#"UPDATE ledger_entries SET kind = 'EscrowRelease', status = 'Completed'
           WHERE order_id = $1 AND status = 'Held' RETURNING *"#,
    )
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    entry.ok_or_else(|| LedgerError::DatabaseError(format!("Order {order_id} has no held ledger entry to release")))
}

/// Marks the order's `Held` entry as `Failed`: the hold will never settle because the order was
/// refunded.
pub async fn fail_held_entry(order_id: i64, conn: &mut SqliteConnection) -> Result<LedgerEntry, LedgerError> {
    let entry: Option<LedgerEntry> = sqlx::query_as(
        "UPDATE ledger_entries SET status = 'Failed' WHERE order_id = $1 AND status = 'Held' RETURNING *",
    )
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    entry.ok_or_else(|| LedgerError::DatabaseError(format!("Order {order_id} has no held ledger entry to fail")))
}
