use log::{debug, trace};
use spe_common::MinorUnits;
use sqlx::SqliteConnection;

use crate::{db_types::Wallet, traits::WalletApiError};

pub async fn wallet_for_user(user_id: &str, conn: &mut SqliteConnection) -> Result<Option<Wallet>, WalletApiError> {
    let wallet = sqlx::query_as("SELECT * FROM wallets WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(wallet)
}

pub async fn wallet_by_id(wallet_id: i64, conn: &mut SqliteConnection) -> Result<Option<Wallet>, WalletApiError> {
    let wallet = sqlx::query_as("SELECT * FROM wallets WHERE id = $1").bind(wallet_id).fetch_optional(conn).await?;
    Ok(wallet)
}

/// Fetches the wallet for `user_id`, creating an empty one if none exists.
///
/// The create path races only against the `user_id` UNIQUE constraint: `INSERT .. ON CONFLICT DO
/// NOTHING` followed by a select on the same connection, so two concurrent first-touches converge
/// on the same row. There is no separate existence check.
pub async fn fetch_or_create_wallet(user_id: &str, conn: &mut SqliteConnection) -> Result<Wallet, WalletApiError> {
    let inserted = sqlx::query("INSERT INTO wallets (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    if inserted.rows_affected() > 0 {
        debug!("💼️ Created new wallet for user {user_id}");
    }
    let wallet = wallet_for_user(user_id, conn).await?.ok_or_else(|| {
        WalletApiError::DatabaseError(format!("Wallet for {user_id} missing straight after upsert"))
    })?;
    Ok(wallet)
}

/// Debits the available balance, guarded against overdraw. The check and the mutation are one
/// statement, so there is no read-then-write window for a racing spend to exploit. Returns false
/// if the balance could not cover the debit.
pub async fn debit_available(
    wallet_id: i64,
    amount: MinorUnits,
    conn: &mut SqliteConnection,
) -> Result<bool, WalletApiError> {
    let value = amount.value();
    let result = sqlx::query(
        r#"UPDATE wallets SET
        available_balance = available_balance - $1,
        updated_at = CURRENT_TIMESTAMP
        WHERE id = $2 AND available_balance >= $1"#,
    )
    .bind(value)
    .bind(wallet_id)
    .execute(conn)
    .await?;
    let ok = result.rows_affected() > 0;
    trace!("💼️ Debit of {amount} against wallet #{wallet_id} {}", if ok { "applied" } else { "refused" });
    Ok(ok)
}

pub async fn credit_available(
    wallet_id: i64,
    amount: MinorUnits,
    conn: &mut SqliteConnection,
) -> Result<(), WalletApiError> {
    let value = amount.value();
    let _ = sqlx::query(
        r#"UPDATE wallets SET
        available_balance = available_balance + $1,
        updated_at = CURRENT_TIMESTAMP
        WHERE id = $2"#,
    )
    .bind(value)
    .bind(wallet_id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn credit_active(
    wallet_id: i64,
    amount: MinorUnits,
    conn: &mut SqliteConnection,
) -> Result<(), WalletApiError> {
    let value = amount.value();
    let _ = sqlx::query(
        r#"UPDATE wallets SET
        active_order_balance = active_order_balance + $1,
        updated_at = CURRENT_TIMESTAMP
        WHERE id = $2"#,
    )
    .bind(value)
    .bind(wallet_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Debits the escrow side of the wallet, guarded like [`debit_available`]. A false return here
/// means the held amount no longer matches its order, which is an internal inconsistency rather
/// than a user error.
pub async fn debit_active(
    wallet_id: i64,
    amount: MinorUnits,
    conn: &mut SqliteConnection,
) -> Result<bool, WalletApiError> {
    let value = amount.value();
    let result = sqlx::query(
        r#"UPDATE wallets SET
        active_order_balance = active_order_balance - $1,
        updated_at = CURRENT_TIMESTAMP
        WHERE id = $2 AND active_order_balance >= $1"#,
    )
    .bind(value)
    .bind(wallet_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}
