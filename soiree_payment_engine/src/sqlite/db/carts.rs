use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{CartItem, NewCartItem},
    traits::{LedgerError, WalletApiError},
};

pub async fn insert_item(item: NewCartItem, conn: &mut SqliteConnection) -> Result<CartItem, LedgerError> {
    let item: CartItem = sqlx::query_as(
        r#"
            INSERT INTO cart_items (owner_id, kind, quote_id, wishlist_item_id, host_id, amount)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(item.owner_id)
    .bind(item.kind.to_string())
    .bind(item.quote_id)
    .bind(item.wishlist_item_id)
    .bind(item.host_id)
    .bind(item.amount.map(|a| a.value()))
    .fetch_one(conn)
    .await?;
    debug!("🛒️ Cart item #{} ({}) queued for {}", item.id, item.kind, item.owner_id);
    Ok(item)
}

pub async fn items_for_owner(owner_id: &str, conn: &mut SqliteConnection) -> Result<Vec<CartItem>, WalletApiError> {
    let items = sqlx::query_as("SELECT * FROM cart_items WHERE owner_id = $1 ORDER BY created_at ASC, id ASC")
        .bind(owner_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

pub async fn clear_for_owner(owner_id: &str, conn: &mut SqliteConnection) -> Result<u64, LedgerError> {
    let result = sqlx::query("DELETE FROM cart_items WHERE owner_id = $1").bind(owner_id).execute(conn).await?;
    Ok(result.rows_affected())
}
