use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{Order, OrderStatus, Quote},
    traits::{LedgerError, WalletApiError},
};

/// Creates the order for an accepted quote. The UNIQUE constraint on `quote_id` enforces exactly
/// one order per quote.
pub async fn insert_order(quote: &Quote, conn: &mut SqliteConnection) -> Result<Order, LedgerError> {
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (quote_id, client_id, vendor_id, escrow_amount)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(quote.id)
    .bind(quote.client_id.as_str())
    .bind(quote.vendor_id.as_str())
    .bind(quote.price.value())
    .fetch_one(conn)
    .await?;
    debug!("📦️ Order #{} created for quote #{} ({} in escrow)", order.id, order.quote_id, order.escrow_amount);
    Ok(order)
}

pub async fn fetch_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, WalletApiError> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(order_id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_by_quote(quote_id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, WalletApiError> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE quote_id = $1").bind(quote_id).fetch_optional(conn).await?;
    Ok(order)
}

/// Compare-and-swap on the order status. Zero affected rows (`None`) means the order was not in
/// any of the `from` statuses, i.e. a concurrent caller won the transition or the order never
/// existed.
pub async fn transition_order(
    order_id: i64,
    from: &[OrderStatus],
    to: OrderStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, LedgerError> {
    let mut builder = QueryBuilder::new("UPDATE orders SET updated_at = CURRENT_TIMESTAMP, status = ");
    builder.push_bind(to.to_string());
    builder.push(" WHERE id = ");
    builder.push_bind(order_id);
    builder.push(" AND status IN (");
    let mut statuses = builder.separated(", ");
    for status in from {
        statuses.push_bind(status.to_string());
    }
    builder.push(") RETURNING *");
    trace!("📦️ Executing query: {}", builder.sql());
    let order = builder.build_query_as::<Order>().fetch_optional(conn).await?;
    Ok(order)
}
