use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewQuote, Quote, QuoteStatus},
    traits::{LedgerError, WalletApiError},
};

pub async fn insert_quote(quote: NewQuote, conn: &mut SqliteConnection) -> Result<Quote, LedgerError> {
    let quote: Quote = sqlx::query_as(
        r#"
            INSERT INTO quotes (vendor_id, client_id, price, description)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(quote.vendor_id)
    .bind(quote.client_id)
    .bind(quote.price.value())
    .bind(quote.description)
    .fetch_one(conn)
    .await?;
    debug!("💬️ Quote #{} inserted ({} for client {})", quote.id, quote.price, quote.client_id);
    Ok(quote)
}

pub async fn fetch_quote(quote_id: i64, conn: &mut SqliteConnection) -> Result<Option<Quote>, WalletApiError> {
    let quote = sqlx::query_as("SELECT * FROM quotes WHERE id = $1").bind(quote_id).fetch_optional(conn).await?;
    Ok(quote)
}

/// Compare-and-swap on the quote status. The expected status is part of the WHERE clause, so a
/// concurrent transition leaves this one with zero rows and `None` is returned. Callers decide
/// whether that means "not found" or "already resolved".
pub async fn transition_quote(
    quote_id: i64,
    from: QuoteStatus,
    to: QuoteStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Quote>, LedgerError> {
    let quote: Option<Quote> = sqlx::query_as(
        "UPDATE quotes SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND status = $3 RETURNING *",
    )
    .bind(to.to_string())
    .bind(quote_id)
    .bind(from.to_string())
    .fetch_optional(conn)
    .await?;
    trace!("💬️ Quote #{quote_id} transition {from} -> {to}: {}", if quote.is_some() { "won" } else { "lost" });
    Ok(quote)
}
