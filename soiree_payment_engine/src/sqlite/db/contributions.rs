use log::debug;
use spe_common::MinorUnits;
use sqlx::SqliteConnection;

use crate::{
    db_types::{ContributionKind, WishlistContribution},
    traits::{LedgerError, WalletApiError},
};

pub async fn insert_contribution(
    wishlist_item_id: i64,
    guest_id: &str,
    kind: ContributionKind,
    amount: MinorUnits,
    conn: &mut SqliteConnection,
) -> Result<WishlistContribution, LedgerError> {
    let contribution: WishlistContribution = sqlx::query_as(
        r#"
            INSERT INTO wishlist_contributions (wishlist_item_id, guest_id, kind, amount)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(wishlist_item_id)
    .bind(guest_id)
    .bind(kind.to_string())
    .bind(amount.value())
    .fetch_one(conn)
    .await?;
    debug!(
        "🎁️ {kind} contribution #{} recorded for item #{wishlist_item_id} by {guest_id}",
        contribution.id
    );
    Ok(contribution)
}

pub async fn contributions_for_item(
    wishlist_item_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<WishlistContribution>, WalletApiError> {
    let contributions =
        sqlx::query_as("SELECT * FROM wishlist_contributions WHERE wishlist_item_id = $1 ORDER BY created_at ASC")
            .bind(wishlist_item_id)
            .fetch_all(conn)
            .await?;
    Ok(contributions)
}
