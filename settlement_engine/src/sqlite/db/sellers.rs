use sqlx::SqliteConnection;

use crate::db_types::Seller;

/// Creates or updates a seller. A `None` payout key leaves any stored key untouched, so a plain profile
/// upsert never wipes a configured destination.
pub async fn upsert(
    seller_id: &str,
    payout_key: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Seller, sqlx::Error> {
    let seller = sqlx::query_as(
        r#"
            INSERT INTO sellers (id, payout_key) VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE
            SET payout_key = COALESCE(excluded.payout_key, sellers.payout_key), updated_at = CURRENT_TIMESTAMP
            RETURNING *;
        "#,
    )
    .bind(seller_id)
    .bind(payout_key)
    .fetch_one(conn)
    .await?;
    Ok(seller)
}

pub async fn fetch(seller_id: &str, conn: &mut SqliteConnection) -> Result<Option<Seller>, sqlx::Error> {
    let seller = sqlx::query_as("SELECT * FROM sellers WHERE id = $1").bind(seller_id).fetch_optional(conn).await?;
    Ok(seller)
}
