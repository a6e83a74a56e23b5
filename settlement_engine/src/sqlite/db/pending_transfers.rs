use lps_common::Reais;
use sqlx::SqliteConnection;

use crate::db_types::{OrderId, PendingTransfer};

pub async fn insert(
    seller_id: &str,
    amount: Reais,
    source_charge_id: &str,
    order_id: &OrderId,
    description: &str,
    conn: &mut SqliteConnection,
) -> Result<PendingTransfer, sqlx::Error> {
    let transfer = sqlx::query_as(
        r#"
            INSERT INTO pending_transfers (seller_id, amount, source_charge_id, order_id, description)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(seller_id)
    .bind(amount)
    .bind(source_charge_id)
    .bind(order_id.as_str())
    .bind(description)
    .fetch_one(conn)
    .await?;
    Ok(transfer)
}

pub async fn fetch_unprocessed(
    seller_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<PendingTransfer>, sqlx::Error> {
    let transfers =
        sqlx::query_as("SELECT * FROM pending_transfers WHERE seller_id = $1 AND processed_at IS NULL ORDER BY id")
            .bind(seller_id)
            .fetch_all(conn)
            .await?;
    Ok(transfers)
}

pub async fn fetch_unprocessed_for_order(
    seller_id: &str,
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<PendingTransfer>, sqlx::Error> {
    let transfers = sqlx::query_as(
        "SELECT * FROM pending_transfers WHERE seller_id = $1 AND order_id = $2 AND processed_at IS NULL ORDER BY id",
    )
    .bind(seller_id)
    .bind(order_id.as_str())
    .fetch_all(conn)
    .await?;
    Ok(transfers)
}

/// Stamps `processed_at` on a single parked transfer. The stamp is conditional, so two concurrent replay
/// passes cannot both claim the same row. Returns `true` when this call won the stamp.
pub async fn mark_processed(id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE pending_transfers SET processed_at = CURRENT_TIMESTAMP WHERE id = $1 AND processed_at IS NULL")
            .bind(id)
            .execute(conn)
            .await?;
    Ok(result.rows_affected() == 1)
}
