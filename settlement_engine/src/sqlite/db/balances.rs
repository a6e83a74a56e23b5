use lps_common::Reais;
use sqlx::SqliteConnection;

use crate::db_types::Balance;

/// Creates the zero balance row for a seller if it does not exist yet.
pub async fn ensure_balance(seller_id: &str, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO balances (seller_id) VALUES ($1) ON CONFLICT (seller_id) DO NOTHING")
        .bind(seller_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn fetch_balance(seller_id: &str, conn: &mut SqliteConnection) -> Result<Option<Balance>, sqlx::Error> {
    let balance = sqlx::query_as("SELECT * FROM balances WHERE seller_id = $1")
        .bind(seller_id)
        .fetch_optional(conn)
        .await?;
    Ok(balance)
}

/// Adds `delta` (which may be negative) to the seller's available balance and returns the updated row.
pub async fn adjust_available(
    seller_id: &str,
    delta: Reais,
    conn: &mut SqliteConnection,
) -> Result<Balance, sqlx::Error> {
    ensure_balance(seller_id, &mut *conn).await?;
    let balance = sqlx::query_as(
        r#"
            UPDATE balances SET available = available + $2, updated_at = CURRENT_TIMESTAMP
            WHERE seller_id = $1
            RETURNING *;
        "#,
    )
    .bind(seller_id)
    .bind(delta)
    .fetch_one(conn)
    .await?;
    Ok(balance)
}

/// Moves `amount` from available to blocked and returns the updated row. The caller must check whether the
/// resulting available balance went negative and roll the enclosing transaction back if so; the schema
/// carries no constraint for this on purpose.
pub async fn move_available_to_blocked(
    seller_id: &str,
    amount: Reais,
    conn: &mut SqliteConnection,
) -> Result<Option<Balance>, sqlx::Error> {
    let balance = sqlx::query_as(
        r#"
            UPDATE balances
            SET available = available - $2, blocked = blocked + $2, updated_at = CURRENT_TIMESTAMP
            WHERE seller_id = $1
            RETURNING *;
        "#,
    )
    .bind(seller_id)
    .bind(amount)
    .fetch_optional(conn)
    .await?;
    Ok(balance)
}

/// Releases blocked funds permanently (the payout went through).
pub async fn release_blocked(
    seller_id: &str,
    amount: Reais,
    conn: &mut SqliteConnection,
) -> Result<Balance, sqlx::Error> {
    let balance = sqlx::query_as(
        r#"
            UPDATE balances SET blocked = blocked - $2, updated_at = CURRENT_TIMESTAMP
            WHERE seller_id = $1
            RETURNING *;
        "#,
    )
    .bind(seller_id)
    .bind(amount)
    .fetch_one(conn)
    .await?;
    Ok(balance)
}

/// Returns blocked funds to the available balance (the payout failed or was cancelled).
pub async fn return_blocked_to_available(
    seller_id: &str,
    amount: Reais,
    conn: &mut SqliteConnection,
) -> Result<Balance, sqlx::Error> {
    let balance = sqlx::query_as(
        r#"
            UPDATE balances
            SET blocked = blocked - $2, available = available + $2, updated_at = CURRENT_TIMESTAMP
            WHERE seller_id = $1
            RETURNING *;
        "#,
    )
    .bind(seller_id)
    .bind(amount)
    .fetch_one(conn)
    .await?;
    Ok(balance)
}
