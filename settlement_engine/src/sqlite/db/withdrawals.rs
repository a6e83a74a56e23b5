use lps_common::Reais;
use sqlx::SqliteConnection;

use crate::db_types::WithdrawalRequest;

pub async fn insert_request(
    id: &str,
    seller_id: &str,
    amount: Reais,
    payout_key: &str,
    conn: &mut SqliteConnection,
) -> Result<WithdrawalRequest, sqlx::Error> {
    let request = sqlx::query_as(
        r#"
            INSERT INTO withdrawal_requests (id, seller_id, amount, payout_key)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(id)
    .bind(seller_id)
    .bind(amount)
    .bind(payout_key)
    .fetch_one(conn)
    .await?;
    Ok(request)
}

pub async fn fetch_request(id: &str, conn: &mut SqliteConnection) -> Result<Option<WithdrawalRequest>, sqlx::Error> {
    let request =
        sqlx::query_as("SELECT * FROM withdrawal_requests WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(request)
}

/// Marks a `Pending` withdrawal as `Processed`. Returns `None` when the request has already been resolved,
/// which is how replayed provider responses are detected.
pub async fn mark_processed(
    id: &str,
    note: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<WithdrawalRequest>, sqlx::Error> {
    let request = sqlx::query_as(
        r#"
            UPDATE withdrawal_requests
            SET status = 'Processed', note = $2, resolved_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND status = 'Pending'
            RETURNING *;
        "#,
    )
    .bind(id)
    .bind(note)
    .fetch_optional(conn)
    .await?;
    Ok(request)
}

/// Marks a `Pending` withdrawal as `Failed`. Same replay guard as [`mark_processed`].
pub async fn mark_failed(
    id: &str,
    reason: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<WithdrawalRequest>, sqlx::Error> {
    let request = sqlx::query_as(
        r#"
            UPDATE withdrawal_requests
            SET status = 'Failed', note = $2, resolved_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND status = 'Pending'
            RETURNING *;
        "#,
    )
    .bind(id)
    .bind(reason)
    .fetch_optional(conn)
    .await?;
    Ok(request)
}

/// Overwrites the operator note without changing status or balances.
pub async fn set_note(id: &str, note: &str, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE withdrawal_requests SET note = $2 WHERE id = $1")
        .bind(id)
        .bind(note)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

/// Sets a `Failed` withdrawal back to `Pending` for another payout attempt.
pub async fn reopen(id: &str, conn: &mut SqliteConnection) -> Result<Option<WithdrawalRequest>, sqlx::Error> {
    let request = sqlx::query_as(
        r#"
            UPDATE withdrawal_requests
            SET status = 'Pending', resolved_at = NULL
            WHERE id = $1 AND status = 'Failed'
            RETURNING *;
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(request)
}

/// The sum of amounts over a seller's `Pending` requests. Matches the blocked balance when the ledger is
/// consistent.
pub async fn pending_total(seller_id: &str, conn: &mut SqliteConnection) -> Result<Reais, sqlx::Error> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount), 0) FROM withdrawal_requests WHERE seller_id = $1 AND status = 'Pending'",
    )
    .bind(seller_id)
    .fetch_one(conn)
    .await?;
    Ok(Reais::from_cents(total))
}
