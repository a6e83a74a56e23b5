use lps_common::Reais;
use sqlx::SqliteConnection;

use crate::db_types::{LedgerEntry, LedgerEntryKind, LedgerEntryStatus};

pub async fn insert_entry(
    seller_id: &str,
    kind: LedgerEntryKind,
    amount: Reais,
    description: &str,
    withdrawal_id: Option<&str>,
    status: LedgerEntryStatus,
    conn: &mut SqliteConnection,
) -> Result<LedgerEntry, sqlx::Error> {
    let entry = sqlx::query_as(
        r#"
            INSERT INTO ledger_entries (seller_id, kind, amount, description, withdrawal_id, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(seller_id)
    .bind(kind.to_string())
    .bind(amount)
    .bind(description)
    .bind(withdrawal_id)
    .bind(status.to_string())
    .fetch_one(conn)
    .await?;
    Ok(entry)
}

/// All entries for a seller, most recent first.
pub async fn fetch_ledger(seller_id: &str, conn: &mut SqliteConnection) -> Result<Vec<LedgerEntry>, sqlx::Error> {
    let entries = sqlx::query_as("SELECT * FROM ledger_entries WHERE seller_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(seller_id)
        .fetch_all(conn)
        .await?;
    Ok(entries)
}

/// Moves the ledger rows attached to a withdrawal to a new status, mirroring the withdrawal's transition.
pub async fn update_status_for_withdrawal(
    withdrawal_id: &str,
    status: LedgerEntryStatus,
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE ledger_entries SET status = $2 WHERE withdrawal_id = $1")
        .bind(withdrawal_id)
        .bind(status.to_string())
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
