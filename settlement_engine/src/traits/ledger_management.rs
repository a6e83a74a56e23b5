use lps_common::Reais;
use thiserror::Error;

use crate::db_types::{Balance, LedgerEntry, Order, OrderId, OrderItem, PendingTransfer, WithdrawalRequest};

/// Read-only queries over the ledger. Kept separate from [`super::SettlementDatabase`] so that reporting
/// surfaces do not need the mutating half of the backend.
#[allow(async_fn_in_trait)]
pub trait LedgerManagement: Clone {
    /// A seller's current balance, or `None` if they have never been credited.
    async fn fetch_balance(&self, seller_id: &str) -> Result<Option<Balance>, LedgerError>;

    /// Every ledger entry for a seller, most recent first.
    async fn fetch_ledger(&self, seller_id: &str) -> Result<Vec<LedgerEntry>, LedgerError>;

    async fn fetch_withdrawal(&self, withdrawal_id: &str) -> Result<Option<WithdrawalRequest>, LedgerError>;

    /// The sum of amounts over a seller's `Pending` withdrawal requests. Equals the seller's blocked
    /// balance whenever the ledger is consistent.
    async fn pending_withdrawal_total(&self, seller_id: &str) -> Result<Reais, LedgerError>;

    /// Parked transfers for a seller that have not been replayed yet.
    async fn fetch_pending_transfers(&self, seller_id: &str) -> Result<Vec<PendingTransfer>, LedgerError>;

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, LedgerError>;

    async fn fetch_order_by_payment_id(&self, payment_id: &str) -> Result<Option<Order>, LedgerError>;

    async fn fetch_order_items(&self, order_id: &OrderId) -> Result<Vec<OrderItem>, LedgerError>;
}

//--------------------------------------      LedgerError      -------------------------------------------------------

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}
