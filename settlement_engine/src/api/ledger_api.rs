use lps_common::Reais;

use crate::{
    db_types::{Balance, LedgerEntry, Order, OrderId, OrderItem, PendingTransfer, WithdrawalRequest},
    traits::{LedgerError, LedgerManagement},
};

/// Read-only queries for reporting surfaces.
pub struct LedgerApi<B> {
    db: B,
}

impl<B> LedgerApi<B>
where B: LedgerManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// A seller's balance. Sellers that have never been credited report a zero balance rather than an
    /// error.
    pub async fn balance(&self, seller_id: &str) -> Result<Balance, LedgerError> {
        let balance = self.db.fetch_balance(seller_id).await?.unwrap_or_else(|| Balance {
            seller_id: seller_id.to_string(),
            available: Reais::zero(),
            blocked: Reais::zero(),
            updated_at: chrono::Utc::now(),
        });
        Ok(balance)
    }

    pub async fn ledger(&self, seller_id: &str) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.db.fetch_ledger(seller_id).await
    }

    pub async fn withdrawal(&self, withdrawal_id: &str) -> Result<Option<WithdrawalRequest>, LedgerError> {
        self.db.fetch_withdrawal(withdrawal_id).await
    }

    pub async fn pending_withdrawal_total(&self, seller_id: &str) -> Result<Reais, LedgerError> {
        self.db.pending_withdrawal_total(seller_id).await
    }

    pub async fn pending_transfers(&self, seller_id: &str) -> Result<Vec<PendingTransfer>, LedgerError> {
        self.db.fetch_pending_transfers(seller_id).await
    }

    pub async fn order(&self, order_id: &OrderId) -> Result<Option<Order>, LedgerError> {
        self.db.fetch_order(order_id).await
    }

    pub async fn order_by_payment_id(&self, payment_id: &str) -> Result<Option<Order>, LedgerError> {
        self.db.fetch_order_by_payment_id(payment_id).await
    }

    pub async fn order_items(&self, order_id: &OrderId) -> Result<Vec<OrderItem>, LedgerError> {
        self.db.fetch_order_items(order_id).await
    }
}
