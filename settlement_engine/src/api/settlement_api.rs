use log::info;

use crate::{
    api::SettlementConfig,
    db_types::{NewOrder, Order, OrderId, Seller},
    traits::{CancellationOutcome, PaymentConfirmation, RefundOutcome, SettlementDatabase, SettlementError},
};

/// Order intake and payment-notification flows.
///
/// The methods here are deliberately forgiving about duplicates: payment notifications are delivered
/// at-least-once, so "nothing to do" answers come back as data rather than errors and the caller can
/// acknowledge the notification either way.
pub struct SettlementApi<B> {
    db: B,
    config: SettlementConfig,
}

impl<B> SettlementApi<B>
where B: SettlementDatabase
{
    pub fn new(db: B, config: SettlementConfig) -> Self {
        Self { db, config }
    }

    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    pub async fn create_order(&self, order: NewOrder) -> Result<Order, SettlementError> {
        let order = self.db.create_order(order).await?;
        info!("🛒️ New order {} for buyer {}. Total: {}", order.id, order.buyer_id, order.total);
        Ok(order)
    }

    pub async fn attach_payment_intent(
        &self,
        order_id: &OrderId,
        payment_id: &str,
    ) -> Result<Order, SettlementError> {
        self.db.attach_payment_intent(order_id, payment_id).await
    }

    /// Handles an authoritative "payment approved" signal. Flips the order to `Paid` and settles seller
    /// commissions atomically; replays are acknowledged without side effects.
    pub async fn payment_approved(&self, payment_id: &str) -> Result<PaymentConfirmation, SettlementError> {
        self.db.confirm_payment(payment_id, self.config.commission).await
    }

    /// Handles a "payment rejected / cancelled" signal. Paid orders are never un-paid.
    pub async fn payment_rejected(&self, payment_id: &str) -> Result<CancellationOutcome, SettlementError> {
        self.db.cancel_payment(payment_id).await
    }

    /// Handles a refund or chargeback on a paid order, reversing the seller credits once.
    pub async fn payment_refunded(&self, payment_id: &str) -> Result<RefundOutcome, SettlementError> {
        self.db.process_refund(payment_id, self.config.commission).await
    }

    pub async fn register_seller(&self, seller_id: &str) -> Result<Seller, SettlementError> {
        self.db.upsert_seller(seller_id, None).await
    }

    /// Stores or replaces the seller's payout destination.
    pub async fn set_payout_key(&self, seller_id: &str, payout_key: &str) -> Result<Seller, SettlementError> {
        let seller = self.db.upsert_seller(seller_id, Some(payout_key)).await?;
        info!("💳️ Payout destination updated for seller {seller_id}");
        Ok(seller)
    }

    pub async fn fetch_seller(&self, seller_id: &str) -> Result<Option<Seller>, SettlementError> {
        self.db.fetch_seller(seller_id).await
    }
}
