use chrono::{DateTime, Utc};
use lps_common::Reais;
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderId, WithdrawalRequest};

//------------------------------------   PaymentConfirmation   -------------------------------------------------------

/// The result of feeding a payment-approved notification into the settlement pipeline.
///
/// Webhook deliveries are at-least-once, so the "nothing happened" arms are expected outcomes rather than
/// errors. Callers acknowledge the notification in every arm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PaymentConfirmation {
    /// The order was flipped to `Paid` and commission settlement ran in the same transaction. This arm is
    /// returned exactly once per payment id.
    Settled(SettlementSummary),
    /// The order was already `Paid` (or `Cancelled`). A replayed or duplicate notification.
    AlreadyProcessed(OrderId),
    /// No order carries this payment id. Either the notification raced order creation or it belongs to a
    /// different system.
    OrderNotFound,
}

//------------------------------------    SettlementSummary    -------------------------------------------------------

/// What a successful settlement did, per seller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementSummary {
    pub order: Order,
    pub credits: Vec<SellerCredit>,
}

impl SettlementSummary {
    /// The sum of all seller credits for this order (what the platform did *not* keep).
    pub fn total_credited(&self) -> Reais {
        self.credits.iter().map(|c| c.amount).sum()
    }
}

/// A single seller's share of one settled order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellerCredit {
    pub seller_id: String,
    /// The seller's share after platform commission, summed over their items in the order.
    pub amount: Reais,
    /// True when the credit was parked as a pending transfer because the seller has no payout destination
    /// configured yet, rather than added to their available balance.
    pub deferred: bool,
}

//------------------------------------   CancellationOutcome   -------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancellationOutcome {
    /// The order moved from `Pending` to `Cancelled`.
    Cancelled(OrderId),
    /// The order is already in a terminal state. Paid orders are never un-paid by a late cancellation
    /// notice; duplicated cancellation notices land here too.
    NotCancellable(OrderId),
    OrderNotFound,
}

//------------------------------------      RefundOutcome      -------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RefundOutcome {
    /// Seller credits were reversed and negative `Refund` ledger rows written.
    Refunded(RefundSummary),
    /// The order carries a `refunded_at` stamp already. Duplicate refund notification.
    AlreadyRefunded(OrderId),
    /// The order was never paid, so there is nothing to reverse.
    NotPaid(OrderId),
    OrderNotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundSummary {
    pub order_id: OrderId,
    pub refunded_at: DateTime<Utc>,
    /// The per-seller amounts that were clawed back from available balances.
    pub reversals: Vec<SellerCredit>,
}

//------------------------------------  WithdrawalResolution   -------------------------------------------------------

/// The result of finalizing or reverting a withdrawal. Both transitions are guarded on `Pending`, so a
/// replayed provider callback resolves to `AlreadyResolved` and touches no balances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WithdrawalResolution {
    Resolved(WithdrawalRequest),
    AlreadyResolved(WithdrawalRequest),
    NotFound(String),
}

impl WithdrawalResolution {
    pub fn request(&self) -> Option<&WithdrawalRequest> {
        match self {
            WithdrawalResolution::Resolved(r) | WithdrawalResolution::AlreadyResolved(r) => Some(r),
            WithdrawalResolution::NotFound(_) => None,
        }
    }
}

//------------------------------------      ReplayOutcome      -------------------------------------------------------

/// The result of replaying parked transfers for a seller after they configure a payout destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayOutcome {
    pub seller_id: String,
    /// How many parked transfers were credited in this pass.
    pub replayed: usize,
    /// The total amount moved into the seller's available balance.
    pub credited: Reais,
}

//------------------------------------      TransferEvent      -------------------------------------------------------

/// A transfer-status callback from the payout provider, after payload parsing. Only failure-like events
/// drive balance changes; successes are informational because finalization happens on the synchronous
/// payout response.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferEvent {
    pub event: TransferEventType,
    pub transfer: TransferDetails,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferEventType {
    TransferCreated,
    TransferPending,
    TransferInBankProcessing,
    TransferDone,
    TransferFailed,
    TransferCancelled,
    /// An event type we do not act on. Parsed rather than rejected, so the provider does not retry it
    /// forever.
    #[serde(other)]
    Unknown,
}

impl TransferEventType {
    /// Events that mean the funds never left and the withdrawal must be reverted.
    pub fn is_failure(&self) -> bool {
        matches!(self, TransferEventType::TransferFailed | TransferEventType::TransferCancelled)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferDetails {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "failReason")]
    pub fail_reason: Option<String>,
}
