use lps_common::Reais;
use thiserror::Error;

use crate::{
    db_types::{NewOrder, Order, OrderId, Seller, WithdrawalRequest},
    helpers::CommissionRate,
    traits::{CancellationOutcome, PaymentConfirmation, RefundOutcome, ReplayOutcome, WithdrawalResolution},
};

/// The highest-level behaviour of a storage backend for the settlement pipeline.
///
/// Implementations are responsible for the atomicity guarantees: `confirm_payment` must flip the order and
/// settle commissions in one transaction, and the withdrawal transitions must be conditional on the current
/// status so that replayed callbacks are no-ops.
#[allow(async_fn_in_trait)]
pub trait SettlementDatabase: Clone {
    /// The URL of the database, with sensitive information redacted.
    fn url(&self) -> &str;

    /// Creates a new order with its items in `Pending` status. The order total is the sum of item prices.
    /// Fails with [`SettlementError::OrderAlreadyExists`] if the order id is taken, and with
    /// [`SettlementError::EmptyOrder`] for an order with no items.
    async fn create_order(&self, order: NewOrder) -> Result<Order, SettlementError>;

    /// Records the gateway payment id against an order so that later webhook notifications can find it.
    /// An order's payment id is written once; attaching a different id afterwards is an error.
    async fn attach_payment_intent(&self, order_id: &OrderId, payment_id: &str) -> Result<Order, SettlementError>;

    /// The heart of the pipeline. Given an approved payment id:
    /// * flips the matching order to `Paid` (a `Cancelled` order moves too, since gateways can report
    ///   a rejection and then approve the same payment),
    /// * credits each seller their post-commission share (or parks it as a pending transfer when the
    ///   seller has no payout destination),
    /// * writes positive `Sale` ledger rows,
    ///
    /// all in a single transaction. Replays return [`PaymentConfirmation::AlreadyProcessed`] without
    /// touching any balance.
    async fn confirm_payment(
        &self,
        payment_id: &str,
        rate: CommissionRate,
    ) -> Result<PaymentConfirmation, SettlementError>;

    /// Marks the order for a rejected or cancelled payment as `Cancelled`. Only `Pending` orders move;
    /// a cancellation arriving after payment confirmation is ignored.
    async fn cancel_payment(&self, payment_id: &str) -> Result<CancellationOutcome, SettlementError>;

    /// Reverses the seller credits of a paid order after a refund or chargeback: writes negative `Refund`
    /// ledger rows, debits available balances, and stamps `refunded_at` as the idempotency guard. The
    /// order stays `Paid`.
    async fn process_refund(&self, payment_id: &str, rate: CommissionRate) -> Result<RefundOutcome, SettlementError>;

    /// Creates or updates a seller record. Passing a payout key overwrites the stored one; passing `None`
    /// leaves an existing key untouched.
    async fn upsert_seller(&self, seller_id: &str, payout_key: Option<&str>) -> Result<Seller, SettlementError>;

    async fn fetch_seller(&self, seller_id: &str) -> Result<Option<Seller>, SettlementError>;

    /// Opens a withdrawal request: atomically moves `amount` from available to blocked, verifies the
    /// resulting available balance is non-negative, and writes the `Pending` request with its negative
    /// `Withdrawal` ledger row. Fails with [`SettlementError::InsufficientFunds`] without side effects
    /// when the balance does not cover the amount.
    async fn reserve_withdrawal(
        &self,
        seller_id: &str,
        amount: Reais,
        payout_key: &str,
    ) -> Result<WithdrawalRequest, SettlementError>;

    /// Confirms a payout: releases the blocked funds permanently and marks the request `Processed`.
    /// Conditional on the request being `Pending`.
    async fn finalize_withdrawal(&self, withdrawal_id: &str, note: &str)
        -> Result<WithdrawalResolution, SettlementError>;

    /// Returns the blocked funds to available and marks the request `Failed`. Conditional on the request
    /// being `Pending`, so replayed failure callbacks cannot double-credit.
    async fn revert_withdrawal(
        &self,
        withdrawal_id: &str,
        reason: &str,
    ) -> Result<WithdrawalResolution, SettlementError>;

    /// Attaches an operator note to a withdrawal without changing its status or any balance. Used when the
    /// payout provider asks for manual intervention.
    async fn annotate_withdrawal(&self, withdrawal_id: &str, note: &str) -> Result<(), SettlementError>;

    /// Re-opens a `Failed` withdrawal for another payout attempt: re-reserves the funds from available to
    /// blocked and sets the request back to `Pending`. Fails when the request is not `Failed` or the funds
    /// are no longer available.
    async fn reblock_failed_withdrawal(&self, withdrawal_id: &str) -> Result<WithdrawalRequest, SettlementError>;

    /// Credits every unprocessed parked transfer for a seller to their available balance, stamping each
    /// row's `processed_at` conditionally so a concurrent replay cannot double-credit.
    async fn replay_pending_transfers(&self, seller_id: &str) -> Result<ReplayOutcome, SettlementError>;

    /// Closes the database connection(s).
    async fn close(&mut self) -> Result<(), SettlementError>;
}

//------------------------------------     SettlementError     -------------------------------------------------------

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} already exists")]
    OrderAlreadyExists(OrderId),
    #[error("Order {0} has no items")]
    EmptyOrder(OrderId),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Order {order_id} already has payment id {existing}")]
    PaymentAlreadyAttached { order_id: OrderId, existing: String },
    #[error("Seller {0} does not exist")]
    SellerNotFound(String),
    #[error("Seller {seller_id} has {available} available, cannot withdraw {requested}")]
    InsufficientFunds { seller_id: String, requested: Reais, available: Reais },
    #[error("Seller {0} has no payout destination configured")]
    PayoutKeyMissing(String),
    #[error("Withdrawal amounts must be positive, got {0}")]
    InvalidAmount(Reais),
    #[error("Withdrawal of {requested} is below the minimum of {minimum}")]
    BelowMinimumWithdrawal { requested: Reais, minimum: Reais },
    #[error("Withdrawal {0} does not exist")]
    WithdrawalNotFound(String),
    #[error("Withdrawal {id} is {status}, only Failed withdrawals can be retried")]
    WithdrawalNotRetryable { id: String, status: String },
}

impl From<sqlx::Error> for SettlementError {
    fn from(e: sqlx::Error) -> Self {
        SettlementError::DatabaseError(e.to_string())
    }
}
