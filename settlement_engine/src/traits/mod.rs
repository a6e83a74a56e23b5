//! # Backend and collaborator contracts.
//!
//! This module defines the interface contracts of the settlement pipeline.
//!
//! ## Persistence
//! * [`SettlementDatabase`] defines the highest level of behaviour for storage backends: order intake, the
//!   idempotent payment-confirmation flip with in-transaction settlement, the withdrawal ledger state
//!   machine, and pending-transfer reconciliation.
//! * [`LedgerManagement`] provides read-only queries over balances, ledger entries, withdrawals and orders.
//!
//! ## External collaborators
//! The payment gateway and payout provider are reached over HTTP by the server crate; the engine only sees
//! them through narrow traits so that flows can be tested against mocks.
//! * [`PaymentGateway`] creates payment intents and fetches authoritative payment status.
//! * [`PayoutProvider`] sends funds to a seller's payout destination and reports a three-way outcome.
mod data_objects;
mod ledger_management;
mod payment_gateway;
mod payout_provider;
mod settlement_database;

pub use data_objects::{
    CancellationOutcome,
    PaymentConfirmation,
    RefundOutcome,
    RefundSummary,
    ReplayOutcome,
    SellerCredit,
    SettlementSummary,
    TransferEvent,
    TransferEventType,
    TransferDetails,
    WithdrawalResolution,
};
pub use ledger_management::{LedgerError, LedgerManagement};

/// Shorthand for backends that implement both halves of the storage contract.
pub trait SettlementBackend: SettlementDatabase + LedgerManagement {}
impl<T> SettlementBackend for T where T: SettlementDatabase + LedgerManagement {}
pub use payment_gateway::{GatewayError, PaymentGateway, PaymentInfo, PaymentIntent, PaymentStatus};
pub use payout_provider::{PayoutOutcome, PayoutProvider, PayoutProviderError, PayoutRequest};
pub use settlement_database::{SettlementDatabase, SettlementError};
