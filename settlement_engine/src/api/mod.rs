//! # Public settlement APIs
//!
//! These structs are the entry points the server uses. They are generic over the storage backend traits so
//! that tests can run against mocks or an in-memory database.
//!
//! * [`SettlementApi`] drives order intake and the payment-notification flows.
//! * [`PayoutApi`] drives the withdrawal state machine against the payout provider.
//! * [`LedgerApi`] answers read-only balance and history queries.
mod ledger_api;
mod payout_api;
mod settlement_api;

pub use ledger_api::LedgerApi;
use lps_common::Reais;
pub use payout_api::PayoutApi;
pub use settlement_api::SettlementApi;

use crate::helpers::CommissionRate;

pub const DEFAULT_MIN_WITHDRAWAL_CENTS: i64 = 2_000;

/// Business knobs injected from server configuration.
#[derive(Debug, Clone, Copy)]
pub struct SettlementConfig {
    /// The platform's cut of each sale.
    pub commission: CommissionRate,
    /// Withdrawal requests below this amount are refused.
    pub min_withdrawal: Reais,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self { commission: CommissionRate::default(), min_withdrawal: Reais::from_cents(DEFAULT_MIN_WITHDRAWAL_CENTS) }
    }
}
