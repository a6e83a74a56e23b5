//! # Lumen settlement engine
//!
//! The business core of the Lumen payment server: order intake, idempotent payment confirmation with
//! atomic commission settlement, the seller ledger, and the withdrawal state machine.
//!
//! ## Architecture
//!
//! The engine is split along the same seams as the server that drives it:
//!
//! * [`db_types`] holds the entity types shared by every layer.
//! * [`traits`] defines the storage contracts ([`traits::SettlementDatabase`],
//!   [`traits::LedgerManagement`]) and the external collaborator contracts
//!   ([`traits::PaymentGateway`], [`traits::PayoutProvider`]).
//! * [`sqlite`] is the storage backend: low-level query functions under [`sqlite::db`] plus the
//!   [`SqliteDatabase`] facade that supplies the transactional guarantees.
//! * [`api`] exposes the high-level entry points the server calls.
//!
//! ## Money movement rules
//!
//! Every flow that moves money is written to survive duplicate delivery:
//!
//! * A payment id settles exactly once. The `Pending` to `Paid` flip and the seller credits happen in one
//!   transaction, and the flip is conditional on the current status.
//! * A withdrawal reserves funds before the payout provider is called and resolves exactly once. Both the
//!   `Processed` and `Failed` transitions are conditional on `Pending`.
//! * Credits for sellers without a payout destination are parked and replayed later, with a conditional
//!   stamp guarding each parked row against double credit.
pub mod api;
pub mod db_types;
pub mod helpers;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
