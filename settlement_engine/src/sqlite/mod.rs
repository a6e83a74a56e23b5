//! SQLite storage backend.
//!
//! [`SqliteDatabase`] implements [`crate::traits::SettlementDatabase`] and
//! [`crate::traits::LedgerManagement`] on top of the low-level query functions in [`db`].
pub mod db;
mod sqlite_impl;

pub use sqlite_impl::SqliteDatabase;
