//! # Lumen payment server
//!
//! The HTTP surface over the settlement engine. Three groups of endpoints:
//!
//! * `/webhooks/payment` takes the payment gateway's signed notifications and drives order settlement.
//! * `/webhooks/transfer-events` takes the payout provider's transfer-status callbacks and resolves open
//!   withdrawals.
//! * `/api/*` is the internal, access-key protected API for order intake, seller management, balances and
//!   withdrawals.
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod webhook_routes;

#[cfg(test)]
mod endpoint_tests;
