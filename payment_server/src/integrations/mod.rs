//! HTTP clients for the external parties the server talks to: the payment gateway (checkout and payment
//! lookups) and the payout provider (transfers to sellers).
mod gateway;
mod payout;

pub use gateway::GatewayClient;
pub use payout::PayoutClient;
