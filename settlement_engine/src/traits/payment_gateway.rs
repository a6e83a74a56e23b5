use lps_common::Reais;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A minimal view of the payment gateway's API.
///
/// Webhook notifications carry only a payment id; the notification body is never trusted for status or
/// amounts. Implementations re-fetch the authoritative payment record from the gateway before the engine
/// acts on it.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway: Clone {
    /// Creates a payment intent for an order and returns the gateway's payment id plus a checkout URL to
    /// hand to the buyer.
    async fn create_payment(
        &self,
        order_id: &str,
        amount: Reais,
        buyer_id: &str,
    ) -> Result<PaymentIntent, GatewayError>;

    /// Fetches the authoritative state of a payment.
    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentInfo, GatewayError>;
}

//--------------------------------------     PaymentIntent     -------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub payment_id: String,
    pub checkout_url: String,
}

//--------------------------------------      PaymentInfo      -------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInfo {
    pub payment_id: String,
    pub status: PaymentStatus,
    /// The gateway's copy of the order reference, used only for cross-checking against our records.
    pub external_reference: Option<String>,
    pub amount: Option<Reais>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    InProcess,
    Approved,
    Rejected,
    Cancelled,
    Refunded,
    ChargedBack,
    /// A status string we do not recognise. Treated as no-op by the pipeline.
    Unknown,
}

impl PaymentStatus {
    pub fn from_gateway(s: &str) -> Self {
        match s {
            "pending" => PaymentStatus::Pending,
            "in_process" | "in_mediation" | "authorized" => PaymentStatus::InProcess,
            "approved" => PaymentStatus::Approved,
            "rejected" => PaymentStatus::Rejected,
            "cancelled" => PaymentStatus::Cancelled,
            "refunded" => PaymentStatus::Refunded,
            "charged_back" => PaymentStatus::ChargedBack,
            _ => PaymentStatus::Unknown,
        }
    }
}

//--------------------------------------      GatewayError     -------------------------------------------------------

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Gateway returned {code}: {message}")]
    ApiError { code: u16, message: String },
    #[error("Could not reach the payment gateway: {0}")]
    Transport(String),
    #[error("Unexpected response from the payment gateway: {0}")]
    InvalidResponse(String),
}
