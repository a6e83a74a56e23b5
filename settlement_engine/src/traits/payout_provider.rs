use lps_common::Reais;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The payout side of the pipeline: sends funds to a seller's payout destination.
///
/// The outcome is three-way on purpose. A rejection means the funds never left and the withdrawal can be
/// reverted immediately; a manual-intervention answer means the provider needs a human and the withdrawal
/// must stay reserved; a transport error is ambiguous (the transfer may or may not have been created) and
/// must also leave the reservation in place until a transfer-status callback resolves it.
#[allow(async_fn_in_trait)]
pub trait PayoutProvider: Clone {
    async fn send_payout(&self, request: &PayoutRequest) -> Result<PayoutOutcome, PayoutProviderError>;
}

//--------------------------------------     PayoutRequest     -------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutRequest {
    pub withdrawal_id: String,
    pub seller_id: String,
    pub amount: Reais,
    pub payout_key: String,
    /// Carries the withdrawal id behind the standard prefix so asynchronous callbacks can be routed back.
    pub description: String,
}

//--------------------------------------     PayoutOutcome     -------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PayoutOutcome {
    /// The provider accepted the transfer. `provider_id` is its reference for the transfer, when given.
    Succeeded { provider_id: Option<String> },
    /// The provider definitively refused the transfer. Funds never left.
    Rejected { reason: String },
    /// The provider requires a manual step (e.g. destination verification) before it will move funds.
    ManualInterventionRequired,
}

//--------------------------------------  PayoutProviderError  -------------------------------------------------------

/// Errors where the state of the transfer is unknown. Callers must not revert the withdrawal on these.
#[derive(Debug, Error)]
pub enum PayoutProviderError {
    #[error("Could not reach the payout provider: {0}")]
    Transport(String),
    #[error("Unexpected response from the payout provider: {0}")]
    InvalidResponse(String),
}
