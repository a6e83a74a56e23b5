use std::time::Duration;

use log::{debug, trace, warn};
use lps_common::Secret;
use serde::Deserialize;
use serde_json::json;
use settlement_engine::traits::{PayoutOutcome, PayoutProvider, PayoutProviderError, PayoutRequest};

use crate::config::PayoutConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Transfer statuses that mean the provider will not move the funds without a manual step on its side.
const MANUAL_AUTHORIZATION_STATUSES: [&str; 2] = ["AWAITING_AUTHORIZATION", "AWAITING_MANUAL_AUTHORIZATION"];

/// The payout provider's transfer API.
#[derive(Clone)]
pub struct PayoutClient {
    client: reqwest::Client,
    base_url: String,
    access_token: Secret<String>,
}

impl PayoutClient {
    pub fn new(config: &PayoutConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TransferResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TransferErrorResponse {
    #[serde(default)]
    errors: Vec<TransferErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct TransferErrorDetail {
    #[serde(default)]
    description: String,
}

impl PayoutProvider for PayoutClient {
    async fn send_payout(&self, request: &PayoutRequest) -> Result<PayoutOutcome, PayoutProviderError> {
        if self.base_url.is_empty() {
            warn!(
                "🏧️ No payout provider configured. Withdrawal {} needs a manual transfer.",
                request.withdrawal_id
            );
            return Ok(PayoutOutcome::ManualInterventionRequired);
        }
        trace!("🏧️ Sending transfer for withdrawal {} ({})", request.withdrawal_id, request.amount);
        let body = json!({
            "value": request.amount.value() as f64 / 100.0,
            "pixAddressKey": request.payout_key,
            "description": request.description,
            "externalReference": request.withdrawal_id,
        });
        let response = self
            .client
            .post(format!("{}/transfers", self.base_url))
            .header("access_token", self.access_token.reveal())
            .json(&body)
            .send()
            .await
            .map_err(|e| PayoutProviderError::Transport(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            let transfer: TransferResponse =
                response.json().await.map_err(|e| PayoutProviderError::InvalidResponse(e.to_string()))?;
            let transfer_status = transfer.status.as_deref().unwrap_or_default();
            if MANUAL_AUTHORIZATION_STATUSES.contains(&transfer_status) {
                debug!(
                    "🏧️ Transfer {:?} for withdrawal {} awaits manual authorization",
                    transfer.id, request.withdrawal_id
                );
                return Ok(PayoutOutcome::ManualInterventionRequired);
            }
            debug!("🏧️ Transfer {:?} accepted for withdrawal {}", transfer.id, request.withdrawal_id);
            Ok(PayoutOutcome::Succeeded { provider_id: transfer.id })
        } else if status.is_client_error() {
            // A 4xx is a definitive refusal; the transfer was not created.
            let reason = match response.json::<TransferErrorResponse>().await {
                Ok(body) if !body.errors.is_empty() => {
                    body.errors.into_iter().map(|e| e.description).collect::<Vec<_>>().join("; ")
                },
                _ => format!("Transfer refused with status {status}"),
            };
            warn!("🏧️ Transfer for withdrawal {} refused: {reason}", request.withdrawal_id);
            Ok(PayoutOutcome::Rejected { reason })
        } else {
            // A 5xx leaves the transfer's existence unknown; the caller must not revert.
            Err(PayoutProviderError::InvalidResponse(format!("Provider answered {status}")))
        }
    }
}
