use std::time::Duration;

use log::{debug, trace};
use lps_common::{Reais, Secret, BRL_CURRENCY_CODE};
use serde::Deserialize;
use serde_json::json;
use settlement_engine::traits::{GatewayError, PaymentGateway, PaymentInfo, PaymentIntent, PaymentStatus};

use crate::config::GatewayConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The payment gateway's REST API: opens checkouts and fetches authoritative payment records.
#[derive(Clone)]
pub struct GatewayClient {
    client: reqwest::Client,
    base_url: String,
    access_token: Secret<String>,
}

impl GatewayClient {
    pub fn new(config: &GatewayConfig) -> Self {
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

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[derive(Debug, Deserialize)]
struct CheckoutResponse {
    id: serde_json::Value,
    init_point: String,
}

#[derive(Debug, Deserialize)]
struct PaymentResponse {
    id: serde_json::Value,
    status: String,
    #[serde(default)]
    external_reference: Option<String>,
    #[serde(default)]
    transaction_amount: Option<f64>,
}

impl PaymentGateway for GatewayClient {
    async fn create_payment(
        &self,
        order_id: &str,
        amount: Reais,
        buyer_id: &str,
    ) -> Result<PaymentIntent, GatewayError> {
        trace!("💱️ Opening a checkout for order {order_id} ({amount})");
        // The gateway takes decimal currency amounts.
        let body = json!({
            "external_reference": order_id,
            "items": [{
                "title": format!("Order {order_id}"),
                "quantity": 1,
                "currency_id": BRL_CURRENCY_CODE,
                "unit_price": amount.value() as f64 / 100.0,
            }],
            "metadata": { "buyer_id": buyer_id },
        });
        let response = self
            .client
            .post(self.url("/checkout/preferences"))
            .bearer_auth(self.access_token.reveal())
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::ApiError { code: status.as_u16(), message });
        }
        let checkout: CheckoutResponse =
            response.json().await.map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        let payment_id = json_id_to_string(&checkout.id)
            .ok_or_else(|| GatewayError::InvalidResponse("checkout response carried no id".to_string()))?;
        debug!("💱️ Checkout {payment_id} opened for order {order_id}");
        Ok(PaymentIntent { payment_id, checkout_url: checkout.init_point })
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentInfo, GatewayError> {
        trace!("💱️ Fetching payment {payment_id}");
        let response = self
            .client
            .get(self.url(&format!("/v1/payments/{payment_id}")))
            .bearer_auth(self.access_token.reveal())
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::ApiError { code: status.as_u16(), message });
        }
        let payment: PaymentResponse =
            response.json().await.map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        let id = json_id_to_string(&payment.id)
            .ok_or_else(|| GatewayError::InvalidResponse("payment response carried no id".to_string()))?;
        Ok(PaymentInfo {
            payment_id: id,
            status: PaymentStatus::from_gateway(&payment.status),
            external_reference: payment.external_reference,
            amount: payment.transaction_amount.map(|v| Reais::from_cents((v * 100.0).round() as i64)),
        })
    }
}

fn json_id_to_string(id: &serde_json::Value) -> Option<String> {
    match id {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
