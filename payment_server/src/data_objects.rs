use std::fmt::Display;

use lps_common::Reais;
use serde::{Deserialize, Serialize};
use settlement_engine::db_types::{Balance, NewOrder, NewOrderItem, OrderId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// The acknowledgement body for webhook notifications. Notifications are always acknowledged with a 200
/// once they reach a handler; `message` says what, if anything, was done.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
    pub message: String,
}

impl WebhookAck {
    pub fn new<S: Display>(message: S) -> Self {
        Self { received: true, message: message.to_string() }
    }
}

/// The payment gateway's notification body. Only the payment id is taken from it; everything else is
/// re-fetched from the gateway before any money moves.
///
/// The gateway sends two payload shapes depending on the notification channel: `type`/`data.id` and the
/// older `topic`/`resource` pair, where `resource` is either the payment id or a URL ending in it.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentNotification {
    #[serde(rename = "type", default)]
    pub notification_type: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub data: Option<NotificationData>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub resource: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationData {
    pub id: serde_json::Value,
}

impl PaymentNotification {
    pub fn is_payment(&self) -> bool {
        self.notification_type.as_deref() == Some("payment") || self.topic.as_deref() == Some("payment")
    }

    /// The payment id, normalised to a string (the gateway sends it as a number in some payloads).
    pub fn payment_id(&self) -> Option<String> {
        if let Some(id) = self.data.as_ref().and_then(|data| match &data.id {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }) {
            return Some(id);
        }
        let resource = self.resource.as_deref()?;
        match resource.trim_end_matches('/').rsplit('/').next() {
            Some(id) if !id.is_empty() => Some(id.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub order_id: String,
    pub buyer_id: String,
    pub items: Vec<OrderItemRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemRequest {
    pub photo_id: String,
    pub photo_title: String,
    pub seller_id: String,
    pub price_cents: i64,
}

impl From<OrderRequest> for NewOrder {
    fn from(req: OrderRequest) -> Self {
        let mut order = NewOrder::new(OrderId::from(req.order_id), req.buyer_id);
        for item in req.items {
            order = order.with_item(NewOrderItem {
                photo_id: item.photo_id,
                photo_title: item.photo_title,
                seller_id: item.seller_id,
                price_paid: Reais::from_cents(item.price_cents),
            });
        }
        order
    }
}

/// The response to a new order: the stored order plus the gateway checkout hand-off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreatedResponse {
    pub order: settlement_engine::db_types::Order,
    pub payment_id: String,
    pub checkout_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellerRequest {
    pub seller_id: String,
    #[serde(default)]
    pub payout_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutKeyRequest {
    pub payout_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalParams {
    pub seller_id: String,
    pub amount_cents: i64,
}

/// A seller's balance along with the total still reserved by open withdrawals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub seller_id: String,
    pub available: Reais,
    pub blocked: Reais,
    pub pending_withdrawals: Reais,
}

impl BalanceResponse {
    pub fn new(balance: Balance, pending_withdrawals: Reais) -> Self {
        Self { seller_id: balance.seller_id, available: balance.available, blocked: balance.blocked, pending_withdrawals }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn data_id_notifications() {
        let n: PaymentNotification =
            serde_json::from_str(r#"{"type":"payment","action":"payment.updated","data":{"id":12345}}"#).unwrap();
        assert!(n.is_payment());
        assert_eq!(n.payment_id().as_deref(), Some("12345"));
    }

    #[test]
    fn topic_resource_notifications() {
        let n: PaymentNotification = serde_json::from_str(
            r#"{"topic":"payment","resource":"https://api.gateway.example/v1/payments/67890"}"#,
        )
        .unwrap();
        assert!(n.is_payment());
        assert_eq!(n.payment_id().as_deref(), Some("67890"));
    }

    #[test]
    fn other_topics_are_not_payments() {
        let n: PaymentNotification =
            serde_json::from_str(r#"{"topic":"merchant_order","resource":"https://x/orders/1"}"#).unwrap();
        assert!(!n.is_payment());
    }
}
