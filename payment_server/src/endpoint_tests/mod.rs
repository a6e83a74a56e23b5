//! Endpoint tests.
//!
//! These spin up an in-process actix app over a throwaway database, with the gateway and payout provider
//! replaced by stubs, and exercise the HTTP surface end to end.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use actix_web::{http::StatusCode, test, web, App};
use chrono::Utc;
use lps_common::{Reais, Secret};
use settlement_engine::{
    api::{LedgerApi, PayoutApi, SettlementApi, SettlementConfig},
    db_types::{NewOrder, NewOrderItem, OrderId},
    helpers::object_id,
    traits::{
        GatewayError,
        PaymentGateway,
        PaymentInfo,
        PaymentIntent,
        PaymentStatus,
        PayoutOutcome,
        PayoutProvider,
        PayoutProviderError,
        PayoutRequest,
        SettlementDatabase,
    },
    SqliteDatabase,
};

use crate::{
    data_objects::{BalanceResponse, OrderCreatedResponse, WebhookAck},
    helpers::{calculate_signature, signature_manifest},
    middleware::{AccessTokenMiddlewareFactory, SignatureMiddlewareFactory},
    routes::{health, BalanceRoute, NewOrderRoute},
    webhook_routes::{PaymentWebhookRoute, TransferEventsRoute},
};

const API_KEY: &str = "test-api-key";
const TRANSFER_TOKEN: &str = "test-transfer-token";
const WEBHOOK_SECRET: &str = "test-webhook-secret";

#[derive(Clone, Default)]
struct StubGateway {
    payments: Arc<Mutex<HashMap<String, PaymentStatus>>>,
}

impl StubGateway {
    fn with_payment(self, payment_id: &str, status: PaymentStatus) -> Self {
        self.payments.lock().unwrap().insert(payment_id.to_string(), status);
        self
    }
}

impl PaymentGateway for StubGateway {
    async fn create_payment(
        &self,
        order_id: &str,
        _amount: Reais,
        _buyer_id: &str,
    ) -> Result<PaymentIntent, GatewayError> {
        Ok(PaymentIntent {
            payment_id: format!("pay-{order_id}"),
            checkout_url: format!("https://gateway.test/checkout/{order_id}"),
        })
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentInfo, GatewayError> {
        let status = self.payments.lock().unwrap().get(payment_id).copied();
        match status {
            Some(status) => Ok(PaymentInfo {
                payment_id: payment_id.to_string(),
                status,
                external_reference: None,
                amount: None,
            }),
            None => Err(GatewayError::ApiError { code: 404, message: "payment not found".to_string() }),
        }
    }
}

#[derive(Clone, Default)]
struct StubProvider;

impl PayoutProvider for StubProvider {
    async fn send_payout(&self, _request: &PayoutRequest) -> Result<PayoutOutcome, PayoutProviderError> {
        Ok(PayoutOutcome::Succeeded { provider_id: Some("tr_test".to_string()) })
    }
}

async fn test_db() -> SqliteDatabase {
    let _ = env_logger::try_init();
    let path = std::env::temp_dir().join(format!("lps_endpoint_{}.db", object_id("t")));
    SqliteDatabase::new_with_url(&format!("sqlite://{}", path.display()), 5).await.unwrap()
}

fn apis(db: &SqliteDatabase) -> (SettlementApi<SqliteDatabase>, PayoutApi<SqliteDatabase, StubProvider>, LedgerApi<SqliteDatabase>) {
    let config = SettlementConfig::default();
    (
        SettlementApi::new(db.clone(), config),
        PayoutApi::new(db.clone(), StubProvider, config),
        LedgerApi::new(db.clone()),
    )
}

/// Seeds one seller with a payout key plus a pending order carrying `payment_id`.
async fn seed_order(db: &SqliteDatabase, payment_id: &str) {
    db.upsert_seller("alice", Some("alice@pix")).await.unwrap();
    let order = NewOrder::new(OrderId::from("ord-1".to_string()), "buyer-1".to_string()).with_item(NewOrderItem {
        photo_id: "ph-1".to_string(),
        photo_title: "Finish line".to_string(),
        seller_id: "alice".to_string(),
        price_paid: Reais::from_cents(10_000),
    });
    let order = db.create_order(order).await.unwrap();
    db.attach_payment_intent(&order.id, payment_id).await.unwrap();
}

#[actix_web::test]
async fn health_endpoint_answers() {
    let app = test::init_service(App::new().service(health)).await;
    let req = test::TestRequest::get().uri("/health").to_request();
    let res = test::call_service(&app, req).await;
    assert!(res.status().is_success());
}

#[actix_web::test]
async fn payment_webhook_settles_and_acknowledges_replays() {
    let db = test_db().await;
    seed_order(&db, "pay-1").await;
    let gateway = StubGateway::default().with_payment("pay-1", PaymentStatus::Approved);
    let (settlement, _, _) = apis(&db);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(settlement))
            .app_data(web::Data::new(gateway))
            .service(
                web::scope("/webhooks/payment")
                    .service(PaymentWebhookRoute::<SqliteDatabase, StubGateway>::new()),
            ),
    )
    .await;

    let payload = serde_json::json!({ "type": "payment", "data": { "id": "pay-1" } });
    let req = test::TestRequest::post().uri("/webhooks/payment").set_json(&payload).to_request();
    let ack: WebhookAck = test::call_and_read_body_json(&app, req).await;
    assert!(ack.received);
    assert_eq!(ack.message, "Settled");

    let req = test::TestRequest::post().uri("/webhooks/payment").set_json(&payload).to_request();
    let ack: WebhookAck = test::call_and_read_body_json(&app, req).await;
    assert!(ack.received);
    assert_eq!(ack.message, "Already processed");
}

#[actix_web::test]
async fn payment_webhook_checks_signatures_when_enabled() {
    let db = test_db().await;
    seed_order(&db, "pay-1").await;
    let gateway = StubGateway::default().with_payment("pay-1", PaymentStatus::Approved);
    let (settlement, _, _) = apis(&db);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(settlement))
            .app_data(web::Data::new(gateway))
            .service(
                web::scope("/webhooks/payment")
                    .wrap(SignatureMiddlewareFactory::new(Secret::new(WEBHOOK_SECRET.to_string()), 300, true))
                    .service(PaymentWebhookRoute::<SqliteDatabase, StubGateway>::new()),
            ),
    )
    .await;

    let payload = serde_json::json!({ "type": "payment", "data": { "id": "pay-1" } });
    let req = test::TestRequest::post().uri("/webhooks/payment?data.id=pay-1").set_json(&payload).to_request();
    let err = test::try_call_service(&app, req).await.unwrap_err();
    assert_eq!(err.as_response_error().status_code(), StatusCode::FORBIDDEN);

    let ts = Utc::now().timestamp();
    let manifest = signature_manifest("pay-1", "req-1", ts);
    let v1 = calculate_signature(WEBHOOK_SECRET, &manifest).unwrap();
    let req = test::TestRequest::post()
        .uri("/webhooks/payment?data.id=pay-1")
        .insert_header(("x-request-id", "req-1"))
        .insert_header(("x-signature", format!("ts={ts},v1={v1}")))
        .set_json(&payload)
        .to_request();
    let ack: WebhookAck = test::call_and_read_body_json(&app, req).await;
    assert_eq!(ack.message, "Settled");
}

#[actix_web::test]
async fn transfer_webhook_requires_the_token_when_configured() {
    let db = test_db().await;
    let (_, payouts, _) = apis(&db);
    let app = test::init_service(
        App::new().app_data(web::Data::new(payouts)).service(
            web::scope("/webhooks/transfer-events")
                .wrap(AccessTokenMiddlewareFactory::optional(
                    "lps-transfer-token",
                    Secret::new(TRANSFER_TOKEN.to_string()),
                ))
                .service(TransferEventsRoute::<SqliteDatabase, StubProvider>::new()),
        ),
    )
    .await;

    let payload = serde_json::json!({
        "event": "TRANSFER_FAILED",
        "transfer": { "id": "tr_1", "description": "Rent for March" }
    });
    let req = test::TestRequest::post().uri("/webhooks/transfer-events").set_json(&payload).to_request();
    let err = test::try_call_service(&app, req).await.unwrap_err();
    assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/webhooks/transfer-events")
        .insert_header(("lps-transfer-token", TRANSFER_TOKEN))
        .set_json(&payload)
        .to_request();
    let ack: WebhookAck = test::call_and_read_body_json(&app, req).await;
    assert_eq!(ack.message, "Ignored");
}

#[actix_web::test]
async fn transfer_webhook_stays_open_without_a_configured_token() {
    let db = test_db().await;
    let (_, payouts, _) = apis(&db);
    // The token is opt-in. A deployment that never set one must still receive failure callbacks, or
    // failed payouts would stay blocked forever.
    let app = test::init_service(
        App::new().app_data(web::Data::new(payouts)).service(
            web::scope("/webhooks/transfer-events")
                .wrap(AccessTokenMiddlewareFactory::optional("lps-transfer-token", Secret::default()))
                .service(TransferEventsRoute::<SqliteDatabase, StubProvider>::new()),
        ),
    )
    .await;

    let payload = serde_json::json!({
        "event": "TRANSFER_FAILED",
        "transfer": { "id": "tr_1", "description": "Rent for March" }
    });
    let req = test::TestRequest::post().uri("/webhooks/transfer-events").set_json(&payload).to_request();
    let ack: WebhookAck = test::call_and_read_body_json(&app, req).await;
    assert!(ack.received);
    assert_eq!(ack.message, "Ignored");
}

#[actix_web::test]
async fn api_scope_requires_the_access_key() {
    let db = test_db().await;
    let (_, _, ledger) = apis(&db);
    let app = test::init_service(
        App::new().app_data(web::Data::new(ledger)).service(
            web::scope("/api")
                .wrap(AccessTokenMiddlewareFactory::new("lps-api-key", Secret::new(API_KEY.to_string())))
                .service(BalanceRoute::<SqliteDatabase>::new()),
        ),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/balance/alice").to_request();
    let err = test::try_call_service(&app, req).await.unwrap_err();
    assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);

    let req =
        test::TestRequest::get().uri("/api/balance/alice").insert_header(("lps-api-key", API_KEY)).to_request();
    let balance: BalanceResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(balance.available, Reais::zero());
    assert_eq!(balance.blocked, Reais::zero());
}

#[actix_web::test]
async fn api_scope_stays_closed_without_a_configured_key() {
    let db = test_db().await;
    let (_, _, ledger) = apis(&db);
    let app = test::init_service(
        App::new().app_data(web::Data::new(ledger)).service(
            web::scope("/api")
                .wrap(AccessTokenMiddlewareFactory::new("lps-api-key", Secret::default()))
                .service(BalanceRoute::<SqliteDatabase>::new()),
        ),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/balance/alice").to_request();
    let err = test::try_call_service(&app, req).await.unwrap_err();
    assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn orders_are_created_with_a_checkout() {
    let db = test_db().await;
    db.upsert_seller("alice", Some("alice@pix")).await.unwrap();
    let (settlement, _, _) = apis(&db);
    let gateway = StubGateway::default();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(settlement))
            .app_data(web::Data::new(gateway))
            .service(
                web::scope("/api")
                    .wrap(AccessTokenMiddlewareFactory::new("lps-api-key", Secret::new(API_KEY.to_string())))
                    .service(NewOrderRoute::<SqliteDatabase, StubGateway>::new()),
            ),
    )
    .await;

    let payload = serde_json::json!({
        "order_id": "ord-1",
        "buyer_id": "buyer-1",
        "items": [{
            "photo_id": "ph-1",
            "photo_title": "Finish line",
            "seller_id": "alice",
            "price_cents": 10_000
        }]
    });
    let req = test::TestRequest::post()
        .uri("/api/orders")
        .insert_header(("lps-api-key", API_KEY))
        .set_json(&payload)
        .to_request();
    let res: OrderCreatedResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(res.payment_id, "pay-ord-1");
    assert_eq!(res.order.total, Reais::from_cents(10_000));
    assert_eq!(res.order.external_payment_id.as_deref(), Some("pay-ord-1"));
}
