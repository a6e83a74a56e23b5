#![allow(dead_code)]
use lps_common::Reais;
use settlement_engine::{
    api::{SettlementApi, SettlementConfig},
    db_types::{NewOrder, NewOrderItem, Order, OrderId},
    helpers::object_id,
    traits::{PaymentConfirmation, SettlementDatabase},
    SqliteDatabase,
};

/// Creates a fresh file-backed database for one test. File-backed rather than in-memory so that every
/// pooled connection sees the same data.
pub async fn new_db() -> SqliteDatabase {
    let _ = env_logger::try_init();
    let path = std::env::temp_dir().join(format!("lumen_{}.db", object_id("test")));
    let url = format!("sqlite://{}", path.display());
    SqliteDatabase::new_with_url(&url, 5).await.unwrap()
}

pub fn test_config() -> SettlementConfig {
    SettlementConfig::default()
}

pub fn api(db: &SqliteDatabase) -> SettlementApi<SqliteDatabase> {
    SettlementApi::new(db.clone(), test_config())
}

pub async fn seed_seller(db: &SqliteDatabase, seller_id: &str, payout_key: Option<&str>) {
    db.upsert_seller(seller_id, payout_key).await.unwrap();
}

pub fn single_item_order(order_id: &str, seller_id: &str, price: Reais) -> NewOrder {
    NewOrder::new(OrderId::from(order_id.to_string()), "buyer-1".to_string()).with_item(NewOrderItem {
        photo_id: object_id("ph"),
        photo_title: "Finish line".to_string(),
        seller_id: seller_id.to_string(),
        price_paid: price,
    })
}

/// Creates an order for a single seller, attaches `payment_id` and confirms the payment.
pub async fn settle_single_item_order(
    db: &SqliteDatabase,
    order_id: &str,
    seller_id: &str,
    price: Reais,
    payment_id: &str,
) -> Order {
    let api = api(db);
    let order = api.create_order(single_item_order(order_id, seller_id, price)).await.unwrap();
    api.attach_payment_intent(&order.id, payment_id).await.unwrap();
    match api.payment_approved(payment_id).await.unwrap() {
        PaymentConfirmation::Settled(summary) => summary.order,
        other => panic!("expected settlement, got {other:?}"),
    }
}
