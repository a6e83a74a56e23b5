use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderItem},
    traits::SettlementError,
};

/// Inserts a new order and its items in `Pending` status. This is not atomic on its own. Callers wrap it
/// in a transaction and pass `&mut *tx` as the connection argument.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, SettlementError> {
    if order.items.is_empty() {
        return Err(SettlementError::EmptyOrder(order.order_id));
    }
    if fetch_order_by_order_id(&order.order_id, conn).await?.is_some() {
        return Err(SettlementError::OrderAlreadyExists(order.order_id));
    }
    let total = order.total();
    let inserted: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (id, buyer_id, total)
            VALUES ($1, $2, $3)
            RETURNING *;
        "#,
    )
    .bind(order.order_id.as_str())
    .bind(&order.buyer_id)
    .bind(total)
    .fetch_one(&mut *conn)
    .await?;
    for item in &order.items {
        sqlx::query(
            r#"
                INSERT INTO order_items (order_id, photo_id, photo_title, seller_id, price_paid)
                VALUES ($1, $2, $3, $4, $5);
            "#,
        )
        .bind(inserted.id.as_str())
        .bind(&item.photo_id)
        .bind(&item.photo_title)
        .bind(&item.seller_id)
        .bind(item.price_paid)
        .execute(&mut *conn)
        .await?;
    }
    debug!("📝️ Order {} inserted with {} item(s), total {total}", inserted.id, order.items.len());
    Ok(inserted)
}

pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_by_payment_id(
    payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE external_payment_id = $1")
        .bind(payment_id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_order_items(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(items)
}

/// Records the gateway payment id against an order. The write is conditional on the order not already
/// carrying a *different* payment id, so re-attaching the same id is a harmless no-op.
pub async fn attach_payment_id(
    order_id: &OrderId,
    payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Order, SettlementError> {
    let updated: Option<Order> = sqlx::query_as(
        r#"
            UPDATE orders SET external_payment_id = $2, updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND (external_payment_id IS NULL OR external_payment_id = $2)
            RETURNING *;
        "#,
    )
    .bind(order_id.as_str())
    .bind(payment_id)
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(order) => Ok(order),
        None => match fetch_order_by_order_id(order_id, conn).await? {
            Some(order) => Err(SettlementError::PaymentAlreadyAttached {
                order_id: order.id,
                existing: order.external_payment_id.unwrap_or_default(),
            }),
            None => Err(SettlementError::OrderNotFound(order_id.clone())),
        },
    }
}

/// Flips an order to `Paid` unless it already is. Returns `None` for replayed payment notifications.
/// A `Cancelled` order still moves here. Gateways sometimes report a rejection and then an approval for
/// the same payment, and the approval is the word that counts.
pub async fn mark_paid(payment_id: &str, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET status = 'Paid', updated_at = CURRENT_TIMESTAMP
            WHERE external_payment_id = $1 AND status != 'Paid'
            RETURNING *;
        "#,
    )
    .bind(payment_id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Flips a `Pending` order to `Cancelled`. Paid orders are never touched.
pub async fn mark_cancelled(payment_id: &str, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET status = 'Cancelled', updated_at = CURRENT_TIMESTAMP
            WHERE external_payment_id = $1 AND status = 'Pending'
            RETURNING *;
        "#,
    )
    .bind(payment_id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Stamps `refunded_at` on a paid, not-yet-refunded order. The stamp is the refund idempotency guard;
/// `None` means a duplicate refund notification.
pub async fn stamp_refunded(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET refunded_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND status = 'Paid' AND refunded_at IS NULL
            RETURNING *;
        "#,
    )
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}
