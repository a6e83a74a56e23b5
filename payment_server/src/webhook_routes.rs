//----------------------------------------------   Webhooks  ----------------------------------------------------
//! Webhook handlers for the payment gateway and the payout provider.
//!
//! Both parties redeliver notifications until they see a 2xx, so once a request clears its guard
//! middleware the handlers always answer 200 with a [`WebhookAck`] body, even when there was nothing to
//! do. The notification body itself is never trusted for money movement: the payment's authoritative
//! state is re-fetched from the gateway before the engine acts on it.
use actix_web::{get, web, HttpRequest, HttpResponse};
use log::{debug, info, trace, warn};
use settlement_engine::{
    api::{PayoutApi, SettlementApi},
    traits::{
        CancellationOutcome,
        PaymentConfirmation,
        PaymentGateway,
        PaymentStatus,
        PayoutProvider,
        RefundOutcome,
        SettlementBackend,
        TransferEvent,
    },
};

use crate::{
    data_objects::{PaymentNotification, WebhookAck},
    helpers::query_param,
    route,
};

route!(payment_webhook => Post "" impl SettlementBackend, PaymentGateway);
/// Handles a payment notification from the gateway. The notification carries only a payment id; the
/// payment is re-fetched and its authoritative status drives the settlement pipeline.
pub async fn payment_webhook<B, G>(
    req: HttpRequest,
    body: web::Json<PaymentNotification>,
    api: web::Data<SettlementApi<B>>,
    gateway: web::Data<G>,
) -> HttpResponse
where
    B: SettlementBackend,
    G: PaymentGateway,
{
    trace!("💱️ Received payment notification: {}", req.uri());
    let notification = body.into_inner();
    if !notification.is_payment() {
        debug!("💱️ Ignoring notification of type {:?}", notification.notification_type);
        return HttpResponse::Ok().json(WebhookAck::new("Ignored"));
    }
    let payment_id = match notification.payment_id().or_else(|| {
        query_param(req.query_string(), "data.id").map(str::to_string)
    }) {
        Some(id) => id,
        None => {
            warn!("💱️ Payment notification carried no payment id");
            return HttpResponse::Ok().json(WebhookAck::new("No payment id"));
        },
    };
    let payment = match gateway.fetch_payment(&payment_id).await {
        Ok(payment) => payment,
        Err(e) => {
            // Answering non-2xx makes the gateway redeliver once the lookup works again.
            warn!("💱️ Could not fetch payment {payment_id} from the gateway. {e}");
            return HttpResponse::BadGateway().json(WebhookAck::new("Payment lookup failed"));
        },
    };
    let ack = match payment.status {
        PaymentStatus::Approved => match api.payment_approved(&payment_id).await {
            Ok(PaymentConfirmation::Settled(summary)) => {
                cross_check_reference(&summary.order.id.to_string(), payment.external_reference.as_deref());
                info!("💱️ Payment {payment_id} settled order {}", summary.order.id);
                WebhookAck::new("Settled")
            },
            Ok(PaymentConfirmation::AlreadyProcessed(order_id)) => {
                info!("💱️ Payment {payment_id} for order {order_id} was already processed");
                WebhookAck::new("Already processed")
            },
            Ok(PaymentConfirmation::OrderNotFound) => {
                warn!("💱️ No order found for approved payment {payment_id}");
                WebhookAck::new("Order not found")
            },
            Err(e) => {
                warn!("💱️ Could not settle payment {payment_id}. {e}");
                return HttpResponse::InternalServerError().json(WebhookAck::new("Settlement failed"));
            },
        },
        PaymentStatus::Rejected | PaymentStatus::Cancelled => match api.payment_rejected(&payment_id).await {
            Ok(CancellationOutcome::Cancelled(order_id)) => {
                info!("💱️ Payment {payment_id} was {:?}. Order {order_id} cancelled", payment.status);
                WebhookAck::new("Cancelled")
            },
            Ok(_) => WebhookAck::new("Nothing to cancel"),
            Err(e) => {
                warn!("💱️ Could not cancel order for payment {payment_id}. {e}");
                return HttpResponse::InternalServerError().json(WebhookAck::new("Cancellation failed"));
            },
        },
        PaymentStatus::Refunded | PaymentStatus::ChargedBack => match api.payment_refunded(&payment_id).await {
            Ok(RefundOutcome::Refunded(summary)) => {
                info!("💱️ Payment {payment_id} refunded. Order {} credits reversed", summary.order_id);
                WebhookAck::new("Refunded")
            },
            Ok(RefundOutcome::AlreadyRefunded(order_id)) => {
                info!("💱️ Refund for payment {payment_id} (order {order_id}) was already processed");
                WebhookAck::new("Already processed")
            },
            Ok(_) => WebhookAck::new("Nothing to refund"),
            Err(e) => {
                warn!("💱️ Could not process refund for payment {payment_id}. {e}");
                return HttpResponse::InternalServerError().json(WebhookAck::new("Refund failed"));
            },
        },
        status => {
            debug!("💱️ Payment {payment_id} is {status:?}. Nothing to do");
            WebhookAck::new("Ignored")
        },
    };
    HttpResponse::Ok().json(ack)
}

/// The gateway probes the webhook URL with a GET when it is registered.
#[get("")]
pub async fn payment_webhook_probe() -> HttpResponse {
    trace!("💱️ Payment webhook probe");
    HttpResponse::Ok().json(WebhookAck::new("Ready"))
}

fn cross_check_reference(order_id: &str, external_reference: Option<&str>) {
    if let Some(reference) = external_reference {
        if reference != order_id.trim_start_matches('#') {
            warn!("💱️ Gateway reference {reference} does not match order {order_id}. Proceeding with our record");
        }
    }
}

route!(transfer_events => Post "" impl SettlementBackend, PayoutProvider);
/// Handles a transfer-status callback from the payout provider. Failure events revert the matching
/// withdrawal; everything else is acknowledged and dropped.
pub async fn transfer_events<B, P>(
    body: web::Json<TransferEvent>,
    api: web::Data<PayoutApi<B, P>>,
) -> HttpResponse
where
    B: SettlementBackend,
    P: PayoutProvider,
{
    let event = body.into_inner();
    debug!("🏧️ Received transfer event {:?} for transfer {}", event.event, event.transfer.id);
    match api.handle_transfer_event(&event).await {
        Ok(Some(resolution)) => match resolution.request() {
            Some(request) => {
                info!("🏧️ Transfer event resolved withdrawal {} as {}", request.id, request.status);
                HttpResponse::Ok().json(WebhookAck::new(format!("Withdrawal {}", request.status)))
            },
            None => HttpResponse::Ok().json(WebhookAck::new("Withdrawal not found")),
        },
        Ok(None) => HttpResponse::Ok().json(WebhookAck::new("Ignored")),
        Err(e) => {
            warn!("🏧️ Could not process transfer event for transfer {}. {e}", event.transfer.id);
            HttpResponse::InternalServerError().json(WebhookAck::new("Event processing failed"))
        },
    }
}
