//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! Handlers are generic over the storage backend and the external collaborators so that endpoint tests can
//! run them against stubs. Since actix cannot register generic handlers directly, each route gets a
//! concrete registration struct via the `route!` macro.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use settlement_engine::{
    api::{LedgerApi, PayoutApi, SettlementApi},
    db_types::OrderId,
    traits::{PaymentGateway, PayoutProvider, SettlementBackend},
};

use crate::{
    data_objects::{
        BalanceResponse,
        OrderCreatedResponse,
        OrderRequest,
        PayoutKeyRequest,
        SellerRequest,
        WithdrawalParams,
    },
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(new_order => Post "/orders" impl SettlementBackend, PaymentGateway);
/// Creates a new order and opens a checkout with the payment gateway. The gateway's payment id is stored
/// against the order so that later notifications can find it.
pub async fn new_order<B, G>(
    body: web::Json<OrderRequest>,
    api: web::Data<SettlementApi<B>>,
    gateway: web::Data<G>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementBackend,
    G: PaymentGateway,
{
    let request = body.into_inner();
    debug!("💻️ POST new order {} with {} item(s)", request.order_id, request.items.len());
    let order = api.create_order(request.into()).await?;
    let intent = gateway.create_payment(order.id.as_str(), order.total, &order.buyer_id).await.map_err(|e| {
        warn!("💻️ Could not open a checkout for order {}. {e}", order.id);
        ServerError::BackendError(format!("Could not open a checkout with the payment gateway. {e}"))
    })?;
    let order = api.attach_payment_intent(&order.id, &intent.payment_id).await?;
    let response =
        OrderCreatedResponse { order, payment_id: intent.payment_id, checkout_url: intent.checkout_url };
    Ok(HttpResponse::Created().json(response))
}

route!(order_by_id => Get "/orders/{order_id}" impl SettlementBackend);
pub async fn order_by_id<B: SettlementBackend>(
    path: web::Path<String>,
    api: web::Data<LedgerApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    trace!("💻️ GET order {order_id}");
    let order = api
        .order(&order_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id} not found")))?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Sellers  ----------------------------------------------------
route!(upsert_seller => Post "/sellers" impl SettlementBackend);
pub async fn upsert_seller<B: SettlementBackend>(
    body: web::Json<SellerRequest>,
    api: web::Data<SettlementApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let request = body.into_inner();
    debug!("💻️ POST upsert seller {}", request.seller_id);
    let seller = match request.payout_key.as_deref() {
        Some(key) => api.set_payout_key(&request.seller_id, key).await?,
        None => api.register_seller(&request.seller_id).await?,
    };
    Ok(HttpResponse::Ok().json(seller))
}

route!(set_payout_key => Put "/sellers/{seller_id}/payout-key" impl SettlementBackend);
pub async fn set_payout_key<B: SettlementBackend>(
    path: web::Path<String>,
    body: web::Json<PayoutKeyRequest>,
    api: web::Data<SettlementApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let seller_id = path.into_inner();
    let key = body.into_inner().payout_key;
    if key.trim().is_empty() {
        return Err(ServerError::InvalidRequestBody("The payout key must not be empty".to_string()));
    }
    let seller = api.set_payout_key(&seller_id, &key).await?;
    Ok(HttpResponse::Ok().json(seller))
}

route!(replay_transfers => Post "/sellers/{seller_id}/pending-transfers/process" impl SettlementBackend, PayoutProvider);
/// Credits every parked transfer for a seller that has completed payout setup since the sales happened.
pub async fn replay_transfers<B, P>(
    path: web::Path<String>,
    api: web::Data<PayoutApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementBackend,
    P: PayoutProvider,
{
    let seller_id = path.into_inner();
    debug!("💻️ POST replay pending transfers for seller {seller_id}");
    let outcome = api.replay_pending_transfers(&seller_id).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

//----------------------------------------------   Ledger  ----------------------------------------------------
route!(balance => Get "/balance/{seller_id}" impl SettlementBackend);
pub async fn balance<B: SettlementBackend>(
    path: web::Path<String>,
    api: web::Data<LedgerApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let seller_id = path.into_inner();
    trace!("💻️ GET balance for seller {seller_id}");
    let balance = api.balance(&seller_id).await?;
    let pending = api.pending_withdrawal_total(&seller_id).await?;
    Ok(HttpResponse::Ok().json(BalanceResponse::new(balance, pending)))
}

route!(ledger => Get "/ledger/{seller_id}" impl SettlementBackend);
pub async fn ledger<B: SettlementBackend>(
    path: web::Path<String>,
    api: web::Data<LedgerApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let seller_id = path.into_inner();
    trace!("💻️ GET ledger for seller {seller_id}");
    let entries = api.ledger(&seller_id).await?;
    Ok(HttpResponse::Ok().json(entries))
}

//----------------------------------------------   Withdrawals  ----------------------------------------------------
route!(new_withdrawal => Post "/withdrawals" impl SettlementBackend, PayoutProvider);
/// Opens a withdrawal and attempts the payout. The response carries the request in its post-attempt state;
/// a `Pending` status means the provider has not given a definitive answer yet.
pub async fn new_withdrawal<B, P>(
    body: web::Json<WithdrawalParams>,
    api: web::Data<PayoutApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementBackend,
    P: PayoutProvider,
{
    let params = body.into_inner();
    debug!("💻️ POST withdrawal of {} cents for seller {}", params.amount_cents, params.seller_id);
    let request =
        api.request_withdrawal(&params.seller_id, lps_common::Reais::from_cents(params.amount_cents)).await?;
    Ok(HttpResponse::Created().json(request))
}

route!(withdrawal_by_id => Get "/withdrawals/{withdrawal_id}" impl SettlementBackend);
pub async fn withdrawal_by_id<B: SettlementBackend>(
    path: web::Path<String>,
    api: web::Data<LedgerApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let withdrawal_id = path.into_inner();
    let request = api
        .withdrawal(&withdrawal_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Withdrawal {withdrawal_id} not found")))?;
    Ok(HttpResponse::Ok().json(request))
}

route!(retry_withdrawal => Post "/withdrawals/{withdrawal_id}/retry" impl SettlementBackend, PayoutProvider);
pub async fn retry_withdrawal<B, P>(
    path: web::Path<String>,
    api: web::Data<PayoutApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementBackend,
    P: PayoutProvider,
{
    let withdrawal_id = path.into_inner();
    debug!("💻️ POST retry withdrawal {withdrawal_id}");
    let request = api.retry_withdrawal(&withdrawal_id).await?;
    Ok(HttpResponse::Ok().json(request))
}
