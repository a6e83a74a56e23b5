use std::time::Duration;

use actix_web::{http::KeepAlive, middleware::Logger, web, App, HttpServer};
use actix_web::dev::Server;
use settlement_engine::{
    api::{LedgerApi, PayoutApi, SettlementApi},
    SqliteDatabase,
};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    integrations::{GatewayClient, PayoutClient},
    middleware::{AccessTokenMiddlewareFactory, SignatureMiddlewareFactory},
    routes::{
        health,
        BalanceRoute,
        LedgerRoute,
        NewOrderRoute,
        NewWithdrawalRoute,
        OrderByIdRoute,
        ReplayTransfersRoute,
        RetryWithdrawalRoute,
        SetPayoutKeyRoute,
        UpsertSellerRoute,
        WithdrawalByIdRoute,
    },
    webhook_routes::{payment_webhook_probe, PaymentWebhookRoute, TransferEventsRoute},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let srv = create_server_instance(config, db)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(config: ServerConfig, db: SqliteDatabase) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let settlement_config = config.settlement_config();
        let gateway = GatewayClient::new(&config.gateway);
        let payout_client = PayoutClient::new(&config.payout);
        let settlement_api = SettlementApi::new(db.clone(), settlement_config);
        let payout_api = PayoutApi::new(db.clone(), payout_client, settlement_config);
        let ledger_api = LedgerApi::new(db.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("lps::access_log"))
            .app_data(web::Data::new(settlement_api))
            .app_data(web::Data::new(payout_api))
            .app_data(web::Data::new(ledger_api))
            .app_data(web::Data::new(gateway));
        // The internal API is only reachable with the configured access key
        let api_scope = web::scope("/api")
            .wrap(AccessTokenMiddlewareFactory::new("lps-api-key", config.api_key.clone()))
            .service(NewOrderRoute::<SqliteDatabase, GatewayClient>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(UpsertSellerRoute::<SqliteDatabase>::new())
            .service(SetPayoutKeyRoute::<SqliteDatabase>::new())
            .service(ReplayTransfersRoute::<SqliteDatabase, PayoutClient>::new())
            .service(BalanceRoute::<SqliteDatabase>::new())
            .service(LedgerRoute::<SqliteDatabase>::new())
            .service(NewWithdrawalRoute::<SqliteDatabase, PayoutClient>::new())
            .service(WithdrawalByIdRoute::<SqliteDatabase>::new())
            .service(RetryWithdrawalRoute::<SqliteDatabase, PayoutClient>::new());
        let payment_hooks = web::scope("/webhooks/payment")
            .wrap(SignatureMiddlewareFactory::new(
                config.gateway.webhook_secret.clone(),
                config.gateway.signature_tolerance_secs,
                config.gateway.signature_checks,
            ))
            .service(PaymentWebhookRoute::<SqliteDatabase, GatewayClient>::new())
            .service(payment_webhook_probe);
        // The transfer token is opt-in. Without one configured the callbacks still come through,
        // otherwise failed payouts would never be reverted.
        let transfer_hooks = web::scope("/webhooks/transfer-events")
            .wrap(AccessTokenMiddlewareFactory::optional("lps-transfer-token", config.payout.webhook_token.clone()))
            .service(TransferEventsRoute::<SqliteDatabase, PayoutClient>::new());
        app.service(health).service(api_scope).service(payment_hooks).service(transfer_hooks)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
