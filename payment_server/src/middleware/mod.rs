//! Request-guard middleware for Actix Web.
//!
//! Two guards protect the server's surfaces:
//! * [`AccessTokenMiddlewareFactory`] compares a configured token against a request header. It guards the
//!   internal `/api` scope and the payout provider's transfer-status callbacks.
//! * [`SignatureMiddlewareFactory`] validates the payment gateway's signed notifications. The signature
//!   covers the notification's query parameters and headers, not the body, so the payload is left
//!   untouched.
use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::{ErrorForbidden, ErrorUnauthorized},
    Error,
};
use chrono::Utc;
use futures::future::LocalBoxFuture;
use log::{trace, warn};
use lps_common::Secret;

use crate::helpers::{query_param, validate_webhook_signature};

//------------------------------------  Access token middleware  -----------------------------------------------------

pub struct AccessTokenMiddlewareFactory {
    header: String,
    token: Secret<String>,
    required: bool,
}

impl AccessTokenMiddlewareFactory {
    /// A guard that denies every request until a token is configured. For internal surfaces.
    pub fn new(header: &str, token: Secret<String>) -> Self {
        AccessTokenMiddlewareFactory { header: header.into(), token, required: true }
    }

    /// A guard that only checks the header when a token is configured. For callback surfaces where the
    /// shared secret is opt-in and locking them down would silently drop the provider's events.
    pub fn optional(header: &str, token: Secret<String>) -> Self {
        AccessTokenMiddlewareFactory { header: header.into(), token, required: false }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AccessTokenMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AccessTokenMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AccessTokenMiddlewareService {
            header: self.header.clone(),
            token: self.token.clone(),
            required: self.required,
            service: Rc::new(service),
        }))
    }
}

pub struct AccessTokenMiddlewareService<S> {
    header: String,
    token: Secret<String>,
    required: bool,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AccessTokenMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let header = self.header.clone();
        let token = self.token.clone();
        let required = self.required;
        Box::pin(async move {
            trace!("🔐️ Checking {header} for request");
            if token.is_empty() {
                // Internal surfaces stay closed until a token is configured. Callback surfaces stay
                // open; the token there is opt-in hardening.
                if required {
                    warn!("🔐️ No access token is configured for {header}. Denying request.");
                    return Err(ErrorUnauthorized("Access token not configured."));
                }
                trace!("🔐️ No token configured for {header}. Allowing request.");
                return service.call(req).await;
            }
            let presented = req.headers().get(&header).and_then(|v| v.to_str().ok());
            match presented {
                Some(value) if value == token.reveal() => {
                    trace!("🔐️ Access token check for {header} ✅️");
                    service.call(req).await
                },
                Some(_) => {
                    warn!("🔐️ Invalid access token in {header}. Denying request.");
                    Err(ErrorUnauthorized("Invalid access token."))
                },
                None => {
                    warn!("🔐️ No access token found in {header}. Denying request.");
                    Err(ErrorUnauthorized("No access token found."))
                },
            }
        })
    }
}

//------------------------------------   Signature middleware    -----------------------------------------------------

pub struct SignatureMiddlewareFactory {
    secret: Secret<String>,
    tolerance_secs: i64,
    // If false, the middleware will not check the signature and always allow the call
    enabled: bool,
}

impl SignatureMiddlewareFactory {
    pub fn new(secret: Secret<String>, tolerance_secs: i64, enabled: bool) -> Self {
        SignatureMiddlewareFactory { secret, tolerance_secs, enabled }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SignatureMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = SignatureMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SignatureMiddlewareService {
            secret: self.secret.clone(),
            tolerance_secs: self.tolerance_secs,
            enabled: self.enabled,
            service: Rc::new(service),
        }))
    }
}

pub struct SignatureMiddlewareService<S> {
    secret: Secret<String>,
    tolerance_secs: i64,
    enabled: bool,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for SignatureMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let secret = self.secret.reveal().clone();
        let tolerance_secs = self.tolerance_secs;
        let enabled = self.enabled;
        Box::pin(async move {
            trace!("🔐️ Checking notification signature for request");
            if !enabled {
                trace!("🔐️ Signature checks are disabled. Allowing request.");
                return service.call(req).await;
            }
            let data_id = query_param(req.query_string(), "data.id").map(str::to_string).unwrap_or_default();
            let request_id =
                req.headers().get("x-request-id").and_then(|v| v.to_str().ok()).unwrap_or_default().to_string();
            let header = req.headers().get("x-signature").and_then(|v| v.to_str().ok()).ok_or_else(|| {
                warn!("🔐️ No signature found in notification. Denying access.");
                ErrorForbidden("No signature found.")
            })?;
            match validate_webhook_signature(
                &secret,
                &data_id,
                &request_id,
                header,
                Utc::now().timestamp(),
                tolerance_secs,
            ) {
                Ok(()) => {
                    trace!("🔐️ Signature check for notification ✅️");
                    service.call(req).await
                },
                Err(e) => {
                    warn!("🔐️ Invalid notification signature ({e}). Denying access.");
                    Err(ErrorForbidden("Invalid signature."))
                },
            }
        })
    }
}
