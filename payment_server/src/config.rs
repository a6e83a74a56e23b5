use std::env;

use log::*;
use lps_common::{parse_boolean_flag, Reais, Secret};
use settlement_engine::{
    api::{SettlementConfig, DEFAULT_MIN_WITHDRAWAL_CENTS},
    helpers::CommissionRate,
};

const DEFAULT_LPS_HOST: &str = "127.0.0.1";
const DEFAULT_LPS_PORT: u16 = 4880;
const DEFAULT_SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Callers of the internal `/api` scope must present this key in the `lps-api-key` header.
    pub api_key: Secret<String>,
    /// The platform's cut of each sale, in percent.
    pub platform_fee_percent: f64,
    /// The smallest withdrawal the server will accept, in centavos.
    pub min_withdrawal: Reais,
    pub gateway: GatewayConfig,
    pub payout: PayoutConfig,
}

/// Connection details for the payment gateway (checkout and payment lookups).
#[derive(Clone, Debug, Default)]
pub struct GatewayConfig {
    pub base_url: String,
    pub access_token: Secret<String>,
    /// The secret used to verify webhook notification signatures.
    pub webhook_secret: Secret<String>,
    /// If false, webhook signature validation is skipped entirely.
    pub signature_checks: bool,
    /// Maximum accepted age of a signed notification, in seconds.
    pub signature_tolerance_secs: i64,
}

/// Connection details for the payout provider (transfers to sellers).
#[derive(Clone, Debug, Default)]
pub struct PayoutConfig {
    pub base_url: String,
    pub access_token: Secret<String>,
    /// When set, transfer-status callbacks must present this token in the `lps-transfer-token` header.
    /// When unset the check is skipped.
    pub webhook_token: Secret<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_LPS_HOST.to_string(),
            port: DEFAULT_LPS_PORT,
            database_url: String::default(),
            api_key: Secret::default(),
            platform_fee_percent: CommissionRate::default().platform_fee_percent(),
            min_withdrawal: Reais::from_cents(DEFAULT_MIN_WITHDRAWAL_CENTS),
            gateway: GatewayConfig::default(),
            payout: PayoutConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("LPS_HOST").ok().unwrap_or_else(|| DEFAULT_LPS_HOST.into());
        let port = env::var("LPS_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for LPS_PORT. {e} Using the default, {DEFAULT_LPS_PORT}, instead."
                    );
                    DEFAULT_LPS_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_LPS_PORT);
        let database_url = env::var("LPS_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ LPS_DATABASE_URL is not set. Please set it to the URL for the settlement database.");
            String::default()
        });
        let api_key = env::var("LPS_API_KEY").map(Secret::new).ok().unwrap_or_else(|| {
            warn!("🚨️ LPS_API_KEY is not set. The internal API will refuse every request until it is configured.");
            Secret::default()
        });
        let platform_fee_percent = env::var("LPS_PLATFORM_FEE_PERCENT")
            .ok()
            .and_then(|s| {
                s.parse::<f64>()
                    .map_err(|e| warn!("🪛️ Invalid value for LPS_PLATFORM_FEE_PERCENT ({s}). {e}"))
                    .ok()
            })
            .unwrap_or_else(|| {
                let default = CommissionRate::default().platform_fee_percent();
                info!("🪛️ LPS_PLATFORM_FEE_PERCENT is not set. Using the default of {default}%.");
                default
            });
        let min_withdrawal = env::var("LPS_MIN_WITHDRAWAL_CENTS")
            .ok()
            .and_then(|s| {
                s.parse::<i64>().map_err(|e| warn!("🪛️ Invalid value for LPS_MIN_WITHDRAWAL_CENTS ({s}). {e}")).ok()
            })
            .map(Reais::from_cents)
            .unwrap_or_else(|| {
                let default = Reais::from_cents(DEFAULT_MIN_WITHDRAWAL_CENTS);
                info!("🪛️ LPS_MIN_WITHDRAWAL_CENTS is not set. Using the default of {default}.");
                default
            });
        let gateway = GatewayConfig::from_env_or_default();
        let payout = PayoutConfig::from_env_or_default();
        Self { host, port, database_url, api_key, platform_fee_percent, min_withdrawal, gateway, payout }
    }

    /// The business knobs handed to the settlement engine.
    pub fn settlement_config(&self) -> SettlementConfig {
        SettlementConfig {
            commission: CommissionRate::from_platform_fee_percent(self.platform_fee_percent),
            min_withdrawal: self.min_withdrawal,
        }
    }
}

impl GatewayConfig {
    pub fn from_env_or_default() -> Self {
        let base_url = env::var("LPS_GATEWAY_URL").ok().unwrap_or_else(|| {
            error!("🪛️ LPS_GATEWAY_URL is not set. Please set it to the payment gateway's API base url.");
            String::default()
        });
        let access_token = env::var("LPS_GATEWAY_ACCESS_TOKEN").map(Secret::new).ok().unwrap_or_else(|| {
            error!("🪛️ LPS_GATEWAY_ACCESS_TOKEN is not set. Gateway calls will be rejected.");
            Secret::default()
        });
        let webhook_secret = env::var("LPS_GATEWAY_WEBHOOK_SECRET").map(Secret::new).ok().unwrap_or_else(|| {
            error!("🪛️ LPS_GATEWAY_WEBHOOK_SECRET is not set. Webhook signatures cannot be verified.");
            Secret::default()
        });
        let signature_checks = parse_boolean_flag(env::var("LPS_GATEWAY_SIGNATURE_CHECKS").ok(), true);
        if !signature_checks {
            warn!("🚨️ Webhook signature checks are disabled. Do not run a production instance like this.");
        }
        let signature_tolerance_secs = env::var("LPS_GATEWAY_SIGNATURE_TOLERANCE")
            .ok()
            .and_then(|s| {
                s.parse::<i64>()
                    .map_err(|e| warn!("🪛️ Invalid value for LPS_GATEWAY_SIGNATURE_TOLERANCE ({s}). {e}"))
                    .ok()
            })
            .unwrap_or(DEFAULT_SIGNATURE_TOLERANCE_SECS);
        Self { base_url, access_token, webhook_secret, signature_checks, signature_tolerance_secs }
    }
}

impl PayoutConfig {
    pub fn from_env_or_default() -> Self {
        let base_url = env::var("LPS_PAYOUT_URL").ok().unwrap_or_else(|| {
            error!("🪛️ LPS_PAYOUT_URL is not set. Please set it to the payout provider's API base url.");
            String::default()
        });
        let access_token = env::var("LPS_PAYOUT_ACCESS_TOKEN").map(Secret::new).ok().unwrap_or_else(|| {
            error!("🪛️ LPS_PAYOUT_ACCESS_TOKEN is not set. Payout calls will be rejected.");
            Secret::default()
        });
        let webhook_token = env::var("LPS_TRANSFER_WEBHOOK_TOKEN").map(Secret::new).ok().unwrap_or_else(|| {
            warn!(
                "🚨️ LPS_TRANSFER_WEBHOOK_TOKEN is not set. Transfer-status callbacks will be accepted without a \
                 token check."
            );
            Secret::default()
        });
        Self { base_url, access_token, webhook_token }
    }
}
