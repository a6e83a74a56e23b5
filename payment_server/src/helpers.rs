//! Webhook signature validation.
//!
//! The payment gateway signs each notification with an `x-signature` header of the form
//! `ts=<unix seconds>,v1=<hex hmac>`. The HMAC-SHA256 is computed over the manifest
//! `id:<data id>;request-id:<x-request-id>;ts:<ts>;` with the shared webhook secret, and notifications
//! older than the configured tolerance are refused to blunt replay attacks.
use std::str::FromStr;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("The signature header is malformed. {0}")]
    Malformed(String),
    #[error("The notification timestamp is outside the accepted window.")]
    Expired,
    #[error("The signature does not match the manifest.")]
    Mismatch,
}

/// The parsed `x-signature` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub ts: i64,
    pub v1: String,
}

impl FromStr for SignatureHeader {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut ts = None;
        let mut v1 = None;
        for part in s.split(',') {
            match part.trim().split_once('=') {
                Some(("ts", value)) => {
                    ts = Some(
                        value.trim().parse::<i64>().map_err(|e| SignatureError::Malformed(format!("ts: {e}")))?,
                    );
                },
                Some(("v1", value)) => v1 = Some(value.trim().to_string()),
                _ => {},
            }
        }
        match (ts, v1) {
            (Some(ts), Some(v1)) => Ok(Self { ts, v1 }),
            _ => Err(SignatureError::Malformed("expected ts=..,v1=..".to_string())),
        }
    }
}

pub fn signature_manifest(data_id: &str, request_id: &str, ts: i64) -> String {
    format!("id:{data_id};request-id:{request_id};ts:{ts};")
}

pub fn calculate_signature(secret: &str, manifest: &str) -> Result<String, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| SignatureError::Malformed(format!("invalid key: {e}")))?;
    mac.update(manifest.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Validates a notification signature against the manifest built from the notification's query
/// parameters. `now` is the current unix time in seconds.
pub fn validate_webhook_signature(
    secret: &str,
    data_id: &str,
    request_id: &str,
    header: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<(), SignatureError> {
    let signature = SignatureHeader::from_str(header)?;
    if (now - signature.ts).abs() > tolerance_secs {
        return Err(SignatureError::Expired);
    }
    let manifest = signature_manifest(data_id, request_id, signature.ts);
    let expected = calculate_signature(secret, &manifest)?;
    if expected.eq_ignore_ascii_case(&signature.v1) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Pulls a single value out of a raw query string. The gateway's ids are plain alphanumerics, so no
/// percent decoding is done here.
pub fn query_param<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key && !v.is_empty()).then_some(v)
    })
}

#[cfg(test)]
mod test {
    use super::*;

    const SECRET: &str = "test_webhook_secret";

    fn signed_header(data_id: &str, request_id: &str, ts: i64) -> String {
        let manifest = signature_manifest(data_id, request_id, ts);
        let v1 = calculate_signature(SECRET, &manifest).unwrap();
        format!("ts={ts},v1={v1}")
    }

    #[test]
    fn valid_signatures_pass() {
        let header = signed_header("12345", "req-1", 1_700_000_000);
        assert_eq!(validate_webhook_signature(SECRET, "12345", "req-1", &header, 1_700_000_100, 300), Ok(()));
    }

    #[test]
    fn signature_case_is_ignored() {
        let header = signed_header("12345", "req-1", 1_700_000_000).to_uppercase().replace("TS", "ts").replace("V1", "v1");
        assert_eq!(validate_webhook_signature(SECRET, "12345", "req-1", &header, 1_700_000_000, 300), Ok(()));
    }

    #[test]
    fn stale_notifications_are_refused() {
        let header = signed_header("12345", "req-1", 1_700_000_000);
        let result = validate_webhook_signature(SECRET, "12345", "req-1", &header, 1_700_000_301, 300);
        assert_eq!(result, Err(SignatureError::Expired));
    }

    #[test]
    fn tampered_ids_are_refused() {
        let header = signed_header("12345", "req-1", 1_700_000_000);
        let result = validate_webhook_signature(SECRET, "99999", "req-1", &header, 1_700_000_000, 300);
        assert_eq!(result, Err(SignatureError::Mismatch));
    }

    #[test]
    fn wrong_secret_is_refused() {
        let manifest = signature_manifest("12345", "req-1", 1_700_000_000);
        let v1 = calculate_signature("other_secret", &manifest).unwrap();
        let header = format!("ts=1700000000,v1={v1}");
        let result = validate_webhook_signature(SECRET, "12345", "req-1", &header, 1_700_000_000, 300);
        assert_eq!(result, Err(SignatureError::Mismatch));
    }

    #[test]
    fn malformed_headers_are_refused() {
        for header in ["", "ts=123", "v1=abc", "ts=abc,v1=def"] {
            assert!(matches!(
                validate_webhook_signature(SECRET, "1", "r", header, 0, 300),
                Err(SignatureError::Malformed(_))
            ));
        }
    }

    #[test]
    fn query_params_are_extracted() {
        let query = "type=payment&data.id=12345&topic=payment";
        assert_eq!(query_param(query, "data.id"), Some("12345"));
        assert_eq!(query_param(query, "id"), None);
        assert_eq!(query_param("", "data.id"), None);
    }
}
