//! # Notification Verification
//!
//! Parses a raw webhook body (JSON object or form-encoded) into a flat
//! string map, recomputes the provider's HMAC and compares it against
//! the supplied `hash` field in constant time.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::VerifierConfig;

type HmacSha256 = Hmac<Sha256>;

/// Why a notification was rejected. `as_str` values are the
/// machine-readable reason strings carried in responses and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MalformedPayload,
    MissingHash,
    MissingMerchantOrderId,
    MissingStatus,
    MissingTotalAmount,
    ServerMisconfigured,
    InvalidSignature,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedPayload => "Malformed payload",
            Self::MissingHash => "Missing hash",
            Self::MissingMerchantOrderId => "Missing merchantOrderId",
            Self::MissingStatus => "Missing status",
            Self::MissingTotalAmount => "Missing totalAmount",
            Self::ServerMisconfigured => "Server misconfigured",
            Self::InvalidSignature => "Invalid signature",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of verifying one notification.
#[derive(Debug, Clone)]
pub enum Verification {
    /// Signature valid; normalized fields extracted.
    Ok {
        merchant_order_id: String,
        status: String,
        total_amount: String,
        payment_amount: Option<String>,
        buyer_address: Option<String>,
        /// The full flat map, for audit logging and fields this crate
        /// does not interpret.
        raw: BTreeMap<String, String>,
    },
    /// Rejected; nothing about the payload should be trusted.
    Failed { reason: RejectReason },
}

impl Verification {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    fn failed(reason: RejectReason) -> Self {
        Self::Failed { reason }
    }
}

/// Stateless verifier holding the shared-secret configuration.
#[derive(Debug, Clone)]
pub struct PaymentVerifier {
    config: VerifierConfig,
}

impl PaymentVerifier {
    pub fn new(config: VerifierConfig) -> Self {
        Self { config }
    }

    /// Verify a raw notification body.
    ///
    /// Malformed input is a [`Verification::Failed`], never an error or
    /// panic, so webhook handlers can acknowledge junk without a
    /// separate failure path.
    pub fn verify(&self, body: &str) -> Verification {
        let Some(fields) = parse_flat_map(body) else {
            return Verification::failed(RejectReason::MalformedPayload);
        };
        let Some(hash) = nonempty(&fields, "hash") else {
            return Verification::failed(RejectReason::MissingHash);
        };
        let Some(merchant_order_id) = nonempty(&fields, "merchantOrderId") else {
            return Verification::failed(RejectReason::MissingMerchantOrderId);
        };
        let Some(status) = nonempty(&fields, "status") else {
            return Verification::failed(RejectReason::MissingStatus);
        };
        let Some(total_amount) = nonempty(&fields, "totalAmount") else {
            return Verification::failed(RejectReason::MissingTotalAmount);
        };
        let mode = nonempty(&fields, "mode");
        let Some(secret) = self.config.secret_for_mode(mode.as_deref()) else {
            tracing::error!(mode = mode.as_deref(), "no webhook secret for mode");
            return Verification::failed(RejectReason::ServerMisconfigured);
        };

        let signed = format!(
            "{merchant_order_id}{salt}{status}{total_amount}",
            salt = self.config.salt
        );
        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            return Verification::failed(RejectReason::ServerMisconfigured);
        };
        mac.update(signed.as_bytes());
        let expected = BASE64.encode(mac.finalize().into_bytes());

        if bool::from(expected.as_bytes().ct_eq(hash.as_bytes())) {
            Verification::Ok {
                merchant_order_id,
                status,
                total_amount,
                payment_amount: nonempty(&fields, "paymentAmount"),
                buyer_address: nonempty(&fields, "buyerAddress"),
                raw: fields,
            }
        } else {
            tracing::warn!("webhook signature verification failed");
            Verification::failed(RejectReason::InvalidSignature)
        }
    }
}

fn nonempty(fields: &BTreeMap<String, String>, key: &str) -> Option<String> {
    fields
        .get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Flatten a JSON object or form-encoded body into string fields.
/// Scalar JSON values are stringified; nested structures and nulls are
/// dropped rather than failing the whole payload.
fn parse_flat_map(body: &str) -> Option<BTreeMap<String, String>> {
    if let Ok(serde_json::Value::Object(object)) = serde_json::from_str(body) {
        let mut fields = BTreeMap::new();
        for (key, value) in object {
            match value {
                serde_json::Value::String(s) => {
                    fields.insert(key, s);
                }
                serde_json::Value::Number(n) => {
                    fields.insert(key, n.to_string());
                }
                serde_json::Value::Bool(b) => {
                    fields.insert(key, b.to_string());
                }
                _ => {}
            }
        }
        return Some(fields);
    }
    // serde_urlencoded happily treats any text as one bare key, so
    // only take this path when every `&`-separated segment is a
    // `key=value` pair. Anything else is a malformed payload.
    let trimmed = body.trim();
    if trimmed.is_empty() || !trimmed.split('&').all(|pair| pair.contains('=')) {
        return None;
    }
    match serde_urlencoded::from_str::<Vec<(String, String)>>(trimmed) {
        Ok(pairs) if !pairs.is_empty() => Some(pairs.into_iter().collect()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> VerifierConfig {
        VerifierConfig {
            secret: Some("merchant-key".into()),
            secret_test: Some("merchant-key-test".into()),
            salt: "merchant-salt".into(),
        }
    }

    fn sign(secret: &str, merchant_order_id: &str, status: &str, total_amount: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{merchant_order_id}merchant-salt{status}{total_amount}").as_bytes());
        BASE64.encode(mac.finalize().into_bytes())
    }

    // ---- happy paths ----

    #[test]
    fn verifies_a_signed_json_notification() {
        let verifier = PaymentVerifier::new(config());
        let hash = sign("merchant-key", "ord-1", "success", "25000");
        let body = format!(
            r#"{{"merchantOrderId":"ord-1","status":"success","totalAmount":25000,"paymentAmount":"25000","hash":"{hash}"}}"#
        );
        match verifier.verify(&body) {
            Verification::Ok {
                merchant_order_id,
                status,
                total_amount,
                payment_amount,
                ..
            } => {
                assert_eq!(merchant_order_id, "ord-1");
                assert_eq!(status, "success");
                assert_eq!(total_amount, "25000");
                assert_eq!(payment_amount.as_deref(), Some("25000"));
            }
            other => panic!("expected ok, got {other:?}"),
        }
    }

    #[test]
    fn verifies_a_form_encoded_notification() {
        let verifier = PaymentVerifier::new(config());
        let hash = sign("merchant-key", "ord-2", "success", "100");
        let body = serde_urlencoded::to_string([
            ("merchantOrderId", "ord-2"),
            ("status", "success"),
            ("totalAmount", "100"),
            ("hash", hash.as_str()),
        ])
        .unwrap();
        assert!(verifier.verify(&body).is_ok());
    }

    #[test]
    fn test_mode_uses_the_test_secret() {
        let verifier = PaymentVerifier::new(config());
        let hash = sign("merchant-key-test", "ord-3", "success", "100");
        let body = format!(
            r#"{{"merchantOrderId":"ord-3","status":"success","totalAmount":"100","mode":"test","hash":"{hash}"}}"#
        );
        assert!(verifier.verify(&body).is_ok());
        // Same payload without the mode flag verifies against the live
        // key and must fail.
        let live_body = format!(
            r#"{{"merchantOrderId":"ord-3","status":"success","totalAmount":"100","hash":"{hash}"}}"#
        );
        match verifier.verify(&live_body) {
            Verification::Failed { reason } => assert_eq!(reason, RejectReason::InvalidSignature),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    // ---- rejection reasons ----

    fn reject(verifier: &PaymentVerifier, body: &str) -> RejectReason {
        match verifier.verify(body) {
            Verification::Failed { reason } => reason,
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn rejection_reasons() {
        let verifier = PaymentVerifier::new(config());
        assert_eq!(reject(&verifier, "not json"), RejectReason::MalformedPayload);
        assert_eq!(reject(&verifier, "[1,2]"), RejectReason::MalformedPayload);
        assert_eq!(reject(&verifier, ""), RejectReason::MalformedPayload);
        assert_eq!(
            reject(&verifier, "<notification/>"),
            RejectReason::MalformedPayload
        );
        assert_eq!(
            reject(&verifier, r#"{"merchantOrderId":"x"}"#),
            RejectReason::MissingHash
        );
        assert_eq!(
            reject(&verifier, r#"{"hash":"h"}"#),
            RejectReason::MissingMerchantOrderId
        );
        assert_eq!(
            reject(&verifier, r#"{"hash":"h","merchantOrderId":"x"}"#),
            RejectReason::MissingStatus
        );
        assert_eq!(
            reject(
                &verifier,
                r#"{"hash":"h","merchantOrderId":"x","status":"success"}"#
            ),
            RejectReason::MissingTotalAmount
        );
        let tampered = r#"{"hash":"bm90LXRoZS1tYWM=","merchantOrderId":"x","status":"success","totalAmount":"1"}"#;
        assert_eq!(reject(&verifier, tampered), RejectReason::InvalidSignature);
    }

    #[test]
    fn missing_secret_is_server_misconfigured() {
        let verifier = PaymentVerifier::new(VerifierConfig {
            secret: None,
            secret_test: None,
            salt: String::new(),
        });
        let body = r#"{"hash":"h","merchantOrderId":"x","status":"success","totalAmount":"1"}"#;
        assert_eq!(reject(&verifier, body), RejectReason::ServerMisconfigured);
    }

    #[test]
    fn tampered_amount_breaks_the_signature() {
        let verifier = PaymentVerifier::new(config());
        let hash = sign("merchant-key", "ord-4", "success", "100");
        let body = format!(
            r#"{{"merchantOrderId":"ord-4","status":"success","totalAmount":"999","hash":"{hash}"}}"#
        );
        assert_eq!(reject(&verifier, &body), RejectReason::InvalidSignature);
    }
}
