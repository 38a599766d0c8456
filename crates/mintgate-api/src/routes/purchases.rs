//! # Signed-Intent Purchases
//!
//! `POST /v1/purchases` takes a buyer-signed intent. The signature is
//! verified against the declared buyer wallet before any money or
//! chain state moves; the merchant order id in the intent is the
//! idempotency key, so resubmitting the same intent is always safe.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Extension, Json, Router};
use ed25519_dalek::{Signature, VerifyingKey};
use mintgate_core::{EventId, MerchantOrderId, SplitSlug, Timestamp, WalletAddress};
use mintgate_orchestrator::{PurchaseIntent, PurchaseOutcome, SignedIntent};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::middleware::metrics::ApiMetrics;
use crate::routes::decode_hex_array;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/purchases", post(purchase))
}

/// A signed purchase intent as submitted over the wire.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    /// Buyer wallet, `0x`-prefixed.
    pub buyer: String,
    pub split_slug: String,
    /// Idempotency key for this order.
    pub merchant_order_id: String,
    pub event_id: u64,
    /// Price in wei, as a decimal string.
    pub amount_wei: String,
    /// Intent expiry as Unix seconds.
    pub deadline: i64,
    /// Ed25519 public key, 32 bytes of hex.
    pub verifying_key: String,
    /// Ed25519 signature over the canonical intent bytes, 64 bytes of
    /// hex.
    pub signature: String,
}

impl Validate for PurchaseRequest {
    fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("buyer", &self.buyer),
            ("splitSlug", &self.split_slug),
            ("merchantOrderId", &self.merchant_order_id),
            ("amountWei", &self.amount_wei),
            ("verifyingKey", &self.verifying_key),
            ("signature", &self.signature),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{name} must be non-empty"));
            }
        }
        Ok(())
    }
}

/// Purchase outcome returned to the buyer.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseResponse {
    /// `processed`, `duplicate` or `pending`.
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
    /// Plaintext claim code. Shown once, on the first custody mint;
    /// never recoverable afterwards.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_code: Option<String>,
}

impl PurchaseRequest {
    fn into_signed_intent(self) -> Result<SignedIntent, AppError> {
        let buyer = WalletAddress::parse(&self.buyer)
            .map_err(|e| AppError::InvalidWallet(e.to_string()))?;
        let split_slug = SplitSlug::new(&self.split_slug)
            .map_err(|e| AppError::MissingFields(e.to_string()))?;
        let merchant_order_id = MerchantOrderId::new(&self.merchant_order_id)
            .map_err(|e| AppError::MissingFields(e.to_string()))?;
        let amount_wei = self
            .amount_wei
            .parse::<u128>()
            .map_err(|_| AppError::MissingFields("amountWei must be a decimal integer".into()))?;
        let deadline = Timestamp::from_epoch_secs(self.deadline)
            .map_err(|e| AppError::MissingFields(e.to_string()))?;

        let key_bytes = decode_hex_array::<32>("verifyingKey", &self.verifying_key)?;
        let verifying_key =
            VerifyingKey::from_bytes(&key_bytes).map_err(|_| AppError::InvalidSignature)?;
        let sig_bytes = decode_hex_array::<64>("signature", &self.signature)?;
        let signature = Signature::from_bytes(&sig_bytes);

        Ok(SignedIntent {
            intent: PurchaseIntent {
                buyer,
                split_slug,
                merchant_order_id,
                event_id: EventId(self.event_id),
                amount_wei,
                deadline,
            },
            verifying_key,
            signature,
        })
    }
}

/// POST /v1/purchases — mint against a buyer-signed intent.
#[utoipa::path(
    post,
    path = "/v1/purchases",
    tag = "purchases",
    request_body = PurchaseRequest,
    responses(
        (status = 200, description = "Minted, or already minted for this order", body = PurchaseResponse),
        (status = 202, description = "Another attempt holds the order lock; retry", body = PurchaseResponse),
        (status = 400, description = "Invalid payload, wallet or paused event"),
        (status = 401, description = "Signature does not verify"),
        (status = 500, description = "Chain or configuration failure"),
    )
)]
pub async fn purchase(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
    payload: Result<Json<PurchaseRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let request = extract_validated_json(payload)?;
    let signed = request.into_signed_intent()?;
    let merchant_order_id = signed.intent.merchant_order_id.clone();

    let outcome = state.purchases.purchase(signed).await.map_err(|e| {
        metrics.record_mint("rejected");
        state
            .audit
            .record("purchase", Some(merchant_order_id.as_str()), &e.to_string());
        AppError::from(e)
    })?;

    let (status_code, response) = match outcome {
        PurchaseOutcome::Processed {
            tx_hash,
            token_id,
            claim_code,
        } => (
            StatusCode::OK,
            PurchaseResponse {
                outcome: "processed".into(),
                tx_hash: Some(tx_hash.to_string()),
                token_id: Some(token_id.to_string()),
                claim_code,
            },
        ),
        PurchaseOutcome::Duplicate { tx_hash, token_id } => (
            StatusCode::OK,
            PurchaseResponse {
                outcome: "duplicate".into(),
                tx_hash: tx_hash.map(|h| h.to_string()),
                token_id: token_id.map(|t| t.to_string()),
                claim_code: None,
            },
        ),
        PurchaseOutcome::Pending => (
            StatusCode::ACCEPTED,
            PurchaseResponse {
                outcome: "pending".into(),
                tx_hash: None,
                token_id: None,
                claim_code: None,
            },
        ),
        // Intents always carry status "success"; the orchestrator only
        // records bare statuses for webhook notifications.
        PurchaseOutcome::StatusRecorded { .. } => (
            StatusCode::OK,
            PurchaseResponse {
                outcome: "status_recorded".into(),
                tx_hash: None,
                token_id: None,
                claim_code: None,
            },
        ),
    };

    metrics.record_mint(&response.outcome);
    state
        .audit
        .record("purchase", Some(merchant_order_id.as_str()), &response.outcome);
    Ok((status_code, Json(response)).into_response())
}
