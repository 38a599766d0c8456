//! # Payment Webhook
//!
//! `POST /v1/payments/webhook` receives provider notifications. The
//! raw body is verified before any JSON interpretation happens; a
//! rejected signature means nothing in the payload can be trusted.
//! Success notifications trigger the mint pipeline; every other status
//! is acknowledged with 200 after the payment status is recorded, so
//! the provider stops retrying.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Extension, Json, Router};
use mintgate_core::{EventId, MerchantOrderId, SplitSlug, WalletAddress};
use mintgate_orchestrator::{PaidNotification, PurchaseOutcome};
use mintgate_payment::{RejectReason, Verification};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{AppError, ErrorBody, ErrorDetail};
use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/payments/webhook", post(payment_webhook))
}

/// Acknowledgement returned to the payment provider.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    /// `processed`, `duplicate`, `pending` or `status_recorded`.
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
    /// Plaintext claim code, present only on the first custody mint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<String>,
}

impl WebhookResponse {
    fn bare(outcome: &str) -> Self {
        Self {
            outcome: outcome.to_string(),
            tx_hash: None,
            token_id: None,
            claim_code: None,
            payment_status: None,
        }
    }
}

/// Map a verification rejection onto the response table, preserving
/// the provider-facing reason string verbatim.
fn rejection_response(reason: RejectReason) -> Response {
    let (status, code) = match reason {
        RejectReason::MalformedPayload => (StatusCode::BAD_REQUEST, "invalid_json"),
        RejectReason::InvalidSignature => (StatusCode::UNAUTHORIZED, "invalid_signature"),
        RejectReason::ServerMisconfigured => {
            (StatusCode::INTERNAL_SERVER_ERROR, "server_misconfigured")
        }
        _ => (StatusCode::BAD_REQUEST, "missing_fields"),
    };
    let body = ErrorBody {
        error: ErrorDetail {
            reason: code.to_string(),
            message: reason.as_str().to_string(),
        },
    };
    (status, Json(body)).into_response()
}

/// POST /v1/payments/webhook — verify and process one notification.
#[utoipa::path(
    post,
    path = "/v1/payments/webhook",
    tag = "payments",
    request_body = String,
    responses(
        (status = 200, description = "Notification processed or acknowledged", body = WebhookResponse),
        (status = 202, description = "Another attempt holds the order lock; the provider will retry", body = WebhookResponse),
        (status = 400, description = "Malformed payload or missing field", body = ErrorBody),
        (status = 401, description = "Signature verification failed", body = ErrorBody),
        (status = 500, description = "No secret configured for the notification mode", body = ErrorBody),
    )
)]
pub async fn payment_webhook(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
    body: String,
) -> Result<Response, AppError> {
    let (merchant_order_id, status, total_amount, buyer_address, raw) =
        match state.verifier.verify(&body) {
            Verification::Ok {
                merchant_order_id,
                status,
                total_amount,
                buyer_address,
                raw,
                ..
            } => (merchant_order_id, status, total_amount, buyer_address, raw),
            Verification::Failed { reason } => {
                metrics.record_webhook_rejection(reason.as_str());
                state.audit.record("webhook", None, reason.as_str());
                return Ok(rejection_response(reason));
            }
        };

    let merchant_order_id = MerchantOrderId::new(&merchant_order_id)
        .map_err(|e| AppError::MissingFields(e.to_string()))?;

    // Notifications carry no event context of their own; deployments
    // that sell for one event at a time configure the defaults.
    let event_id = match raw.get("eventId") {
        Some(raw_event) => EventId(
            raw_event
                .parse::<u64>()
                .map_err(|_| AppError::MissingFields("eventId must be an integer".into()))?,
        ),
        None => EventId(state.config.default_event_id),
    };
    let split_slug = match raw.get("splitSlug") {
        Some(raw_slug) => {
            SplitSlug::new(raw_slug).map_err(|e| AppError::MissingFields(e.to_string()))?
        }
        None => state.config.default_split.clone(),
    };
    let buyer_address = match buyer_address {
        Some(raw_addr) => Some(
            WalletAddress::parse(&raw_addr)
                .map_err(|e| AppError::InvalidWallet(e.to_string()))?,
        ),
        None => None,
    };

    let note = PaidNotification {
        merchant_order_id: merchant_order_id.clone(),
        event_id,
        split_slug,
        status,
        total_amount,
        buyer_address,
    };

    let outcome = state.purchases.process_notification(note).await?;
    let (status_code, response) = match outcome {
        PurchaseOutcome::Processed {
            tx_hash,
            token_id,
            claim_code,
        } => (
            StatusCode::OK,
            WebhookResponse {
                outcome: "processed".into(),
                tx_hash: Some(tx_hash.to_string()),
                token_id: Some(token_id.to_string()),
                claim_code,
                payment_status: None,
            },
        ),
        PurchaseOutcome::Duplicate { tx_hash, token_id } => (
            StatusCode::OK,
            WebhookResponse {
                outcome: "duplicate".into(),
                tx_hash: tx_hash.map(|h| h.to_string()),
                token_id: token_id.map(|t| t.to_string()),
                claim_code: None,
                payment_status: None,
            },
        ),
        PurchaseOutcome::Pending => (StatusCode::ACCEPTED, WebhookResponse::bare("pending")),
        PurchaseOutcome::StatusRecorded { payment_status } => (
            StatusCode::OK,
            WebhookResponse {
                payment_status: Some(payment_status.as_str().to_string()),
                ..WebhookResponse::bare("status_recorded")
            },
        ),
    };

    metrics.record_mint(&response.outcome);
    state
        .audit
        .record("webhook", Some(merchant_order_id.as_str()), &response.outcome);
    Ok((status_code, Json(response)).into_response())
}
