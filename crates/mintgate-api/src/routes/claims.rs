//! # Ticket Claims
//!
//! `POST /v1/claims` redeems a claim code and moves a custody-held
//! ticket to the buyer's wallet. The code comparison is constant-time
//! and the route sits behind the rate limiter, so guessing codes is
//! not viable.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Extension, Json, Router};
use mintgate_core::{MerchantOrderId, WalletAddress};
use mintgate_orchestrator::{ClaimOutcome, ClaimRequest};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/claims", post(claim))
}

/// A claim redemption request.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClaimApiRequest {
    pub merchant_order_id: String,
    /// Claim code as issued; hyphens and case are normalized away.
    pub code: String,
    /// Wallet to transfer the ticket to, `0x`-prefixed.
    pub destination: String,
}

impl Validate for ClaimApiRequest {
    fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("merchantOrderId", &self.merchant_order_id),
            ("code", &self.code),
            ("destination", &self.destination),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{name} must be non-empty"));
            }
        }
        Ok(())
    }
}

/// Claim outcome returned to the buyer.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResponse {
    /// `processed`, `duplicate`, `not_required` or `pending`.
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    /// Set when the transfer succeeded but the on-chain claim marker
    /// call failed. The ticket is claimed either way.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_claim_error: Option<String>,
}

/// POST /v1/claims — redeem a claim code.
#[utoipa::path(
    post,
    path = "/v1/claims",
    tag = "claims",
    request_body = ClaimApiRequest,
    responses(
        (status = 200, description = "Claimed, already claimed by this wallet, or no claim required", body = ClaimResponse),
        (status = 202, description = "Another claim attempt holds the lock; retry", body = ClaimResponse),
        (status = 400, description = "Order has no confirmed payment"),
        (status = 401, description = "Claim code does not match"),
        (status = 403, description = "Ticket already claimed by another wallet"),
        (status = 404, description = "No order for the key"),
        (status = 410, description = "Claim code expired"),
        (status = 500, description = "Claim pipeline failure after preconditions passed"),
    )
)]
pub async fn claim(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
    payload: Result<Json<ClaimApiRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let request = extract_validated_json(payload)?;
    let merchant_order_id = MerchantOrderId::new(&request.merchant_order_id)
        .map_err(|e| AppError::MissingFields(e.to_string()))?;
    let destination = WalletAddress::parse(&request.destination)
        .map_err(|e| AppError::InvalidWallet(e.to_string()))?;

    let outcome = state
        .claims
        .claim(ClaimRequest {
            merchant_order_id: merchant_order_id.clone(),
            code: request.code,
            destination,
        })
        .await
        .map_err(|e| {
            metrics.record_claim("rejected");
            state
                .audit
                .record("claim", Some(merchant_order_id.as_str()), &e.to_string());
            AppError::from(e)
        })?;

    let (status_code, response) = match outcome {
        ClaimOutcome::Claimed {
            tx_hash,
            chain_claim_error,
        } => (
            StatusCode::OK,
            ClaimResponse {
                outcome: "processed".into(),
                tx_hash: Some(tx_hash.to_string()),
                chain_claim_error,
            },
        ),
        ClaimOutcome::AlreadyClaimed => (
            StatusCode::OK,
            ClaimResponse {
                outcome: "duplicate".into(),
                tx_hash: None,
                chain_claim_error: None,
            },
        ),
        ClaimOutcome::NotRequired => (
            StatusCode::OK,
            ClaimResponse {
                outcome: "not_required".into(),
                tx_hash: None,
                chain_claim_error: None,
            },
        ),
        ClaimOutcome::Pending => (
            StatusCode::ACCEPTED,
            ClaimResponse {
                outcome: "pending".into(),
                tx_hash: None,
                chain_claim_error: None,
            },
        ),
    };

    metrics.record_claim(&response.outcome);
    state
        .audit
        .record("claim", Some(merchant_order_id.as_str()), &response.outcome);
    Ok((status_code, Json(response)).into_response())
}
