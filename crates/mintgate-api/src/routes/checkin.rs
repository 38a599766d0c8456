//! # Gate Check-In
//!
//! `POST /v1/checkin` validates a ticket at the venue door. The first
//! check-in for an `(event, token)` pair admits; every replay reports
//! the original entry time. Operator-authenticated.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Extension, Json, Router};
use mintgate_core::{EventId, TokenId};
use mintgate_orchestrator::CheckinOutcome;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/checkin", post(check_in))
}

/// A gate validation request.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckinRequest {
    pub event_id: u64,
    pub token_id: String,
    /// Gate or staff device identifier. Defaults to `gate`.
    #[serde(default)]
    pub operator: Option<String>,
}

impl Validate for CheckinRequest {
    fn validate(&self) -> Result<(), String> {
        if self.token_id.trim().is_empty() {
            return Err("tokenId must be non-empty".into());
        }
        Ok(())
    }
}

/// Gate decision for one scan.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckinResponse {
    /// `processed` on first entry, `duplicate` on any replay.
    pub outcome: String,
    /// ISO 8601 UTC. On a replay this is the original entry time.
    pub used_at: String,
}

/// POST /v1/checkin — admit a ticket holder exactly once per event.
#[utoipa::path(
    post,
    path = "/v1/checkin",
    tag = "gate",
    request_body = CheckinRequest,
    security(("operatorToken" = [])),
    responses(
        (status = 200, description = "Admitted, or already used with the original entry time", body = CheckinResponse),
        (status = 401, description = "Missing or invalid operator token"),
        (status = 404, description = "No minted ticket for the token"),
    )
)]
pub async fn check_in(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
    payload: Result<Json<CheckinRequest>, JsonRejection>,
) -> Result<Json<CheckinResponse>, AppError> {
    let request = extract_validated_json(payload)?;
    let token = TokenId::new(&request.token_id)
        .map_err(|e| AppError::MissingFields(e.to_string()))?;
    let operator = request.operator.as_deref().unwrap_or("gate");

    let outcome = state
        .gate
        .check_in(EventId(request.event_id), &token, operator)
        .await?;

    let response = match outcome {
        CheckinOutcome::Admitted { used_at } => CheckinResponse {
            outcome: "processed".into(),
            used_at: used_at.to_string(),
        },
        CheckinOutcome::AlreadyUsed { used_at } => CheckinResponse {
            outcome: "duplicate".into(),
            used_at: used_at.to_string(),
        },
    };

    metrics.record_checkin(&response.outcome);
    state
        .audit
        .record("checkin", Some(token.as_str()), &response.outcome);
    Ok(Json(response))
}
