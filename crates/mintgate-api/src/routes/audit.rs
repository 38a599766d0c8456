//! # Audit Feed
//!
//! `GET /v1/audit/recent` serves the in-process ring buffer of recent
//! orchestration outcomes, newest first. Operator-authenticated.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::audit::AuditEntry;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/audit/recent", get(recent))
}

/// GET /v1/audit/recent — recent orchestration outcomes.
#[utoipa::path(
    get,
    path = "/v1/audit/recent",
    tag = "audit",
    security(("operatorToken" = [])),
    responses(
        (status = 200, description = "Recent entries, newest first", body = [AuditEntry]),
        (status = 401, description = "Missing or invalid operator token"),
    )
)]
pub async fn recent(State(state): State<AppState>) -> Json<Vec<AuditEntry>> {
    Json(state.audit.recent())
}
