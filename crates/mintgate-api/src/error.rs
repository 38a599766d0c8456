//! # API Error Types
//!
//! One structured error type implementing `axum::response::IntoResponse`.
//! Every response carries a machine-readable `reason` alongside the
//! status, because one status code covers several meaningfully
//! different reasons (400 is both "missing field" and "bad wallet",
//! 401 is both "bad signature" and "bad claim code") and clients render
//! different UX for each. Internal details never leave the process in
//! 500-class bodies.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mintgate_orchestrator::claim::ClaimReject;
use mintgate_orchestrator::gate::GateError;
use mintgate_orchestrator::intent::IntentError;
use mintgate_orchestrator::purchase::PurchaseError;
use mintgate_store::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable reason (e.g. "order_not_found", "invalid_code").
    pub reason: String,
    /// Human-readable message.
    pub message: String,
}

/// Application-level error mapped to the response status/reason table.
#[derive(Error, Debug)]
pub enum AppError {
    /// Request body could not be parsed (400).
    #[error("invalid json: {0}")]
    InvalidJson(String),

    /// A required field is missing or empty (400).
    #[error("missing fields: {0}")]
    MissingFields(String),

    /// A wallet address failed validation (400).
    #[error("invalid wallet: {0}")]
    InvalidWallet(String),

    /// Intent or webhook signature verification failed (401).
    #[error("invalid signature")]
    InvalidSignature,

    /// Claim code does not match (401).
    #[error("invalid claim code")]
    InvalidCode,

    /// Operator credentials missing or wrong (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Sales for the event are administratively paused (400).
    #[error("sales paused: {0}")]
    SalesPaused(String),

    /// The order exists but has no confirmed payment (400).
    #[error("order not paid: {0}")]
    OrderNotPaid(String),

    /// Ticket already claimed by a different wallet (403).
    #[error("ticket belongs to another wallet")]
    NotOwner,

    /// No order for the key (404).
    #[error("order not found: {0}")]
    OrderNotFound(String),

    /// Claim code expired (410).
    #[error("claim code expired")]
    ClaimExpired,

    /// Fixed-window limit exceeded (429).
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// A required secret or setting is absent (500).
    #[error("server misconfigured")]
    ServerMisconfigured,

    /// The claim pipeline failed after preconditions passed (500).
    #[error("claim failed: {0}")]
    ClaimFailed(String),

    /// A chain call failed; message carries the stage marker (500).
    #[error("chain error: {0}")]
    Chain(String),

    /// Anything else (500). Message is logged, never returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// The HTTP status and machine-readable reason for this error.
    pub fn status_and_reason(&self) -> (StatusCode, &'static str) {
        match self {
            Self::InvalidJson(_) => (StatusCode::BAD_REQUEST, "invalid_json"),
            Self::MissingFields(_) => (StatusCode::BAD_REQUEST, "missing_fields"),
            Self::InvalidWallet(_) => (StatusCode::BAD_REQUEST, "invalid_wallet"),
            Self::InvalidSignature => (StatusCode::UNAUTHORIZED, "invalid_signature"),
            Self::InvalidCode => (StatusCode::UNAUTHORIZED, "invalid_code"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            Self::SalesPaused(_) => (StatusCode::BAD_REQUEST, "sales_paused"),
            Self::OrderNotPaid(_) => (StatusCode::BAD_REQUEST, "order_not_paid"),
            Self::NotOwner => (StatusCode::FORBIDDEN, "not_owner"),
            Self::OrderNotFound(_) => (StatusCode::NOT_FOUND, "order_not_found"),
            Self::ClaimExpired => (StatusCode::GONE, "claim_expired"),
            Self::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            Self::ServerMisconfigured => {
                (StatusCode::INTERNAL_SERVER_ERROR, "server_misconfigured")
            }
            Self::ClaimFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, "claim_failed"),
            Self::Chain(_) => (StatusCode::INTERNAL_SERVER_ERROR, "chain_error"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, reason) = self.status_and_reason();

        // 500-class messages stay server-side.
        let message = if status.is_server_error() {
            match &self {
                Self::ServerMisconfigured => "server misconfigured".to_string(),
                Self::ClaimFailed(_) => "claim failed".to_string(),
                Self::Chain(_) => "chain call failed".to_string(),
                _ => "an internal error occurred".to_string(),
            }
        } else {
            self.to_string()
        };

        match &self {
            Self::Internal(_) | Self::ServerMisconfigured => {
                tracing::error!(error = %self, "internal server error")
            }
            Self::ClaimFailed(_) | Self::Chain(_) => {
                tracing::error!(error = %self, "pipeline failure")
            }
            Self::RateLimited { .. } => tracing::debug!(error = %self, "request rate limited"),
            _ => tracing::debug!(error = %self, "request rejected"),
        }

        let body = ErrorBody {
            error: ErrorDetail {
                reason: reason.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

// ─── Domain Error Mapping ────────────────────────────────────────────

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::OrderNotFound(id) => Self::OrderNotFound(id.to_string()),
            StoreError::ClaimConflict { .. } => Self::NotOwner,
            // Transition rejections reaching the API mean a code path
            // bypassed the locking discipline. Hard fault.
            StoreError::State(inner) => {
                tracing::error!(error = %inner, "illegal transition escaped the lock discipline");
                Self::Internal(inner.to_string())
            }
            StoreError::Database(inner) => Self::Internal(inner.to_string()),
            StoreError::Corrupt(inner) => Self::Internal(inner.to_string()),
        }
    }
}

impl From<PurchaseError> for AppError {
    fn from(e: PurchaseError) -> Self {
        match e {
            PurchaseError::Intent(IntentError::InvalidSignature) => Self::InvalidSignature,
            PurchaseError::Intent(IntentError::Expired { .. }) => {
                Self::MissingFields("intent deadline has passed".to_string())
            }
            PurchaseError::EventPaused(event) => {
                Self::SalesPaused(format!("event {event} is paused"))
            }
            PurchaseError::InvalidPrice => {
                Self::MissingFields("amount must be positive".to_string())
            }
            PurchaseError::NoRecipient => Self::ServerMisconfigured,
            PurchaseError::Store(inner) => inner.into(),
            PurchaseError::Chain(inner) => Self::Chain(inner.to_string()),
        }
    }
}

impl From<ClaimReject> for AppError {
    fn from(e: ClaimReject) -> Self {
        match e {
            ClaimReject::OrderNotFound => Self::OrderNotFound("no such order".to_string()),
            ClaimReject::OrderNotPaid => {
                Self::OrderNotPaid("payment is not confirmed".to_string())
            }
            ClaimReject::NotOwner => Self::NotOwner,
            ClaimReject::Expired => Self::ClaimExpired,
            ClaimReject::NotReady => Self::ClaimFailed("ticket not ready".to_string()),
            ClaimReject::InvalidCode => Self::InvalidCode,
            ClaimReject::Failed(reason) => Self::ClaimFailed(reason),
            ClaimReject::Store(inner) => inner.into(),
            ClaimReject::Chain(inner) => Self::Chain(inner.to_string()),
        }
    }
}

impl From<GateError> for AppError {
    fn from(e: GateError) -> Self {
        match e {
            GateError::UnknownTicket(token) => Self::OrderNotFound(format!("token {token}")),
            GateError::Store(inner) => inner.into(),
        }
    }
}
