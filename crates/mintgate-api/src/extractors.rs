//! # Request Extraction Helpers
//!
//! Handlers take `Result<Json<T>, JsonRejection>` and run the payload
//! through [`extract_validated_json`], so parse failures and
//! validation failures both land in the reason taxonomy instead of
//! axum's default plaintext rejections.

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::AppError;

/// Request-level semantic validation, applied after deserialization.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// Unwrap a JSON extraction and validate the payload.
pub fn extract_validated_json<T: Validate>(
    payload: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let Json(value) = payload.map_err(|rejection| AppError::InvalidJson(rejection.body_text()))?;
    value.validate().map_err(AppError::MissingFields)?;
    Ok(value)
}
