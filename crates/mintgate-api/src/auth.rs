//! # Operator Authentication
//!
//! Bearer-token middleware for the operator surface (gate check-in and
//! the audit feed). Buyer-facing routes stay open; buyers authenticate
//! with signatures and claim codes, not bearer tokens.

use axum::extract::Request;
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;

use crate::error::AppError;

/// Operator token injected into request extensions.
///
/// Custom `Debug` redacts the token so it cannot leak through logs.
#[derive(Clone)]
pub struct OperatorAuth {
    pub token: Option<String>,
}

impl std::fmt::Debug for OperatorAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorAuth")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Constant-time bearer comparison. A length mismatch still runs a
/// dummy comparison so timing does not reveal the token length.
fn token_matches(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Middleware guarding operator routes.
///
/// When no token is configured the guard is disabled and every request
/// passes; that mode is only sane for development.
pub async fn operator_auth_middleware(request: Request, next: Next) -> Response {
    let auth = request.extensions().get::<OperatorAuth>().cloned();

    let Some(OperatorAuth {
        token: Some(expected),
    }) = auth
    else {
        return next.run(request).await;
    };

    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match header_value {
        Some(value) if value.starts_with("Bearer ") => {
            if token_matches(&value[7..], &expected) {
                next.run(request).await
            } else {
                tracing::warn!("operator auth failed, wrong bearer token");
                AppError::Unauthorized("invalid operator token".into()).into_response()
            }
        }
        Some(_) => {
            AppError::Unauthorized("authorization header must use Bearer scheme".into())
                .into_response()
        }
        None => AppError::Unauthorized("missing authorization header".into()).into_response(),
    }
}
