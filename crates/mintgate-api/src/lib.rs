//! # mintgate-api — HTTP Surface
//!
//! Axum services for ticket issuance: payment webhooks, signed-intent
//! purchases, claim redemption, gate check-in, order lookup and an
//! operator audit feed.
//!
//! ## API Surface
//!
//! | Route                       | Module               | Auth      |
//! |-----------------------------|----------------------|-----------|
//! | `POST /v1/payments/webhook` | [`routes::payments`] | HMAC      |
//! | `POST /v1/purchases`        | [`routes::purchases`]| signature |
//! | `POST /v1/claims`           | [`routes::claims`]   | claim code|
//! | `GET /v1/orders/{id}`       | [`routes::orders`]   | none      |
//! | `POST /v1/checkin`          | [`routes::checkin`]  | operator  |
//! | `GET /v1/audit/recent`      | [`routes::audit`]    | operator  |
//!
//! Health probes (`/health/*`), `/metrics` and `/openapi.json` are
//! unauthenticated.
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer -> Metrics -> RateLimit -> OperatorAuth -> Handler
//! ```

pub mod audit;
pub mod auth;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Router};
use mintgate_core::MerchantOrderId;
use tower_http::trace::TraceLayer;

use crate::auth::OperatorAuth;
use crate::middleware::metrics::ApiMetrics;
use crate::middleware::rate_limit::RateLimiter;
use crate::state::AppState;

/// Assemble the full application router.
pub fn app(state: AppState) -> Router {
    let metrics = ApiMetrics::new();
    let limiter = RateLimiter::new(state.config.rate_limit.clone());
    let operator_auth = OperatorAuth {
        token: state.config.operator_token.clone(),
    };

    let operator_routes = Router::new()
        .merge(routes::checkin::router())
        .merge(routes::audit::router())
        .route_layer(from_fn(auth::operator_auth_middleware));

    // Request bodies are small JSON documents or webhook forms; 64 KiB
    // is generous.
    let api = Router::new()
        .merge(routes::payments::router())
        .merge(routes::purchases::router())
        .merge(routes::claims::router())
        .merge(routes::orders::router())
        .merge(operator_routes)
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(from_fn(middleware::rate_limit::rate_limit_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(metrics.clone()))
        .layer(Extension(limiter))
        .layer(Extension(operator_auth))
        .with_state(state.clone());

    let unauthenticated = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(prometheus_metrics))
        .layer(Extension(metrics))
        .with_state(state);

    Router::new().merge(unauthenticated).merge(api)
}

/// GET /metrics — Prometheus text exposition.
async fn prometheus_metrics(Extension(metrics): Extension<ApiMetrics>) -> impl IntoResponse {
    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

/// Liveness probe. 200 whenever the process runs.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe. Exercises one store read so a dead database
/// surfaces as 503 instead of failing requests.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let probe = MerchantOrderId::new("readiness-probe").expect("constant id is valid");
    match state.store.get_by_merchant_id(&probe).await {
        Ok(_) => (StatusCode::OK, "ready").into_response(),
        Err(e) => {
            tracing::warn!("store health check failed: {e}");
            (StatusCode::SERVICE_UNAVAILABLE, "store unreachable").into_response()
        }
    }
}
