//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented routes into one OpenAPI spec served
//! at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Adds the operator bearer scheme to the spec.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "operatorToken",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some(
                            "Operator bearer token. Set via MINTGATE_OPERATOR_TOKEN; \
                             guards gate check-in and the audit feed.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

/// Assembled OpenAPI spec for the whole surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "mintgate API",
        version = "0.3.2",
        description = "Blockchain-backed ticket issuance: payment webhooks, \
                       signed-intent purchases, claim-code redemption, gate \
                       check-in and order lookup. Every write path is \
                       idempotent under retries and replays; the merchant \
                       order id is the idempotency key throughout.",
        license(name = "AGPL-3.0-or-later")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    paths(
        crate::routes::payments::payment_webhook,
        crate::routes::purchases::purchase,
        crate::routes::claims::claim,
        crate::routes::checkin::check_in,
        crate::routes::orders::get_order,
        crate::routes::audit::recent,
    ),
    components(
        schemas(
            crate::error::ErrorBody,
            crate::error::ErrorDetail,
            crate::routes::payments::WebhookResponse,
            crate::routes::purchases::PurchaseRequest,
            crate::routes::purchases::PurchaseResponse,
            crate::routes::claims::ClaimApiRequest,
            crate::routes::claims::ClaimResponse,
            crate::routes::checkin::CheckinRequest,
            crate::routes::checkin::CheckinResponse,
            crate::routes::orders::OrderView,
            crate::audit::AuditEntry,
        ),
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "payments", description = "Provider webhook intake with HMAC verification"),
        (name = "purchases", description = "Buyer-signed intent purchases"),
        (name = "claims", description = "Claim-code redemption, custody to buyer wallet"),
        (name = "gate", description = "Venue gate check-in, one entry per ticket per event"),
        (name = "orders", description = "Order lookup, reconciled on read"),
        (name = "audit", description = "In-process audit feed for operators"),
    )
)]
pub struct ApiDoc;

/// Serve the generated spec at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_generates_with_all_flows() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "mintgate API");
        for path in [
            "/v1/payments/webhook",
            "/v1/purchases",
            "/v1/claims",
            "/v1/checkin",
            "/v1/orders/{merchantOrderId}",
            "/v1/audit/recent",
        ] {
            assert!(
                spec.paths.paths.contains_key(path),
                "spec should contain {path}"
            );
        }
    }

    #[test]
    fn spec_carries_the_operator_scheme() {
        let spec = ApiDoc::openapi();
        let components = spec.components.as_ref().unwrap();
        assert!(components.security_schemes.contains_key("operatorToken"));
        assert!(components.schemas.contains_key("ErrorBody"));
    }

    #[test]
    fn spec_serializes_to_json() {
        let spec = ApiDoc::openapi();
        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.contains("operatorToken"));
    }
}
