//! End-to-end router tests against in-memory backends and the
//! simulated chain. Every request goes through the full middleware
//! stack via `tower::ServiceExt::oneshot`.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ed25519_dalek::{Signer, SigningKey};
use hmac::{Hmac, Mac};
use http_body_util::BodyExt;
use mintgate_api::state::{AppConfig, AppState};
use mintgate_core::{EventId, MerchantOrderId, SplitSlug, Timestamp, WalletAddress};
use mintgate_orchestrator::intent::{wallet_for_key, PurchaseIntent};
use mintgate_payment::VerifierConfig;
use rand::rngs::OsRng;
use serde_json::{json, Value};
use sha2::Sha256;
use tower::ServiceExt;

const SECRET: &str = "merchant-key";
const SALT: &str = "merchant-salt";

fn test_config() -> AppConfig {
    AppConfig {
        operator_token: Some("gate-secret".into()),
        custody_address: Some(custody_wallet()),
        verifier: VerifierConfig {
            secret: Some(SECRET.into()),
            secret_test: None,
            salt: SALT.into(),
        },
        ..AppConfig::default()
    }
}

fn custody_wallet() -> WalletAddress {
    WalletAddress::parse(format!("0x{}", "ab".repeat(20))).unwrap()
}

fn test_app(config: AppConfig) -> Router {
    mintgate_api::app(AppState::in_memory(config).unwrap())
}

fn webhook_hash(merchant_order_id: &str, status: &str, total_amount: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).unwrap();
    mac.update(format!("{merchant_order_id}{SALT}{status}{total_amount}").as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, value)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// A fresh buyer key plus a fully signed purchase payload.
fn signed_purchase_payload(merchant_order_id: &str) -> (SigningKey, WalletAddress, Value) {
    let key = SigningKey::generate(&mut OsRng);
    let buyer = wallet_for_key(&key.verifying_key()).unwrap();
    let intent = PurchaseIntent {
        buyer: buyer.clone(),
        split_slug: SplitSlug::new("main-hall").unwrap(),
        merchant_order_id: MerchantOrderId::new(merchant_order_id).unwrap(),
        event_id: EventId(7),
        amount_wei: 1_000_000,
        deadline: Timestamp::now().plus_secs(600),
    };
    let signature = key.sign(&intent.canonical_bytes());
    let payload = json!({
        "buyer": buyer.as_str(),
        "splitSlug": "main-hall",
        "merchantOrderId": merchant_order_id,
        "eventId": 7,
        "amountWei": "1000000",
        "deadline": intent.deadline.epoch_secs(),
        "verifyingKey": hex(key.verifying_key().as_bytes()),
        "signature": hex(&signature.to_bytes()),
    });
    (key, buyer, payload)
}

// ---- health and metrics ----

#[tokio::test]
async fn health_probes_answer_without_credentials() {
    let app = test_app(test_config());
    let (status, body) = send(&app, get("/health/liveness")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".into()));

    let (status, body) = send(&app, get("/health/readiness")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ready".into()));
}

#[tokio::test]
async fn metrics_scrape_reflects_traffic() {
    let app = test_app(test_config());
    let _ = send(&app, get("/v1/orders/ghost-order")).await;

    let response = app.clone().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("mintgate_http_requests_total"));
    assert!(text.contains("{merchantOrderId}"));
}

#[tokio::test]
async fn openapi_spec_is_served() {
    let app = test_app(test_config());
    let (status, body) = send(&app, get("/openapi.json")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/v1/claims"].is_object());
}

// ---- payment webhook ----

#[tokio::test]
async fn webhook_mints_once_and_replays_are_duplicates() {
    let app = test_app(test_config());
    let payload = json!({
        "merchantOrderId": "web-1",
        "status": "success",
        "totalAmount": "450.00",
        "hash": webhook_hash("web-1", "success", "450.00"),
    });

    let (status, body) = send(&app, post_json("/v1/payments/webhook", payload.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "processed");
    let tx_hash = body["txHash"].as_str().unwrap().to_string();
    assert!(body["tokenId"].is_string());
    // Custody mint: the claim code is delivered exactly once.
    assert!(body["claimCode"].is_string());

    let (status, body) = send(&app, post_json("/v1/payments/webhook", payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "duplicate");
    assert_eq!(body["txHash"], tx_hash.as_str());
    assert!(body.get("claimCode").is_none());
}

#[tokio::test]
async fn webhook_missing_hash_is_rejected_with_the_provider_reason() {
    let app = test_app(test_config());
    let payload = json!({
        "merchantOrderId": "web-2",
        "status": "success",
        "totalAmount": "450.00",
    });
    let (status, body) = send(&app, post_json("/v1/payments/webhook", payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["reason"], "missing_fields");
    assert_eq!(body["error"]["message"], "Missing hash");
}

#[tokio::test]
async fn webhook_junk_body_is_malformed_payload() {
    let app = test_app(test_config());
    let request = Request::builder()
        .method("POST")
        .uri("/v1/payments/webhook")
        .header("content-type", "text/plain")
        .body(Body::from("definitely not a notification"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["reason"], "invalid_json");
    assert_eq!(body["error"]["message"], "Malformed payload");
}

#[tokio::test]
async fn webhook_bad_signature_is_unauthorized() {
    let app = test_app(test_config());
    let payload = json!({
        "merchantOrderId": "web-3",
        "status": "success",
        "totalAmount": "450.00",
        "hash": "AAAA",
    });
    let (status, body) = send(&app, post_json("/v1/payments/webhook", payload)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["reason"], "invalid_signature");
    assert_eq!(body["error"]["message"], "Invalid signature");
}

#[tokio::test]
async fn webhook_without_secret_is_server_misconfigured() {
    let mut config = test_config();
    config.verifier.secret = None;
    let app = test_app(config);
    let payload = json!({
        "merchantOrderId": "web-4",
        "status": "success",
        "totalAmount": "450.00",
        "hash": "AAAA",
    });
    let (status, body) = send(&app, post_json("/v1/payments/webhook", payload)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["reason"], "server_misconfigured");
}

#[tokio::test]
async fn webhook_failed_payment_is_acknowledged_without_minting() {
    let app = test_app(test_config());
    let payload = json!({
        "merchantOrderId": "web-5",
        "status": "failed",
        "totalAmount": "450.00",
        "hash": webhook_hash("web-5", "failed", "450.00"),
    });
    let (status, body) = send(&app, post_json("/v1/payments/webhook", payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "status_recorded");
    assert_eq!(body["paymentStatus"], "failed");

    let (status, body) = send(&app, get("/v1/orders/web-5")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("txHash").is_none());
    assert_eq!(body["ticketState"], "intent_created");
}

#[tokio::test]
async fn order_view_reports_states_in_snake_case() {
    let app = test_app(test_config());
    let payload = json!({
        "merchantOrderId": "web-6",
        "status": "success",
        "totalAmount": "450.00",
        "hash": webhook_hash("web-6", "success", "450.00"),
    });
    let (status, _) = send(&app, post_json("/v1/payments/webhook", payload)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, get("/v1/orders/web-6")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ticketState"], "minted");
    assert_eq!(body["paymentStatus"], "paid");
    assert_eq!(body["claimStatus"], "unclaimed");
}

#[tokio::test]
async fn claim_against_an_unpaid_order_reports_order_not_paid() {
    let app = test_app(test_config());
    let payload = json!({
        "merchantOrderId": "web-7",
        "status": "failed",
        "totalAmount": "450.00",
        "hash": webhook_hash("web-7", "failed", "450.00"),
    });
    let (status, _) = send(&app, post_json("/v1/payments/webhook", payload)).await;
    assert_eq!(status, StatusCode::OK);

    let claim = json!({
        "merchantOrderId": "web-7",
        "code": "AAAA-AAAA-AAAA",
        "destination": format!("0x{}", "ab".repeat(20)),
    });
    let (status, body) = send(&app, post_json("/v1/claims", claim)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["reason"], "order_not_paid");
}

// ---- purchase, claim and check-in ----

#[tokio::test]
async fn full_lifecycle_purchase_claim_checkin() {
    let app = test_app(test_config());
    let (_, buyer, payload) = signed_purchase_payload("ord-100");

    let (status, body) = send(&app, post_json("/v1/purchases", payload.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "processed");
    let claim_code = body["claimCode"].as_str().unwrap().to_string();
    let token_id = body["tokenId"].as_str().unwrap().to_string();

    // Resubmitting the identical intent does not mint again.
    let (status, body) = send(&app, post_json("/v1/purchases", payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "duplicate");

    // Redeem the claim code.
    let claim = json!({
        "merchantOrderId": "ord-100",
        "code": claim_code,
        "destination": buyer.as_str(),
    });
    let (status, body) = send(&app, post_json("/v1/claims", claim.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "processed");
    assert!(body["txHash"].is_string());

    // Same wallet again: idempotent.
    let (status, body) = send(&app, post_json("/v1/claims", claim)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "duplicate");

    // A different wallet is an ownership violation.
    let rival = json!({
        "merchantOrderId": "ord-100",
        "code": claim_code,
        "destination": format!("0x{}", "cd".repeat(20)),
    });
    let (status, body) = send(&app, post_json("/v1/claims", rival)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["reason"], "not_owner");

    // Gate check-in admits once, then reports the original entry.
    let checkin = json!({"eventId": 7, "tokenId": token_id, "operator": "gate-1"});
    let authed = |body: &Value| {
        Request::builder()
            .method("POST")
            .uri("/v1/checkin")
            .header("content-type", "application/json")
            .header("authorization", "Bearer gate-secret")
            .body(Body::from(body.to_string()))
            .unwrap()
    };
    let (status, body) = send(&app, authed(&checkin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "processed");
    let used_at = body["usedAt"].as_str().unwrap().to_string();

    let (status, body) = send(&app, authed(&checkin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "duplicate");
    assert_eq!(body["usedAt"], used_at.as_str());

    // The order record reflects the full lifecycle.
    let (status, body) = send(&app, get("/v1/orders/ord-100")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ticketState"], "gate_validated");
    assert_eq!(body["claimedTo"], buyer.as_str());
    assert_eq!(body["usedBy"], "gate-1");
    assert!(body.get("claimCodeHash").is_none());
}

#[tokio::test]
async fn tampered_purchase_signature_is_rejected() {
    let app = test_app(test_config());
    let (_, _, mut payload) = signed_purchase_payload("ord-101");
    payload["amountWei"] = Value::String("2000000".into());

    let (status, body) = send(&app, post_json("/v1/purchases", payload)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["reason"], "invalid_signature");
}

#[tokio::test]
async fn wrong_claim_code_is_unauthorized() {
    let app = test_app(test_config());
    let (_, buyer, payload) = signed_purchase_payload("ord-102");
    let (status, _) = send(&app, post_json("/v1/purchases", payload)).await;
    assert_eq!(status, StatusCode::OK);

    let claim = json!({
        "merchantOrderId": "ord-102",
        "code": "AAAA-AAAA-AAAA",
        "destination": buyer.as_str(),
    });
    let (status, body) = send(&app, post_json("/v1/claims", claim)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["reason"], "invalid_code");
}

#[tokio::test]
async fn direct_to_buyer_mint_needs_no_claim() {
    let mut config = test_config();
    config.custody_address = None;
    let app = test_app(config);
    let (_, buyer, payload) = signed_purchase_payload("ord-103");

    let (status, body) = send(&app, post_json("/v1/purchases", payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "processed");
    assert!(body.get("claimCode").is_none());

    let claim = json!({
        "merchantOrderId": "ord-103",
        "code": "AAAA-AAAA-AAAA",
        "destination": buyer.as_str(),
    });
    let (status, body) = send(&app, post_json("/v1/claims", claim)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "not_required");
}

#[tokio::test]
async fn paused_event_rejects_purchases() {
    let mut config = test_config();
    config.paused_events = vec![7];
    let app = test_app(config);
    let (_, _, payload) = signed_purchase_payload("ord-104");

    let (status, body) = send(&app, post_json("/v1/purchases", payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["reason"], "sales_paused");
}

#[tokio::test]
async fn malformed_purchase_json_is_a_structured_rejection() {
    let app = test_app(test_config());
    let request = Request::builder()
        .method("POST")
        .uri("/v1/purchases")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["reason"], "invalid_json");
}

// ---- operator surface ----

#[tokio::test]
async fn checkin_requires_the_operator_token() {
    let app = test_app(test_config());
    let checkin = json!({"eventId": 7, "tokenId": "1"});

    let (status, body) = send(&app, post_json("/v1/checkin", checkin.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["reason"], "unauthorized");

    let wrong = Request::builder()
        .method("POST")
        .uri("/v1/checkin")
        .header("content-type", "application/json")
        .header("authorization", "Bearer wrong")
        .body(Body::from(checkin.to_string()))
        .unwrap();
    let (status, _) = send(&app, wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_token_cannot_check_in() {
    let app = test_app(test_config());
    let request = Request::builder()
        .method("POST")
        .uri("/v1/checkin")
        .header("content-type", "application/json")
        .header("authorization", "Bearer gate-secret")
        .body(Body::from(json!({"eventId": 7, "tokenId": "999"}).to_string()))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["reason"], "order_not_found");
}

#[tokio::test]
async fn audit_feed_records_outcomes_newest_first() {
    let app = test_app(test_config());
    let (_, _, payload) = signed_purchase_payload("ord-105");
    let _ = send(&app, post_json("/v1/purchases", payload.clone())).await;
    let _ = send(&app, post_json("/v1/purchases", payload)).await;

    let request = Request::builder()
        .uri("/v1/audit/recent")
        .header("authorization", "Bearer gate-secret")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().unwrap();
    assert!(entries.len() >= 2);
    assert_eq!(entries[0]["outcome"], "duplicate");
    assert_eq!(entries[1]["outcome"], "processed");
    assert_eq!(entries[0]["merchantOrderId"], "ord-105");
}

// ---- rate limiting ----

#[tokio::test]
async fn rate_limit_kicks_in_per_route() {
    let mut config = test_config();
    config.rate_limit.max_requests = 2;
    let app = test_app(config);

    for _ in 0..2 {
        let (status, _) = send(&app, get("/v1/orders/ord-x")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
    let (status, body) = send(&app, get("/v1/orders/ord-x")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["reason"], "rate_limited");

    // Health probes sit outside the limited router.
    let (status, _) = send(&app, get("/health/liveness")).await;
    assert_eq!(status, StatusCode::OK);
}

// ---- order lookup ----

#[tokio::test]
async fn missing_order_is_not_found() {
    let app = test_app(test_config());
    let (status, body) = send(&app, get("/v1/orders/ghost")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["reason"], "order_not_found");
}
