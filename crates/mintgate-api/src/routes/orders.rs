//! # Order Lookup
//!
//! `GET /v1/orders/{merchantOrderId}` returns the current order
//! record, reconciled by the store on read. The claim code hash never
//! leaves the process; everything else on the order is visible.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use mintgate_core::{MerchantOrderId, Order};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/orders/:merchant_order_id", get(get_order))
}

/// Public view of an order. Mirrors the stored record minus the claim
/// code hash.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub merchant_order_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    pub event_id: u64,
    pub split_slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_try: Option<String>,
    pub payment_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nft_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custody_address: Option<String>,
    pub claim_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_expires_at: Option<String>,
    pub chain_claimed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_claim_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gate_validated_at: Option<String>,
    pub ticket_state: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        Self {
            merchant_order_id: order.merchant_order_id.to_string(),
            order_id: order.order_id.map(|v| v.to_string()),
            event_id: order.event_id.0,
            split_slug: order.split_slug.to_string(),
            buyer_address: order.buyer_address.map(|v| v.to_string()),
            ticket_type: order.ticket_type,
            seat: order.seat,
            amount_try: order.amount_try,
            payment_status: order.payment_status.as_str().to_string(),
            tx_hash: order.tx_hash.map(|v| v.to_string()),
            token_id: order.token_id.map(|v| v.to_string()),
            nft_address: order.nft_address.map(|v| v.to_string()),
            custody_address: order.custody_address.map(|v| v.to_string()),
            claim_status: order.claim_status.as_str().to_string(),
            claimed_to: order.claimed_to.map(|v| v.to_string()),
            claimed_at: order.claimed_at.map(|v| v.to_string()),
            claim_expires_at: order.claim_expires_at.map(|v| v.to_string()),
            chain_claimed: order.chain_claimed,
            chain_claim_error: order.chain_claim_error,
            used_at: order.used_at.map(|v| v.to_string()),
            used_by: order.used_by,
            gate_validated_at: order.gate_validated_at.map(|v| v.to_string()),
            ticket_state: order.ticket_state.as_str().to_string(),
            created_at: order.created_at.to_string(),
            updated_at: order.updated_at.to_string(),
        }
    }
}

/// GET /v1/orders/{merchantOrderId} — fetch one order.
#[utoipa::path(
    get,
    path = "/v1/orders/{merchantOrderId}",
    tag = "orders",
    params(
        ("merchantOrderId" = String, Path, description = "Idempotency key the order was created under"),
    ),
    responses(
        (status = 200, description = "Current order record", body = OrderView),
        (status = 404, description = "No order for the key"),
    )
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(merchant_order_id): Path<String>,
) -> Result<Json<OrderView>, AppError> {
    let merchant_order_id = MerchantOrderId::new(&merchant_order_id)
        .map_err(|e| AppError::MissingFields(e.to_string()))?;
    let order = state
        .store
        .get_by_merchant_id(&merchant_order_id)
        .await?
        .ok_or_else(|| AppError::OrderNotFound(merchant_order_id.to_string()))?;
    Ok(Json(OrderView::from(order)))
}
