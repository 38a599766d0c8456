//! # Order Patch — Field Merge for Transitions
//!
//! A patch is the set of fields a transition wants to write alongside
//! the state change. Merging is last-writer-wins per field, with one
//! exception: `tx_hash` is set-once and an attempt to overwrite it is
//! ignored and logged — duplicate suppression happens upstream, this
//! is the backstop.

use mintgate_core::{
    ClaimStatus, Order, OrderId, PaymentStatus, Timestamp, TokenId, TxHash, WalletAddress,
};

/// Fields a transition may merge into an order.
///
/// All fields default to `None` / unset; construct with struct-update
/// syntax:
///
/// ```
/// use mintgate_state::OrderPatch;
/// let patch = OrderPatch {
///     ticket_type: Some("general".to_string()),
///     ..OrderPatch::default()
/// };
/// ```
#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
    pub order_id: Option<OrderId>,
    pub buyer_address: Option<WalletAddress>,
    pub ticket_type: Option<String>,
    pub seat: Option<String>,
    pub amount_try: Option<String>,
    pub payment_status: Option<PaymentStatus>,
    pub tx_hash: Option<TxHash>,
    pub token_id: Option<TokenId>,
    pub nft_address: Option<WalletAddress>,
    pub custody_address: Option<WalletAddress>,
    pub claim_code_hash: Option<String>,
    pub claim_status: Option<ClaimStatus>,
    pub claimed_to: Option<WalletAddress>,
    pub claimed_at: Option<Timestamp>,
    pub claim_expires_at: Option<Timestamp>,
    pub chain_claimed: Option<bool>,
    pub chain_claim_tx_hash: Option<TxHash>,
    pub chain_claim_error: Option<String>,
    pub used_at: Option<Timestamp>,
    pub used_by: Option<String>,
    pub gate_validated_at: Option<Timestamp>,
}

impl OrderPatch {
    /// Merge the set fields of this patch into `order`.
    ///
    /// Does not touch `ticket_state` or the timestamps — the state
    /// machine owns those.
    pub fn merge_into(&self, order: &mut Order) {
        if let Some(v) = &self.order_id {
            order.order_id = Some(v.clone());
        }
        if let Some(v) = &self.buyer_address {
            order.buyer_address = Some(v.clone());
        }
        if let Some(v) = &self.ticket_type {
            order.ticket_type = Some(v.clone());
        }
        if let Some(v) = &self.seat {
            order.seat = Some(v.clone());
        }
        if let Some(v) = &self.amount_try {
            order.amount_try = Some(v.clone());
        }
        if let Some(v) = self.payment_status {
            order.payment_status = v;
        }
        if let Some(v) = &self.tx_hash {
            match &order.tx_hash {
                None => order.tx_hash = Some(v.clone()),
                Some(existing) if existing == v => {}
                Some(existing) => {
                    // Set-once violation: keep the original, this is a
                    // replay that slipped past duplicate suppression.
                    tracing::warn!(
                        merchant_order_id = %order.merchant_order_id,
                        existing = %existing,
                        attempted = %v,
                        "refusing to overwrite tx_hash"
                    );
                }
            }
        }
        if let Some(v) = &self.token_id {
            order.token_id = Some(v.clone());
        }
        if let Some(v) = &self.nft_address {
            order.nft_address = Some(v.clone());
        }
        if let Some(v) = &self.custody_address {
            order.custody_address = Some(v.clone());
        }
        if let Some(v) = &self.claim_code_hash {
            order.claim_code_hash = Some(v.clone());
        }
        if let Some(v) = self.claim_status {
            order.claim_status = v;
        }
        if let Some(v) = &self.claimed_to {
            order.claimed_to = Some(v.clone());
        }
        if let Some(v) = self.claimed_at {
            order.claimed_at = Some(v);
        }
        if let Some(v) = self.claim_expires_at {
            order.claim_expires_at = Some(v);
        }
        if let Some(v) = self.chain_claimed {
            order.chain_claimed = v;
        }
        if let Some(v) = &self.chain_claim_tx_hash {
            order.chain_claim_tx_hash = Some(v.clone());
        }
        if let Some(v) = &self.chain_claim_error {
            order.chain_claim_error = Some(v.clone());
        }
        if let Some(v) = self.used_at {
            order.used_at = Some(v);
        }
        if let Some(v) = &self.used_by {
            order.used_by = Some(v.clone());
        }
        if let Some(v) = self.gate_validated_at {
            order.gate_validated_at = Some(v);
        }
    }
}
