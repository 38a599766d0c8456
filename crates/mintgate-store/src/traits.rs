//! # OrderStore Capability Trait
//!
//! The backend-agnostic storage contract plus the draft/outcome types
//! that cross it. Both backends share the same upsert logic — the
//! functions at the bottom of this module — so the duplicate-
//! suppression and upgrade rules cannot drift between memory and
//! Postgres.

use async_trait::async_trait;
use mintgate_core::{
    ClaimStatus, EventId, MerchantOrderId, Order, OrderId, PaymentStatus, SplitSlug, TicketState,
    Timestamp, TokenId, TxHash, WalletAddress,
};
use mintgate_state::{apply_at_least, infer_ticket_state, OrderPatch};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

// ─── Drafts & Outcomes ───────────────────────────────────────────────

/// Draft for recording a successfully paid (and possibly minted) order.
#[derive(Debug, Clone)]
pub struct PaidOrderDraft {
    pub merchant_order_id: MerchantOrderId,
    pub event_id: EventId,
    pub split_slug: SplitSlug,
    pub order_id: Option<OrderId>,
    pub buyer_address: Option<WalletAddress>,
    pub ticket_type: Option<String>,
    pub seat: Option<String>,
    pub amount_try: Option<String>,
    pub tx_hash: Option<TxHash>,
    pub token_id: Option<TokenId>,
    pub nft_address: Option<WalletAddress>,
    pub custody_address: Option<WalletAddress>,
    pub claim_code_hash: Option<String>,
    pub claim_expires_at: Option<Timestamp>,
}

/// Result of [`OrderStore::record_paid_order`].
#[derive(Debug, Clone)]
pub struct RecordPaidOutcome {
    /// The order as stored after the call.
    pub order: Order,
    /// A new record was created by this call.
    pub created: bool,
    /// The order already carried a `tx_hash`; nothing was written.
    pub duplicate: bool,
}

/// Draft for recording a non-success payment notification.
///
/// Creates a placeholder so operators can see failed/flagged attempts;
/// never touches an existing order.
#[derive(Debug, Clone)]
pub struct StatusDraft {
    pub merchant_order_id: MerchantOrderId,
    pub event_id: EventId,
    pub split_slug: SplitSlug,
    pub payment_status: PaymentStatus,
    pub amount_try: Option<String>,
}

/// Arguments for [`OrderStore::mark_order_claimed`].
#[derive(Debug, Clone)]
pub struct ClaimRecord {
    pub merchant_order_id: MerchantOrderId,
    pub claimed_to: WalletAddress,
    pub claimed_at: Timestamp,
    /// Whether the on-chain claim marker call succeeded.
    pub chain_claimed: bool,
    pub chain_claim_tx_hash: Option<TxHash>,
    pub chain_claim_error: Option<String>,
}

/// One entry in the anti-replay registry, keyed by
/// `used:event:<eventId>:token:<tokenId>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsedTicketRecord {
    /// When the first (winning) check-in happened.
    pub used_at: Timestamp,
    /// Owner wallet at check-in time, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<WalletAddress>,
}

/// Result of [`OrderStore::mark_token_used_once`].
#[derive(Debug, Clone)]
pub struct UsedMarker {
    /// `false` exactly once per `(event, token)` — for the first caller.
    pub already_used: bool,
    /// The winning check-in time (this call's, for the first caller).
    pub used_at: Timestamp,
    /// Owner recorded by the winning check-in.
    pub owner: Option<WalletAddress>,
}

// ─── The Trait ───────────────────────────────────────────────────────

/// Durable keyed storage for orders, with secondary indices and the
/// set-once anti-replay registry.
///
/// Implementations must provide read-after-write consistency per key:
/// a `get_by_merchant_id` issued after a mutation returns the mutated
/// record.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Fetch an order by its idempotency key.
    ///
    /// The returned record has `ticket_state` reconciled from legacy
    /// signal fields; stored data is not mutated.
    async fn get_by_merchant_id(
        &self,
        id: &MerchantOrderId,
    ) -> Result<Option<Order>, StoreError>;

    /// Fetch an order by minted token id (secondary index, populated
    /// when `token_id` is first assigned).
    async fn get_by_token_id(&self, token: &TokenId) -> Result<Option<Order>, StoreError>;

    /// Record a paid (and possibly minted) order.
    ///
    /// - No order for the key: create it at `minted` (token present)
    ///   or `paid`, report `created`.
    /// - Existing order without `tx_hash`: idempotent upgrade to at
    ///   least `minted`, merging the draft fields.
    /// - Existing order with `tx_hash`: return it unchanged with
    ///   `duplicate` set — the duplicate-suppression path.
    async fn record_paid_order(
        &self,
        draft: PaidOrderDraft,
    ) -> Result<RecordPaidOutcome, StoreError>;

    /// Record a non-success payment notification.
    ///
    /// Creates a placeholder at `intent_created` only when no order
    /// exists; a later-arriving stale event never overwrites an
    /// existing order.
    async fn record_order_status(&self, draft: StatusDraft) -> Result<Order, StoreError>;

    /// Record a completed claim on an existing order.
    ///
    /// # Errors
    ///
    /// - [`StoreError::OrderNotFound`] when the order does not exist.
    /// - [`StoreError::ClaimConflict`] when the order was already
    ///   claimed to a different wallet.
    async fn mark_order_claimed(&self, args: ClaimRecord) -> Result<Order, StoreError>;

    /// Record gate validation on an existing order.
    async fn mark_gate_validated(
        &self,
        id: &MerchantOrderId,
        used_by: &str,
    ) -> Result<Order, StoreError>;

    /// Set-once check-in arbitration for `(event, token)`.
    ///
    /// The first caller gets `already_used: false`; every later caller
    /// gets `already_used: true` with the original `used_at`. Consults
    /// the legacy non-event-scoped key and mirrors it into the
    /// event-scoped key when found.
    async fn mark_token_used_once(
        &self,
        event: EventId,
        token: &TokenId,
        owner: Option<&WalletAddress>,
    ) -> Result<UsedMarker, StoreError>;
}

// ─── Shared Upsert Logic ─────────────────────────────────────────────
//
// Both backends route through these so the semantics cannot drift.

/// Reconcile a loaded record's state from legacy signals before
/// handing it to callers. Pure; the stored row is untouched.
pub(crate) fn reconcile(mut order: Order) -> Order {
    order.ticket_state = infer_ticket_state(&order);
    order
}

/// The patch a paid-order draft merges into an order.
pub(crate) fn paid_patch(draft: &PaidOrderDraft) -> OrderPatch {
    OrderPatch {
        order_id: draft.order_id.clone(),
        buyer_address: draft.buyer_address.clone(),
        ticket_type: draft.ticket_type.clone(),
        seat: draft.seat.clone(),
        amount_try: draft.amount_try.clone(),
        payment_status: Some(PaymentStatus::Paid),
        tx_hash: draft.tx_hash.clone(),
        token_id: draft.token_id.clone(),
        nft_address: draft.nft_address.clone(),
        custody_address: draft.custody_address.clone(),
        claim_code_hash: draft.claim_code_hash.clone(),
        claim_expires_at: draft.claim_expires_at,
        ..OrderPatch::default()
    }
}

/// Apply [`OrderStore::record_paid_order`] semantics given the current
/// record (if any). Returns the outcome and whether a write is needed.
pub(crate) fn paid_order_upsert(
    existing: Option<Order>,
    draft: &PaidOrderDraft,
) -> Result<(RecordPaidOutcome, bool), StoreError> {
    match existing {
        Some(order) if order.tx_hash.is_some() => {
            // Duplicate suppression: a second write attempt returns the
            // existing record, never mints or mutates.
            Ok((
                RecordPaidOutcome {
                    order: reconcile(order),
                    created: false,
                    duplicate: true,
                },
                false,
            ))
        }
        Some(order) => {
            let upgraded = apply_at_least(&order, TicketState::Minted, &paid_patch(draft))?;
            Ok((
                RecordPaidOutcome {
                    order: upgraded,
                    created: false,
                    duplicate: false,
                },
                true,
            ))
        }
        None => {
            let state = if draft.token_id.is_some() {
                TicketState::Minted
            } else {
                TicketState::Paid
            };
            let mut order = Order::new(
                draft.merchant_order_id.clone(),
                draft.event_id,
                draft.split_slug.clone(),
                PaymentStatus::Paid,
                state,
            );
            paid_patch(draft).merge_into(&mut order);
            Ok((
                RecordPaidOutcome {
                    order,
                    created: true,
                    duplicate: false,
                },
                true,
            ))
        }
    }
}

/// Build the placeholder record for a non-success notification.
pub(crate) fn status_placeholder(draft: &StatusDraft) -> Order {
    let mut order = Order::new(
        draft.merchant_order_id.clone(),
        draft.event_id,
        draft.split_slug.clone(),
        draft.payment_status,
        TicketState::IntentCreated,
    );
    order.amount_try = draft.amount_try.clone();
    order
}

/// Apply [`OrderStore::mark_order_claimed`] semantics to an existing
/// record.
pub(crate) fn claimed_upsert(order: &Order, args: &ClaimRecord) -> Result<Order, StoreError> {
    if let Some(previous) = &order.claimed_to {
        if previous != &args.claimed_to {
            return Err(StoreError::ClaimConflict {
                merchant_order_id: order.merchant_order_id.clone(),
                claimed_to: previous.as_str().to_string(),
            });
        }
    }
    let patch = OrderPatch {
        claim_status: Some(ClaimStatus::Claimed),
        claimed_to: Some(args.claimed_to.clone()),
        claimed_at: Some(args.claimed_at),
        chain_claimed: Some(args.chain_claimed),
        chain_claim_tx_hash: args.chain_claim_tx_hash.clone(),
        chain_claim_error: args.chain_claim_error.clone(),
        ..OrderPatch::default()
    };
    Ok(apply_at_least(order, TicketState::Claimed, &patch)?)
}

/// Apply [`OrderStore::mark_gate_validated`] semantics.
pub(crate) fn gate_validated_upsert(order: &Order, used_by: &str) -> Result<Order, StoreError> {
    let now = Timestamp::now();
    let patch = OrderPatch {
        used_at: Some(now),
        used_by: Some(used_by.to_string()),
        gate_validated_at: Some(now),
        ..OrderPatch::default()
    };
    Ok(apply_at_least(order, TicketState::GateValidated, &patch)?)
}
