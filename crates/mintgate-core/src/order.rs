//! # Order — The Durable Record of One Ticket Purchase
//!
//! One `Order` exists per logical purchase, keyed by the caller-supplied
//! idempotency key (`merchant_order_id`). The record accretes fields as
//! the purchase moves through the pipeline: payment notification fills
//! the commercial fields, minting fills the issuance fields, claiming
//! and check-in fill theirs.
//!
//! ## Invariants
//!
//! - `merchant_order_id` is immutable and globally unique.
//! - `tx_hash`, once set, is never overwritten — a present tx hash is
//!   the duplicate-suppression marker for the whole pipeline.
//! - `ticket_state` only advances along the lifecycle graph (owned by
//!   `mintgate-state`); it is never regressed.
//! - `updated_at` is monotonically non-decreasing.

use serde::{Deserialize, Serialize};

use crate::identity::{
    EventId, MerchantOrderId, OrderId, SplitSlug, TokenId, TxHash, WalletAddress,
};
use crate::temporal::Timestamp;

// ─── Ticket Lifecycle State ──────────────────────────────────────────

/// The lifecycle state of a ticket order.
///
/// States form a total rank order used for idempotent upgrades; the
/// allowed direct transitions live in `mintgate-state`.
/// `GateValidated` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketState {
    /// A buyer intent or failed-payment placeholder exists; nothing minted.
    IntentCreated,
    /// Payment confirmed; mint not yet performed.
    Paid,
    /// Ticket minted on chain.
    Minted,
    /// Minted to a custody address and ready for the buyer to claim.
    Claimable,
    /// Transferred to the buyer's wallet.
    Claimed,
    /// Checked in at the gate (terminal).
    GateValidated,
}

impl TicketState {
    /// Position of this state in the fixed total order over states.
    ///
    /// Used by the idempotent-upgrade operation: replayed events may
    /// only move an order toward higher ranks, never back.
    pub fn rank(&self) -> u8 {
        match self {
            Self::IntentCreated => 0,
            Self::Paid => 1,
            Self::Minted => 2,
            Self::Claimable => 3,
            Self::Claimed => 4,
            Self::GateValidated => 5,
        }
    }

    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::GateValidated)
    }

    /// Stable string form, matching the stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IntentCreated => "intent_created",
            Self::Paid => "paid",
            Self::Minted => "minted",
            Self::Claimable => "claimable",
            Self::Claimed => "claimed",
            Self::GateValidated => "gate_validated",
        }
    }
}

impl std::fmt::Display for TicketState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Payment / Claim Status ──────────────────────────────────────────

/// Status of the off-chain payment backing an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Payment confirmed by the provider.
    Paid,
    /// Awaiting provider confirmation.
    Pending,
    /// Provider reported failure.
    Failed,
    /// Provider flagged the payment for review.
    Flagged,
}

impl PaymentStatus {
    /// Stable string form, matching the stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Pending => "pending",
            Self::Failed => "failed",
            Self::Flagged => "flagged",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the custody-held ticket has been claimed by its buyer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    /// Still held at the custody address (or minted direct-to-buyer).
    Unclaimed,
    /// Transferred to the buyer's wallet.
    Claimed,
}

impl ClaimStatus {
    /// Stable string form, matching the stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unclaimed => "unclaimed",
            Self::Claimed => "claimed",
        }
    }
}

impl std::fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Order ───────────────────────────────────────────────────────────

/// The durable record of one ticket purchase attempt.
///
/// Wire format is camelCase: the record round-trips through the same
/// JSON representation the payment provider and claim clients use.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    // -- identity --
    /// Caller-supplied idempotency key; the storage key.
    pub merchant_order_id: MerchantOrderId,
    /// Derived collision-resistant hash of the intent fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    /// The event this ticket belongs to.
    pub event_id: EventId,
    /// The payout split this order settles into.
    pub split_slug: SplitSlug,

    // -- commercial --
    /// Buyer wallet, when known (signed intents always carry it;
    /// webhook notifications may not).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_address: Option<WalletAddress>,
    /// Ticket type label (e.g., "general", "backstage").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_type: Option<String>,
    /// Seat assignment, if the event is seated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seat: Option<String>,
    /// Fiat amount in TRY, as a decimal string. Never a float.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_try: Option<String>,
    /// Provider-reported payment status.
    pub payment_status: PaymentStatus,

    // -- issuance --
    /// Mint transaction hash. Set once, never overwritten.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
    /// Minted token id within the event contract.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_id: Option<TokenId>,
    /// The NFT contract address the ticket lives on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nft_address: Option<WalletAddress>,
    /// Custodial holding address, when not minted direct-to-buyer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custody_address: Option<WalletAddress>,

    // -- claim --
    /// One-way hash of the claim code. Plaintext is never stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_code_hash: Option<String>,
    /// Whether the ticket has been claimed.
    pub claim_status: ClaimStatus,
    /// Wallet the ticket was claimed to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed_to: Option<WalletAddress>,
    /// When the claim completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed_at: Option<Timestamp>,
    /// Claim-code expiry deadline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_expires_at: Option<Timestamp>,
    /// Mirror of the on-chain claim marker.
    #[serde(default)]
    pub chain_claimed: bool,
    /// Transaction hash of the on-chain claim marker call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_claim_tx_hash: Option<TxHash>,
    /// Error from the best-effort claim marker call, if it failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_claim_error: Option<String>,

    // -- check-in --
    /// When the ticket was used at the gate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_at: Option<Timestamp>,
    /// Operator or device that validated the ticket.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_by: Option<String>,
    /// When gate validation was recorded on the order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gate_validated_at: Option<Timestamp>,

    // -- lifecycle --
    /// Current lifecycle state. Advances only along the transition graph.
    pub ticket_state: TicketState,
    /// When the order record was created.
    pub created_at: Timestamp,
    /// Last mutation time; monotonically non-decreasing.
    pub updated_at: Timestamp,
}

impl Order {
    /// Create a fresh order record with only the identity fields set.
    ///
    /// Used by the store's creation paths; drafts fill in the rest via
    /// the state machine's patch merge.
    pub fn new(
        merchant_order_id: MerchantOrderId,
        event_id: EventId,
        split_slug: SplitSlug,
        payment_status: PaymentStatus,
        ticket_state: TicketState,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            merchant_order_id,
            order_id: None,
            event_id,
            split_slug,
            buyer_address: None,
            ticket_type: None,
            seat: None,
            amount_try: None,
            payment_status,
            tx_hash: None,
            token_id: None,
            nft_address: None,
            custody_address: None,
            claim_code_hash: None,
            claim_status: ClaimStatus::Unclaimed,
            claimed_to: None,
            claimed_at: None,
            claim_expires_at: None,
            chain_claimed: false,
            chain_claim_tx_hash: None,
            chain_claim_error: None,
            used_at: None,
            used_by: None,
            gate_validated_at: None,
            ticket_state,
            created_at: now,
            updated_at: now,
        }
    }

    /// Refresh `updated_at`, keeping it monotonically non-decreasing.
    ///
    /// A late write from a crashed-and-recovered holder must not move
    /// `updated_at` backwards past a newer write's stamp.
    pub fn touch(&mut self) {
        let now = Timestamp::now();
        if now > self.updated_at {
            self.updated_at = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> Order {
        Order::new(
            MerchantOrderId::new("ord-1").unwrap(),
            EventId(7),
            SplitSlug::new("main-sale").unwrap(),
            PaymentStatus::Paid,
            TicketState::Paid,
        )
    }

    #[test]
    fn rank_is_strictly_increasing_along_lifecycle() {
        let states = [
            TicketState::IntentCreated,
            TicketState::Paid,
            TicketState::Minted,
            TicketState::Claimable,
            TicketState::Claimed,
            TicketState::GateValidated,
        ];
        for pair in states.windows(2) {
            assert!(pair[0].rank() < pair[1].rank());
        }
    }

    #[test]
    fn only_gate_validated_is_terminal() {
        assert!(TicketState::GateValidated.is_terminal());
        assert!(!TicketState::Claimed.is_terminal());
        assert!(!TicketState::IntentCreated.is_terminal());
    }

    #[test]
    fn ticket_state_serde_uses_snake_case() {
        let json = serde_json::to_string(&TicketState::IntentCreated).unwrap();
        assert_eq!(json, "\"intent_created\"");
        let json = serde_json::to_string(&TicketState::GateValidated).unwrap();
        assert_eq!(json, "\"gate_validated\"");
    }

    #[test]
    fn order_wire_format_is_camel_case() {
        let o = order();
        let v = serde_json::to_value(&o).unwrap();
        assert_eq!(v["merchantOrderId"], "ord-1");
        assert_eq!(v["paymentStatus"], "paid");
        assert_eq!(v["ticketState"], "paid");
        // Unset optionals are omitted entirely.
        assert!(v.get("txHash").is_none());
        assert!(v.get("claimedTo").is_none());
    }

    #[test]
    fn order_roundtrips_through_json() {
        let mut o = order();
        o.tx_hash = Some(TxHash::parse(format!("0x{}", "ab".repeat(32))).unwrap());
        o.token_id = Some(TokenId::new("9").unwrap());
        let json = serde_json::to_string(&o).unwrap();
        let back: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(back.merchant_order_id, o.merchant_order_id);
        assert_eq!(back.tx_hash, o.tx_hash);
        assert_eq!(back.ticket_state, o.ticket_state);
    }

    #[test]
    fn touch_never_regresses() {
        let mut o = order();
        let future = Timestamp::now().plus_secs(3600);
        o.updated_at = future;
        o.touch();
        assert_eq!(o.updated_at, future);
    }
}
