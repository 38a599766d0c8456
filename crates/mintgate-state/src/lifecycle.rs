//! # Lifecycle Transitions
//!
//! The allowed-transition table and the three operations every mutation
//! in the system flows through: exact transitions, rank-based
//! idempotent upgrades, and legacy-state inference on reads.

use mintgate_core::{ClaimStatus, Order, PaymentStatus, TicketState};
use thiserror::Error;

use crate::patch::OrderPatch;

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors from lifecycle transitions.
///
/// An invalid transition indicates a logic bug or a concurrent write
/// that bypassed locking — callers must log it and surface a server
/// fault, never swallow it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Attempted transition is not in the allowed set for the current state.
    #[error("invalid ticket transition: {from} -> {to}")]
    InvalidTransition {
        /// Current state.
        from: TicketState,
        /// Attempted target state.
        to: TicketState,
    },
}

// ─── Transition Table ────────────────────────────────────────────────

/// Allowed direct transitions from `from`, self-loop included.
///
/// The self-loop means "no-op re-apply": a replayed event may re-enter
/// the current state and merge its patch without advancing.
pub fn allowed_targets(from: TicketState) -> &'static [TicketState] {
    use TicketState::*;
    match from {
        IntentCreated => &[IntentCreated, Paid, Minted],
        Paid => &[Paid, Minted, Claimable],
        Minted => &[Minted, Claimable, Claimed],
        Claimable => &[Claimable, Claimed],
        Claimed => &[Claimed, GateValidated],
        GateValidated => &[GateValidated],
    }
}

fn edge_exists(from: TicketState, to: TicketState) -> bool {
    allowed_targets(from).contains(&to)
}

/// The state one rank above `s`, if any.
fn next_rank(s: TicketState) -> Option<TicketState> {
    use TicketState::*;
    match s {
        IntentCreated => Some(Paid),
        Paid => Some(Minted),
        Minted => Some(Claimable),
        Claimable => Some(Claimed),
        Claimed => Some(GateValidated),
        GateValidated => None,
    }
}

// ─── Operations ──────────────────────────────────────────────────────

/// Apply an exact transition to `to`, merging `patch`.
///
/// Returns a new record with `ticket_state = to`, the patch fields
/// merged, and `updated_at` refreshed (monotonically non-decreasing).
///
/// # Errors
///
/// [`StateError::InvalidTransition`] when the direct edge
/// `current → to` is not in the allowed-transition table.
pub fn apply_transition(
    order: &Order,
    to: TicketState,
    patch: &OrderPatch,
) -> Result<Order, StateError> {
    if !edge_exists(order.ticket_state, to) {
        return Err(StateError::InvalidTransition {
            from: order.ticket_state,
            to,
        });
    }
    let mut next = order.clone();
    patch.merge_into(&mut next);
    next.ticket_state = to;
    next.touch();
    Ok(next)
}

/// Idempotent upgrade: move the order to `max(current, desired)` by rank.
///
/// - Equal target: the patch is merged without a state change — safe
///   for replayed events.
/// - Upward target: the machine advances along the rank chain, taking
///   the direct edge when the table has one and stepping through
///   intermediate states otherwise. Every rank-adjacent edge exists in
///   the table, so a pure upgrade can never fail with an invalid
///   transition; the reachability check stays in [`apply_transition`]
///   as the single enforcement point.
pub fn apply_at_least(
    order: &Order,
    desired: TicketState,
    patch: &OrderPatch,
) -> Result<Order, StateError> {
    let target = if desired.rank() > order.ticket_state.rank() {
        desired
    } else {
        order.ticket_state
    };

    if target == order.ticket_state {
        // No state change; merge the patch only.
        let mut next = order.clone();
        patch.merge_into(&mut next);
        next.touch();
        return Ok(next);
    }

    if edge_exists(order.ticket_state, target) {
        return apply_transition(order, target, patch);
    }

    // No direct edge: advance stepwise. The patch is merged once, on
    // the first hop, so intermediate states never observe a half-set
    // record without the patched fields.
    let mut current = apply_transition(
        order,
        next_rank(order.ticket_state).ok_or(StateError::InvalidTransition {
            from: order.ticket_state,
            to: target,
        })?,
        patch,
    )?;
    while current.ticket_state != target {
        let step = next_rank(current.ticket_state).ok_or(StateError::InvalidTransition {
            from: current.ticket_state,
            to: target,
        })?;
        current = apply_transition(&current, step, &OrderPatch::default())?;
    }
    Ok(current)
}

/// Back-fill `ticket_state` from legacy signal fields.
///
/// Records written before the explicit state field existed carry their
/// lifecycle position implicitly in `used_at`, `claim_status`,
/// `chain_claimed`, `token_id`, `tx_hash`, and `payment_status`. This
/// is a pure reconciliation applied on every read; it never mutates
/// stored data and never regresses below the explicitly stored state.
pub fn infer_ticket_state(order: &Order) -> TicketState {
    let inferred = if order.used_at.is_some() || order.gate_validated_at.is_some() {
        TicketState::GateValidated
    } else if order.chain_claimed || order.claim_status == ClaimStatus::Claimed {
        TicketState::Claimed
    } else if order.token_id.is_some() || order.tx_hash.is_some() {
        TicketState::Minted
    } else if order.payment_status == PaymentStatus::Paid {
        TicketState::Paid
    } else {
        TicketState::IntentCreated
    };

    if inferred.rank() > order.ticket_state.rank() {
        inferred
    } else {
        order.ticket_state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mintgate_core::{EventId, MerchantOrderId, SplitSlug, Timestamp, TokenId, TxHash};
    use proptest::prelude::*;

    const ALL_STATES: [TicketState; 6] = [
        TicketState::IntentCreated,
        TicketState::Paid,
        TicketState::Minted,
        TicketState::Claimable,
        TicketState::Claimed,
        TicketState::GateValidated,
    ];

    fn order_in(state: TicketState) -> Order {
        // Pending payment so inference never bumps low states in tests.
        Order::new(
            MerchantOrderId::new("ord-1").unwrap(),
            EventId(7),
            SplitSlug::new("main-sale").unwrap(),
            PaymentStatus::Pending,
            state,
        )
    }

    fn tx(n: &str) -> TxHash {
        TxHash::parse(format!("0x{}", n.repeat(32))).unwrap()
    }

    // ---- exact transitions ----

    #[test]
    fn intent_to_claimed_always_fails() {
        let o = order_in(TicketState::IntentCreated);
        let err = apply_transition(&o, TicketState::Claimed, &OrderPatch::default()).unwrap_err();
        assert_eq!(
            err,
            StateError::InvalidTransition {
                from: TicketState::IntentCreated,
                to: TicketState::Claimed,
            }
        );
    }

    #[test]
    fn gate_validated_is_terminal() {
        let o = order_in(TicketState::GateValidated);
        for to in ALL_STATES {
            let result = apply_transition(&o, to, &OrderPatch::default());
            if to == TicketState::GateValidated {
                assert!(result.is_ok(), "self-loop must remain legal");
            } else {
                assert!(result.is_err(), "gate_validated -> {to} must fail");
            }
        }
    }

    #[test]
    fn self_loop_merges_patch_without_advancing() {
        let o = order_in(TicketState::Paid);
        let patch = OrderPatch {
            seat: Some("A-12".to_string()),
            ..OrderPatch::default()
        };
        let next = apply_transition(&o, TicketState::Paid, &patch).unwrap();
        assert_eq!(next.ticket_state, TicketState::Paid);
        assert_eq!(next.seat.as_deref(), Some("A-12"));
    }

    #[test]
    fn transition_refreshes_updated_at_monotonically() {
        let mut o = order_in(TicketState::Paid);
        let future = Timestamp::now().plus_secs(3600);
        o.updated_at = future;
        let next = apply_transition(&o, TicketState::Minted, &OrderPatch::default()).unwrap();
        // A late writer cannot move updated_at backwards.
        assert!(next.updated_at >= future);
    }

    #[test]
    fn transition_does_not_mutate_input() {
        let o = order_in(TicketState::Paid);
        let _ = apply_transition(&o, TicketState::Minted, &OrderPatch::default()).unwrap();
        assert_eq!(o.ticket_state, TicketState::Paid);
    }

    // ---- at-least upgrades ----

    #[test]
    fn at_least_never_regresses() {
        let o = order_in(TicketState::Minted);
        let next = apply_at_least(&o, TicketState::Paid, &OrderPatch::default()).unwrap();
        assert_eq!(next.ticket_state, TicketState::Minted);
    }

    #[test]
    fn at_least_equal_state_merges_patch() {
        let o = order_in(TicketState::Minted);
        let patch = OrderPatch {
            token_id: Some(TokenId::new("42").unwrap()),
            ..OrderPatch::default()
        };
        let next = apply_at_least(&o, TicketState::Minted, &patch).unwrap();
        assert_eq!(next.ticket_state, TicketState::Minted);
        assert_eq!(next.token_id.as_ref().unwrap().as_str(), "42");
    }

    #[test]
    fn at_least_takes_direct_edge_when_present() {
        let o = order_in(TicketState::IntentCreated);
        let next = apply_at_least(&o, TicketState::Minted, &OrderPatch::default()).unwrap();
        assert_eq!(next.ticket_state, TicketState::Minted);
    }

    #[test]
    fn at_least_steps_through_missing_direct_edges() {
        // intent_created -> claimed has no direct edge; the upgrade
        // walks intent_created -> paid -> minted -> claimable -> claimed.
        let o = order_in(TicketState::IntentCreated);
        let patch = OrderPatch {
            claim_status: Some(ClaimStatus::Claimed),
            ..OrderPatch::default()
        };
        let next = apply_at_least(&o, TicketState::Claimed, &patch).unwrap();
        assert_eq!(next.ticket_state, TicketState::Claimed);
        assert_eq!(next.claim_status, ClaimStatus::Claimed);
    }

    proptest! {
        #[test]
        fn at_least_is_monotone(from in 0usize..6, desired in 0usize..6) {
            let o = order_in(ALL_STATES[from]);
            let next = apply_at_least(&o, ALL_STATES[desired], &OrderPatch::default()).unwrap();
            prop_assert!(next.ticket_state.rank() >= o.ticket_state.rank());
            prop_assert!(next.ticket_state.rank() >= ALL_STATES[desired].rank()
                || next.ticket_state == o.ticket_state);
        }

        #[test]
        fn at_least_is_idempotent(from in 0usize..6, desired in 0usize..6) {
            let o = order_in(ALL_STATES[from]);
            let once = apply_at_least(&o, ALL_STATES[desired], &OrderPatch::default()).unwrap();
            let twice = apply_at_least(&once, ALL_STATES[desired], &OrderPatch::default()).unwrap();
            prop_assert_eq!(once.ticket_state, twice.ticket_state);
        }
    }

    // ---- inference ----

    #[test]
    fn infer_from_legacy_signals() {
        let mut o = order_in(TicketState::IntentCreated);
        assert_eq!(infer_ticket_state(&o), TicketState::IntentCreated);

        o.payment_status = PaymentStatus::Paid;
        assert_eq!(infer_ticket_state(&o), TicketState::Paid);

        o.tx_hash = Some(tx("ab"));
        assert_eq!(infer_ticket_state(&o), TicketState::Minted);

        o.token_id = Some(TokenId::new("9").unwrap());
        assert_eq!(infer_ticket_state(&o), TicketState::Minted);

        o.claim_status = ClaimStatus::Claimed;
        assert_eq!(infer_ticket_state(&o), TicketState::Claimed);

        o.used_at = Some(Timestamp::now());
        assert_eq!(infer_ticket_state(&o), TicketState::GateValidated);
    }

    #[test]
    fn infer_respects_chain_claimed_mirror() {
        let mut o = order_in(TicketState::IntentCreated);
        o.chain_claimed = true;
        assert_eq!(infer_ticket_state(&o), TicketState::Claimed);
    }

    #[test]
    fn infer_never_regresses_explicit_state() {
        // Explicit claimable, but legacy signals only say "minted".
        let mut o = order_in(TicketState::Claimable);
        o.token_id = Some(TokenId::new("9").unwrap());
        assert_eq!(infer_ticket_state(&o), TicketState::Claimable);
    }

    #[test]
    fn infer_does_not_mutate() {
        let mut o = order_in(TicketState::IntentCreated);
        o.tx_hash = Some(tx("ab"));
        let _ = infer_ticket_state(&o);
        assert_eq!(o.ticket_state, TicketState::IntentCreated);
    }
}
