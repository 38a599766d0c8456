//! # mintgate-state — Ticket Lifecycle State Machine
//!
//! Owns transition legality for the ticket lifecycle and nothing else:
//! no I/O, no clocks beyond stamping `updated_at`, no storage. The
//! store and orchestrators call in here to validate every mutation.
//!
//! ## Lifecycle
//!
//! ```text
//! intent_created ──▶ paid ──▶ minted ──▶ claimable ──▶ claimed ──▶ gate_validated
//!        │                      ▲            │            ▲
//!        └──────────────────────┘            └────────────┘
//! ```
//!
//! Every state allows a self-loop, meaning "no-op re-apply" — replayed
//! webhooks and retried client requests re-apply their transition
//! harmlessly. `gate_validated` is terminal.
//!
//! ## Idempotent upgrades
//!
//! [`apply_at_least`] moves an order to `max(current, desired)` by the
//! fixed rank order over states. A replayed "paid" webhook arriving
//! after the mint leaves the order at `minted`; it never regresses.
//!
//! ## Failure semantics
//!
//! An [`StateError::InvalidTransition`] is a consistency fault, not a
//! user error: it means a code path bypassed the locking discipline or
//! a concurrent write raced. Callers log it and surface a 500.

pub mod lifecycle;
pub mod patch;

pub use lifecycle::{
    allowed_targets, apply_at_least, apply_transition, infer_ticket_state, StateError,
};
pub use patch::OrderPatch;
