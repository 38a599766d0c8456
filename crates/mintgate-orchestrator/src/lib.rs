//! # mintgate-orchestrator — Issuance Orchestration
//!
//! The decision layer between inbound events and the store/chain
//! edges. Three orchestrations live here:
//!
//! - **Purchase** — a verified buyer intent or payment notification
//!   becomes exactly one mint per idempotency key.
//! - **Claim** — a custody-held ticket moves to the buyer's wallet,
//!   gated by a secret code, exactly once.
//! - **Gate check-in** — a ticket admits exactly one entry per event,
//!   arbitrated by the store's set-once registry.
//!
//! ## Concurrency Model
//!
//! Every invocation is independent and stateless; coordination happens
//! only through the shared store. Purchase and claim serialize their
//! critical sections behind TTL locks, and lock contention is not a
//! fault: it surfaces as a retryable `Pending` outcome. Locks are
//! released on every exit path, success or failure, by capturing the
//! critical section's result before the release runs.

pub mod claim;
pub mod code;
pub mod gate;
pub mod intent;
pub mod policy;
pub mod purchase;

pub use claim::{ClaimOrchestrator, ClaimOutcome, ClaimReject, ClaimRequest};
pub use code::{generate_claim_code, hash_claim_code, verify_claim_code};
pub use gate::{CheckinOutcome, GateError, GateOrchestrator};
pub use intent::{IntentError, PurchaseIntent, SignedIntent};
pub use policy::SalePolicy;
pub use purchase::{
    PaidNotification, PurchaseError, PurchaseOrchestrator, PurchaseOutcome,
};
