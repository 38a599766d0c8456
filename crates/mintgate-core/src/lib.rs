//! # mintgate-core — Foundational Types for mintgate
//!
//! The leaf crate of the mintgate workspace. Defines the type-system
//! primitives every other crate builds on; it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** `MerchantOrderId`,
//!    `TokenId`, `EventId`, `WalletAddress`, `TxHash` — all newtypes with
//!    validated constructors. No bare strings for identifiers, so a token
//!    id can never be passed where a merchant order id is expected.
//!
//! 2. **UTC-only timestamps.** The `Timestamp` type enforces UTC with Z
//!    suffix and seconds precision. Order records are compared and
//!    replayed across processes; local offsets would make `updated_at`
//!    monotonicity meaningless.
//!
//! 3. **One `Order` record per logical purchase.** Keyed by the caller's
//!    idempotency key. Money amounts are strings, never floats.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `mintgate-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - All public types derive `Debug`, `Clone`, and implement
//!   `Serialize`/`Deserialize`.

pub mod error;
pub mod identity;
pub mod order;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use error::ValidationError;
pub use identity::{
    EventId, MerchantOrderId, OrderId, SplitSlug, TokenId, TxHash, WalletAddress,
};
pub use order::{ClaimStatus, Order, PaymentStatus, TicketState};
pub use temporal::Timestamp;
