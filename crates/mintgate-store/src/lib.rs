//! # mintgate-store — Durable Order Storage
//!
//! Owns persistence and read-after-write visibility for orders, the
//! set-once anti-replay registry for gate check-in, and the TTL lock
//! manager the orchestrators serialize through. Business-rule
//! validation lives in the orchestrators; transition legality lives in
//! `mintgate-state`; this crate only moves validated records in and
//! out of a backing store.
//!
//! ## Backends
//!
//! [`OrderStore`] is a capability interface with two implementations,
//! selected by deployment environment:
//!
//! - [`MemoryOrderStore`] — process-memory maps. Development, tests,
//!   and single-instance deployments without a database. State is lost
//!   on restart.
//! - [`PgOrderStore`] — PostgreSQL via SQLx with embedded migrations.
//!   The production backend; serves reads directly from the database,
//!   which provides the required read-after-write consistency per key.
//!
//! Application code depends only on the trait.
//!
//! ## Write discipline
//!
//! Persistence is append/overwrite only — no deletes. Every mutation
//! refreshes `updated_at`. The purchase/claim paths mutate an order
//! only while holding the corresponding lock; the status-recording
//! path is create-only and needs no lock; the check-in registry uses
//! the store's native conditional write because first-writer-wins is
//! itself the desired arbitration.

pub mod error;
pub mod keys;
pub mod lock;
pub mod memory;
pub mod postgres;
pub mod traits;

pub use error::StoreError;
pub use lock::{LockLease, LockManager, MemoryLockManager, DEFAULT_LOCK_TTL};
pub use memory::MemoryOrderStore;
pub use postgres::{init_pool, PgLockManager, PgOrderStore};
pub use traits::{
    ClaimRecord, OrderStore, PaidOrderDraft, RecordPaidOutcome, StatusDraft, UsedMarker,
    UsedTicketRecord,
};
