//! # TTL Lock Manager
//!
//! Coarse mutual exclusion for the purchase and claim critical
//! sections. Locks are advisory leases with a bounded TTL so a crashed
//! holder can never wedge an order forever; a lease that outlives its
//! TTL is simply stolen by the next acquirer.
//!
//! Release is token-checked: a holder can only delete the lease it was
//! granted, so a slow worker releasing after expiry cannot drop a
//! successor's lock.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::error::StoreError;

/// Default lease TTL for orchestrator critical sections.
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(120);

/// A granted lock lease. Pass it back to [`LockManager::release`] when
/// the critical section ends.
#[derive(Debug, Clone)]
pub struct LockLease {
    key: String,
    token: Uuid,
}

impl LockLease {
    pub(crate) fn new(key: String, token: Uuid) -> Self {
        Self { key, token }
    }

    /// The key this lease holds.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The fencing token identifying this particular grant.
    pub fn token(&self) -> Uuid {
        self.token
    }
}

/// Advisory TTL locks keyed by namespace string.
#[async_trait]
pub trait LockManager: Send + Sync {
    /// Try to acquire `key` for `ttl`. Returns `None` when another
    /// unexpired lease holds it.
    async fn try_acquire(&self, key: &str, ttl: Duration)
        -> Result<Option<LockLease>, StoreError>;

    /// Release a lease. Returns `false` when the lease had already
    /// expired and been taken over, in which case nothing was deleted.
    async fn release(&self, lease: LockLease) -> Result<bool, StoreError>;
}

// ─── In-Memory Backend ───────────────────────────────────────────────

#[derive(Debug)]
struct Held {
    token: Uuid,
    expires_at: Instant,
}

/// Process-local lock table. Correct for a single instance; multiple
/// instances must use [`crate::PgLockManager`] instead.
#[derive(Debug, Default)]
pub struct MemoryLockManager {
    held: Mutex<HashMap<String, Held>>,
}

impl MemoryLockManager {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockManager for MemoryLockManager {
    async fn try_acquire(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Result<Option<LockLease>, StoreError> {
        let now = Instant::now();
        let mut held = self.held.lock();
        if let Some(existing) = held.get(key) {
            if existing.expires_at > now {
                return Ok(None);
            }
        }
        let token = Uuid::new_v4();
        held.insert(
            key.to_string(),
            Held {
                token,
                expires_at: now + ttl,
            },
        );
        Ok(Some(LockLease {
            key: key.to_string(),
            token,
        }))
    }

    async fn release(&self, lease: LockLease) -> Result<bool, StoreError> {
        let mut held = self.held.lock();
        match held.get(&lease.key) {
            Some(existing) if existing.token == lease.token => {
                held.remove(&lease.key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- acquire / contention ----

    #[tokio::test]
    async fn acquire_then_contend() {
        let locks = MemoryLockManager::new();
        let lease = locks
            .try_acquire("purchase:lock:ord-1", DEFAULT_LOCK_TTL)
            .await
            .unwrap()
            .expect("first acquire wins");
        assert!(locks
            .try_acquire("purchase:lock:ord-1", DEFAULT_LOCK_TTL)
            .await
            .unwrap()
            .is_none());
        // Unrelated keys are independent.
        assert!(locks
            .try_acquire("purchase:lock:ord-2", DEFAULT_LOCK_TTL)
            .await
            .unwrap()
            .is_some());
        assert!(locks.release(lease).await.unwrap());
        assert!(locks
            .try_acquire("purchase:lock:ord-1", DEFAULT_LOCK_TTL)
            .await
            .unwrap()
            .is_some());
    }

    // ---- expiry / takeover ----

    #[tokio::test]
    async fn expired_lease_is_stolen_and_stale_release_is_a_noop() {
        let locks = MemoryLockManager::new();
        let stale = locks
            .try_acquire("claim:lock:42", Duration::ZERO)
            .await
            .unwrap()
            .expect("acquire");
        let fresh = locks
            .try_acquire("claim:lock:42", DEFAULT_LOCK_TTL)
            .await
            .unwrap()
            .expect("expired lease can be taken over");
        assert_ne!(stale.token(), fresh.token());
        // The original holder's release must not drop the new lease.
        assert!(!locks.release(stale).await.unwrap());
        assert!(locks
            .try_acquire("claim:lock:42", DEFAULT_LOCK_TTL)
            .await
            .unwrap()
            .is_none());
        assert!(locks.release(fresh).await.unwrap());
    }
}
