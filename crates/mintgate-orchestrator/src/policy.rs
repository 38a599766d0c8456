//! # Sale Policy
//!
//! Constraints re-validated inside the purchase lock, immediately
//! before the mint call. Checking them outside the lock would let a
//! pause racing an in-flight purchase slip through.

use std::collections::HashSet;

use mintgate_core::{EventId, WalletAddress};

/// Deployment-level sale constraints and custody configuration.
#[derive(Debug, Clone, Default)]
pub struct SalePolicy {
    paused_events: HashSet<u64>,
    /// Custody wallet minted tickets are held in until claimed.
    /// `None` mints direct-to-buyer; those tickets never need a claim.
    pub custody_address: Option<WalletAddress>,
    /// How long claim codes stay valid, in seconds.
    pub claim_ttl_secs: u64,
}

/// 30 days.
const DEFAULT_CLAIM_TTL_SECS: u64 = 30 * 24 * 60 * 60;

impl SalePolicy {
    pub fn new(custody_address: Option<WalletAddress>) -> Self {
        Self {
            paused_events: HashSet::new(),
            custody_address,
            claim_ttl_secs: DEFAULT_CLAIM_TTL_SECS,
        }
    }

    pub fn with_claim_ttl_secs(mut self, secs: u64) -> Self {
        self.claim_ttl_secs = secs;
        self
    }

    /// Pause sales for an event.
    pub fn pause_event(&mut self, event: EventId) {
        self.paused_events.insert(event.0);
    }

    pub fn resume_event(&mut self, event: EventId) {
        self.paused_events.remove(&event.0);
    }

    pub fn is_paused(&self, event: EventId) -> bool {
        self.paused_events.contains(&event.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_and_resume() {
        let mut policy = SalePolicy::new(None);
        assert!(!policy.is_paused(EventId(1)));
        policy.pause_event(EventId(1));
        assert!(policy.is_paused(EventId(1)));
        assert!(!policy.is_paused(EventId(2)));
        policy.resume_event(EventId(1));
        assert!(!policy.is_paused(EventId(1)));
    }
}
