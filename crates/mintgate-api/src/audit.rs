//! # Audit Ring Buffer
//!
//! Fixed-capacity in-process record of orchestration outcomes, served
//! at `GET /v1/audit/recent` for operators. Process lifetime only:
//! initialized once at startup, never persisted, lost on restart. The
//! durable record of what happened is the order store; this buffer is
//! a live window for triage.

use std::collections::VecDeque;
use std::sync::Arc;

use mintgate_core::Timestamp;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const DEFAULT_CAPACITY: usize = 256;

/// One orchestration outcome.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// ISO 8601 UTC.
    #[schema(value_type = String)]
    pub at: Timestamp,
    /// Flow: `webhook`, `purchase`, `claim`, `checkin`.
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_order_id: Option<String>,
    /// Outcome or reason string.
    pub outcome: String,
}

/// Shared ring buffer of recent [`AuditEntry`] values.
#[derive(Clone)]
pub struct AuditLog {
    inner: Arc<Mutex<VecDeque<AuditEntry>>>,
    capacity: usize,
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl AuditLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest once full.
    pub fn record(&self, kind: &str, merchant_order_id: Option<&str>, outcome: &str) {
        let mut entries = self.inner.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(AuditEntry {
            at: Timestamp::now(),
            kind: kind.to_string(),
            merchant_order_id: merchant_order_id.map(str::to_string),
            outcome: outcome.to_string(),
        });
    }

    /// Newest-first snapshot.
    pub fn recent(&self) -> Vec<AuditEntry> {
        self.inner.lock().iter().rev().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_evicts_oldest_and_serves_newest_first() {
        let log = AuditLog::new(3);
        for i in 0..5 {
            log.record("purchase", Some(&format!("ord-{i}")), "processed");
        }
        let recent = log.recent();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].merchant_order_id.as_deref(), Some("ord-4"));
        assert_eq!(recent[2].merchant_order_id.as_deref(), Some("ord-2"));
    }
}
