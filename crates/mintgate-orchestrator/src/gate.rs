//! # Gate Check-In
//!
//! Marks a ticket as used at the point of entry. Arbitration is the
//! store's set-once registry, not the distributed lock: first writer
//! wins is exactly the semantics a gate needs, and replays must get a
//! cheap, lock-free answer carrying the original check-in time.

use std::sync::Arc;

use mintgate_core::{EventId, Timestamp, TokenId};
use mintgate_store::{OrderStore, StoreError};
use thiserror::Error;

/// Check-in failures.
#[derive(Error, Debug)]
pub enum GateError {
    /// No order is recorded for this token.
    #[error("no order found for token {0}")]
    UnknownTicket(TokenId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of one check-in attempt.
#[derive(Debug, Clone)]
pub enum CheckinOutcome {
    /// First entry for this `(event, token)`. The holder is admitted.
    Admitted { used_at: Timestamp },
    /// The ticket was already used; `used_at` is the original entry.
    AlreadyUsed { used_at: Timestamp },
}

/// Orchestrates gate validation against the order store.
pub struct GateOrchestrator {
    store: Arc<dyn OrderStore>,
}

impl GateOrchestrator {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }

    /// Validate a ticket at the gate. `operator` identifies the gate
    /// or staff device, stamped onto the order as `used_by`.
    pub async fn check_in(
        &self,
        event: EventId,
        token: &TokenId,
        operator: &str,
    ) -> Result<CheckinOutcome, GateError> {
        let order = self
            .store
            .get_by_token_id(token)
            .await?
            .ok_or_else(|| GateError::UnknownTicket(token.clone()))?;

        let marker = self
            .store
            .mark_token_used_once(event, token, order.claimed_to.as_ref())
            .await?;
        if marker.already_used {
            tracing::info!(
                %token,
                event = %event,
                used_at = %marker.used_at,
                "check-in replay"
            );
            return Ok(CheckinOutcome::AlreadyUsed {
                used_at: marker.used_at,
            });
        }

        // Winning the registry write also upgrades the order record.
        self.store
            .mark_gate_validated(&order.merchant_order_id, operator)
            .await?;
        tracing::info!(
            %token,
            event = %event,
            merchant_order_id = %order.merchant_order_id,
            operator,
            "ticket admitted"
        );
        Ok(CheckinOutcome::Admitted {
            used_at: marker.used_at,
        })
    }
}
