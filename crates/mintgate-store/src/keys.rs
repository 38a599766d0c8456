//! # Key Namespaces
//!
//! Canonical key builders for the lock and anti-replay namespaces.
//! Every component that touches these keys goes through this module so
//! the namespace never drifts between backends.

use mintgate_core::{EventId, MerchantOrderId, TokenId};

/// Mutual-exclusion key for the purchase path of one order.
pub fn purchase_lock_key(id: &MerchantOrderId) -> String {
    format!("purchase:lock:{id}")
}

/// Mutual-exclusion key for the claim path.
///
/// Keyed by token when one exists (two orders can never share a token)
/// and by merchant order id before mint.
pub fn claim_lock_key(token: Option<&TokenId>, id: &MerchantOrderId) -> String {
    match token {
        Some(token) => format!("claim:lock:{token}"),
        None => format!("claim:lock:{id}"),
    }
}

/// Event-scoped anti-replay key for gate check-in.
///
/// Scoped per event so token numbering reuse across independently
/// deployed contracts cannot collide.
pub fn used_ticket_key(event: EventId, token: &TokenId) -> String {
    format!("used:event:{event}:token:{token}")
}

/// Legacy global anti-replay key, consulted for records written before
/// event scoping and mirrored forward on read.
pub fn legacy_used_ticket_key(token: &TokenId) -> String {
    format!("used:token:{token}")
}
