//! # Store Errors

use mintgate_core::MerchantOrderId;
use mintgate_state::StateError;
use thiserror::Error;

/// Errors from order storage operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The operation requires an existing order and none was found.
    #[error("order not found: {0}")]
    OrderNotFound(MerchantOrderId),

    /// A claim write conflicts with an earlier claim to a different wallet.
    #[error("order {merchant_order_id} already claimed to {claimed_to}")]
    ClaimConflict {
        /// The order in conflict.
        merchant_order_id: MerchantOrderId,
        /// The wallet that already holds the claim.
        claimed_to: String,
    },

    /// A lifecycle transition was rejected.
    ///
    /// Reaching this through the store means a code path bypassed the
    /// locking discipline — treated as a consistency fault upstream.
    #[error(transparent)]
    State(#[from] StateError),

    /// The database backend failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored record could not be decoded.
    #[error("corrupt stored record: {0}")]
    Corrupt(#[from] serde_json::Error),
}
