//! # Chain Client Trait
//!
//! Mint, transfer and claim-marker calls against the ticket contract,
//! plus the payment-binding read the claim path uses to cross-check
//! custody records before moving a token.

use async_trait::async_trait;
use mintgate_core::{EventId, MerchantOrderId, OrderId, TokenId, TxHash, WalletAddress};
use thiserror::Error;

mod evm;
mod mock;

pub use evm::{EvmChainClient, EvmChainConfig};
pub use mock::MockChainClient;

/// Which phase of a chain call failed. Operators triage `Simulate` and
/// `Send` as "never submitted" (safe to retry) versus `Receipt` as
/// "submitted, outcome unknown" (manual reconciliation — a blind retry
/// could double-mint).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainStage {
    Simulate,
    Send,
    Receipt,
}

impl ChainStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simulate => "simulate",
            Self::Send => "send",
            Self::Receipt => "receipt",
        }
    }
}

impl std::fmt::Display for ChainStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from chain operations.
#[derive(Error, Debug)]
pub enum ChainError {
    /// The RPC endpoint could not be reached or answered garbage.
    #[error("chain unavailable: {0}")]
    Unavailable(String),

    /// A call failed at a known stage.
    #[error("chain call failed at {stage}: {reason}")]
    CallFailed {
        stage: ChainStage,
        reason: String,
    },

    /// The adapter was constructed with invalid configuration.
    #[error("invalid chain configuration: {0}")]
    Config(String),
}

impl ChainError {
    /// The stage marker for call failures, `None` otherwise.
    pub fn stage(&self) -> Option<ChainStage> {
        match self {
            Self::CallFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// A mint request for one paid order.
#[derive(Debug, Clone)]
pub struct MintRequest {
    pub merchant_order_id: MerchantOrderId,
    pub event_id: EventId,
    /// Derived order hash, recorded on chain as the payment binding.
    pub order_id: OrderId,
    /// Receiving wallet: the buyer directly, or a custody address.
    pub recipient: WalletAddress,
}

/// Result of a mint call.
#[derive(Debug, Clone)]
pub struct MintOutcome {
    pub tx_hash: TxHash,
    pub token_id: TokenId,
    /// The contract independently detected this order was already
    /// minted. The caller must treat the whole purchase as a duplicate.
    pub already_used: bool,
}

/// A custody-to-buyer transfer request for the claim path.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub token_id: TokenId,
    pub from: WalletAddress,
    pub to: WalletAddress,
}

/// Ticket-contract operations.
///
/// Sealed — only implementations within this crate are permitted.
#[async_trait]
pub trait ChainClient: private::Sealed + Send + Sync {
    /// Mint a ticket for a paid order. Must be safe to call twice with
    /// the same `order_id`: the second call reports `already_used`
    /// rather than minting again.
    async fn mint_ticket(&self, request: MintRequest) -> Result<MintOutcome, ChainError>;

    /// Transfer a custody-held ticket to the buyer's wallet.
    async fn transfer_ticket(&self, request: TransferRequest) -> Result<TxHash, ChainError>;

    /// Record the claim marker on chain. Best-effort from the claim
    /// path's perspective: a failure here never aborts the transfer.
    async fn mark_claimed(&self, token: &TokenId) -> Result<TxHash, ChainError>;

    /// Read the payment binding recorded at mint time for a token.
    async fn payment_binding(&self, token: &TokenId) -> Result<Option<OrderId>, ChainError>;

    /// The ticket contract address, recorded on orders as
    /// `nft_address` at mint time.
    fn contract_address(&self) -> &WalletAddress;

    /// Human-readable chain name for logs and diagnostics.
    fn chain_name(&self) -> &str;
}

mod private {
    pub trait Sealed {}
    impl Sealed for super::MockChainClient {}
    impl Sealed for super::EvmChainClient {}
}
