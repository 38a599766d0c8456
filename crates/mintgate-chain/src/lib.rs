//! # mintgate-chain — Chain Adapters
//!
//! The external mint/transfer surface. Orchestrators depend on the
//! [`ChainClient`] trait only; which implementation backs it is a
//! deployment decision.
//!
//! ## Design Decision: The Chain Is Replaceable
//!
//! Every idempotency guarantee in this system lives in the order store
//! and the lock manager, not on chain. The chain adapter is therefore a
//! thin, replaceable edge: the mock adapter is a fully valid backend
//! for development and single-venue deployments that do not need
//! on-chain custody, and the EVM adapter slots in without touching
//! orchestration code.
//!
//! ## Architecture
//!
//! The trait is **sealed** — only implementations in this crate are
//! permitted, so unaudited adapters cannot be injected under the
//! orchestrators' replay assumptions (the `already_used` signal in
//! particular must be trustworthy).

pub mod client;

pub use client::{
    ChainClient, ChainError, ChainStage, EvmChainClient, EvmChainConfig, MintOutcome,
    MintRequest, MockChainClient, TransferRequest,
};
