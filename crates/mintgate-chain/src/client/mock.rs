//! # Mock Chain Client
//!
//! Deterministic in-process adapter. Mints are replay-safe per order
//! id, transaction hashes are derived from the request so repeated runs
//! produce identical references, and payment bindings are recorded
//! exactly as the EVM contract would.
//!
//! ## Warning
//!
//! Holds no real tokens. Suitable for development, tests and
//! deployments where on-chain custody is not in use.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use mintgate_core::{OrderId, TokenId, TxHash, WalletAddress};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use super::{ChainClient, ChainError, ChainStage, MintOutcome, MintRequest, TransferRequest};

#[derive(Debug, Clone)]
struct MintedTicket {
    tx_hash: TxHash,
    token_id: TokenId,
    binding: OrderId,
    owner: WalletAddress,
}

/// In-process chain simulation.
#[derive(Debug)]
pub struct MockChainClient {
    next_token: AtomicU64,
    contract: WalletAddress,
    /// order id hex -> minted ticket.
    minted: Mutex<HashMap<String, MintedTicket>>,
    /// token id -> minted order id hex, the reverse index reads use.
    tokens: Mutex<HashMap<String, String>>,
}

impl Default for MockChainClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChainClient {
    pub fn new() -> Self {
        Self {
            next_token: AtomicU64::new(1),
            // Fixed placeholder contract for the simulated chain.
            contract: WalletAddress::parse(&format!("0x{}", "fe".repeat(20)))
                .expect("constant address is valid"),
            minted: Mutex::new(HashMap::new()),
            tokens: Mutex::new(HashMap::new()),
        }
    }

    // 32 digest bytes always yield 64 hex chars, so parse succeeds.
    fn derive_tx(prefix: &str, seed: &str) -> Result<TxHash, ChainError> {
        let digest = Sha256::digest(format!("{prefix}|{seed}").as_bytes());
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        TxHash::parse(&format!("0x{hex}")).map_err(|e| ChainError::Config(e.to_string()))
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn mint_ticket(&self, request: MintRequest) -> Result<MintOutcome, ChainError> {
        let mut minted = self.minted.lock();
        if let Some(existing) = minted.get(request.order_id.as_str()) {
            return Ok(MintOutcome {
                tx_hash: existing.tx_hash.clone(),
                token_id: existing.token_id.clone(),
                already_used: true,
            });
        }
        let token_number = self.next_token.fetch_add(1, Ordering::SeqCst);
        let token_id = TokenId::new(token_number.to_string())
            .map_err(|e| ChainError::Config(e.to_string()))?;
        let ticket = MintedTicket {
            tx_hash: Self::derive_tx("mint", request.order_id.as_str())?,
            token_id: token_id.clone(),
            binding: request.order_id.clone(),
            owner: request.recipient.clone(),
        };
        self.tokens
            .lock()
            .insert(token_id.to_string(), request.order_id.as_str().to_string());
        let outcome = MintOutcome {
            tx_hash: ticket.tx_hash.clone(),
            token_id,
            already_used: false,
        };
        minted.insert(request.order_id.as_str().to_string(), ticket);
        Ok(outcome)
    }

    async fn transfer_ticket(&self, request: TransferRequest) -> Result<TxHash, ChainError> {
        let order_key = self
            .tokens
            .lock()
            .get(request.token_id.as_str())
            .cloned()
            .ok_or_else(|| ChainError::CallFailed {
                stage: ChainStage::Simulate,
                reason: format!("unknown token {}", request.token_id),
            })?;
        let mut minted = self.minted.lock();
        let Some(ticket) = minted.get_mut(&order_key) else {
            return Err(ChainError::CallFailed {
                stage: ChainStage::Simulate,
                reason: format!("unknown token {}", request.token_id),
            });
        };
        if ticket.owner != request.from {
            return Err(ChainError::CallFailed {
                stage: ChainStage::Simulate,
                reason: format!("{} does not hold token {}", request.from, request.token_id),
            });
        }
        ticket.owner = request.to.clone();
        Self::derive_tx("transfer", &format!("{}|{}", request.token_id, request.to))
    }

    async fn mark_claimed(&self, token: &TokenId) -> Result<TxHash, ChainError> {
        if !self.tokens.lock().contains_key(token.as_str()) {
            return Err(ChainError::CallFailed {
                stage: ChainStage::Send,
                reason: format!("unknown token {token}"),
            });
        }
        Self::derive_tx("claim", token.as_str())
    }

    async fn payment_binding(&self, token: &TokenId) -> Result<Option<OrderId>, ChainError> {
        let order_key = match self.tokens.lock().get(token.as_str()) {
            Some(key) => key.clone(),
            None => return Ok(None),
        };
        Ok(self
            .minted
            .lock()
            .get(&order_key)
            .map(|ticket| ticket.binding.clone()))
    }

    fn contract_address(&self) -> &WalletAddress {
        &self.contract
    }

    fn chain_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mintgate_core::{EventId, MerchantOrderId};

    fn request(order: &str, recipient: &WalletAddress) -> MintRequest {
        MintRequest {
            merchant_order_id: MerchantOrderId::new(order).unwrap(),
            event_id: EventId(1),
            order_id: OrderId::derive(&[order, "1"]),
            recipient: recipient.clone(),
        }
    }

    fn wallet(fill: &str) -> WalletAddress {
        WalletAddress::parse(&format!("0x{}", fill.repeat(20))).unwrap()
    }

    #[tokio::test]
    async fn mint_is_replay_safe() {
        let chain = MockChainClient::new();
        let custody = wallet("aa");
        let first = chain.mint_ticket(request("ord-1", &custody)).await.unwrap();
        assert!(!first.already_used);
        let replay = chain.mint_ticket(request("ord-1", &custody)).await.unwrap();
        assert!(replay.already_used);
        assert_eq!(replay.tx_hash, first.tx_hash);
        assert_eq!(replay.token_id, first.token_id);
        // A different order gets a fresh token.
        let second = chain.mint_ticket(request("ord-2", &custody)).await.unwrap();
        assert_ne!(second.token_id, first.token_id);
    }

    #[tokio::test]
    async fn binding_matches_the_minting_order() {
        let chain = MockChainClient::new();
        let custody = wallet("aa");
        let req = request("ord-3", &custody);
        let expected = req.order_id.clone();
        let outcome = chain.mint_ticket(req).await.unwrap();
        let binding = chain.payment_binding(&outcome.token_id).await.unwrap();
        assert_eq!(binding, Some(expected));
        let unknown = TokenId::new("9999").unwrap();
        assert_eq!(chain.payment_binding(&unknown).await.unwrap(), None);
    }

    #[tokio::test]
    async fn transfer_moves_custody() {
        let chain = MockChainClient::new();
        let custody = wallet("aa");
        let buyer = wallet("bb");
        let outcome = chain.mint_ticket(request("ord-4", &custody)).await.unwrap();
        chain
            .transfer_ticket(TransferRequest {
                token_id: outcome.token_id.clone(),
                from: custody.clone(),
                to: buyer.clone(),
            })
            .await
            .unwrap();
        // Custody no longer holds the token.
        let err = chain
            .transfer_ticket(TransferRequest {
                token_id: outcome.token_id,
                from: custody,
                to: buyer,
            })
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Some(ChainStage::Simulate));
    }
}
