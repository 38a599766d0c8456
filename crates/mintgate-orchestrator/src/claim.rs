//! # Claim Orchestration
//!
//! Moves a custody-held ticket to the buyer's wallet, gated by the
//! claim code. Preconditions run in a fixed order so every rejection
//! carries one distinct reason, and the earliest applicable reason
//! wins; only after all of them pass does the orchestrator take the
//! claim lock and touch the chain.
//!
//! A repeat claim from the wallet that already holds the ticket is an
//! idempotent success, and a concurrent claim for the same token gets
//! `Pending`, not an error.

use std::sync::Arc;

use mintgate_chain::{ChainClient, ChainError, TransferRequest};
use mintgate_core::{MerchantOrderId, Order, PaymentStatus, Timestamp, TxHash, WalletAddress};
use mintgate_store::{
    keys::claim_lock_key, ClaimRecord, LockManager, OrderStore, StoreError, DEFAULT_LOCK_TTL,
};
use thiserror::Error;

use crate::code::verify_claim_code;

/// Claim rejections and failures, each carrying the reason code the
/// API maps to a status.
#[derive(Error, Debug)]
pub enum ClaimReject {
    #[error("order not found")]
    OrderNotFound,

    #[error("order is not paid")]
    OrderNotPaid,

    /// Already claimed by a different wallet.
    #[error("ticket belongs to another wallet")]
    NotOwner,

    #[error("claim code expired")]
    Expired,

    /// Mint has not completed; the ticket cannot be transferred yet.
    #[error("ticket is not ready to claim")]
    NotReady,

    #[error("invalid claim code")]
    InvalidCode,

    /// The on-chain payment binding does not match the order record.
    /// Indicates a custody or record mismatch; never proceed.
    #[error("claim failed: {0}")]
    Failed(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// One claim request.
#[derive(Debug, Clone)]
pub struct ClaimRequest {
    pub merchant_order_id: MerchantOrderId,
    pub code: String,
    pub destination: WalletAddress,
}

/// Outcome of a claim call.
#[derive(Debug, Clone)]
pub enum ClaimOutcome {
    /// The ticket was transferred in this call.
    Claimed {
        tx_hash: TxHash,
        /// Set when the best-effort on-chain claim marker failed; the
        /// transfer itself succeeded.
        chain_claim_error: Option<String>,
    },
    /// The same wallet already claimed this ticket. No side effects.
    AlreadyClaimed,
    /// The ticket was minted direct-to-buyer; there is nothing to
    /// claim.
    NotRequired,
    /// Another claim attempt holds the lock. Retry later.
    Pending,
}

/// Orchestrates custody-to-buyer transfers.
pub struct ClaimOrchestrator {
    store: Arc<dyn OrderStore>,
    locks: Arc<dyn LockManager>,
    chain: Arc<dyn ChainClient>,
}

impl ClaimOrchestrator {
    pub fn new(
        store: Arc<dyn OrderStore>,
        locks: Arc<dyn LockManager>,
        chain: Arc<dyn ChainClient>,
    ) -> Self {
        Self {
            store,
            locks,
            chain,
        }
    }

    pub async fn claim(&self, request: ClaimRequest) -> Result<ClaimOutcome, ClaimReject> {
        let order = self
            .store
            .get_by_merchant_id(&request.merchant_order_id)
            .await?
            .ok_or(ClaimReject::OrderNotFound)?;

        if order.payment_status != PaymentStatus::Paid {
            return Err(ClaimReject::OrderNotPaid);
        }
        if let Some(claimed_to) = &order.claimed_to {
            if claimed_to != &request.destination {
                return Err(ClaimReject::NotOwner);
            }
            return Ok(ClaimOutcome::AlreadyClaimed);
        }
        let (Some(_custody), Some(code_hash)) = (&order.custody_address, &order.claim_code_hash)
        else {
            // Minted direct-to-buyer; the wallet already holds it.
            return Ok(ClaimOutcome::NotRequired);
        };
        if let Some(expires_at) = order.claim_expires_at {
            if expires_at < Timestamp::now() {
                return Err(ClaimReject::Expired);
            }
        }
        if order.token_id.is_none() || order.nft_address.is_none() {
            return Err(ClaimReject::NotReady);
        }
        if !verify_claim_code(&request.code, code_hash) {
            return Err(ClaimReject::InvalidCode);
        }

        let key = claim_lock_key(order.token_id.as_ref(), &order.merchant_order_id);
        let Some(lease) = self.locks.try_acquire(&key, DEFAULT_LOCK_TTL).await? else {
            tracing::debug!(merchant_order_id = %request.merchant_order_id, "claim lock contended");
            return Ok(ClaimOutcome::Pending);
        };

        let result = self.transfer_and_record(&order, &request).await;
        if let Err(e) = self.locks.release(lease).await {
            tracing::warn!(
                merchant_order_id = %request.merchant_order_id,
                error = %e,
                "claim lock release failed"
            );
        }
        result
    }

    async fn transfer_and_record(
        &self,
        order: &Order,
        request: &ClaimRequest,
    ) -> Result<ClaimOutcome, ClaimReject> {
        // Preconditions guaranteed these are present.
        let (Some(token_id), Some(custody)) = (&order.token_id, &order.custody_address) else {
            return Err(ClaimReject::NotReady);
        };

        // Cross-check the on-chain payment binding against the order
        // record before moving anything.
        if let Some(expected) = &order.order_id {
            match self.chain.payment_binding(token_id).await? {
                Some(found) if &found == expected => {}
                Some(found) => {
                    tracing::error!(
                        merchant_order_id = %order.merchant_order_id,
                        token_id = %token_id,
                        expected = %expected,
                        found = %found,
                        "payment binding mismatch"
                    );
                    return Err(ClaimReject::Failed("payment binding mismatch".to_string()));
                }
                None => {
                    return Err(ClaimReject::Failed(
                        "no payment binding recorded on chain".to_string(),
                    ));
                }
            }
        }

        let tx_hash = self
            .chain
            .transfer_ticket(TransferRequest {
                token_id: token_id.clone(),
                from: custody.clone(),
                to: request.destination.clone(),
            })
            .await?;

        // The claim marker is best-effort. The transfer decides
        // ownership; a marker failure is recorded and reported only.
        let (chain_claimed, chain_claim_tx_hash, chain_claim_error) =
            match self.chain.mark_claimed(token_id).await {
                Ok(marker_tx) => (true, Some(marker_tx), None),
                Err(e) => {
                    tracing::warn!(
                        merchant_order_id = %order.merchant_order_id,
                        error = %e,
                        "on-chain claim marker failed"
                    );
                    (false, None, Some(e.to_string()))
                }
            };

        self.store
            .mark_order_claimed(ClaimRecord {
                merchant_order_id: order.merchant_order_id.clone(),
                claimed_to: request.destination.clone(),
                claimed_at: Timestamp::now(),
                chain_claimed,
                chain_claim_tx_hash,
                chain_claim_error: chain_claim_error.clone(),
            })
            .await?;

        tracing::info!(
            merchant_order_id = %order.merchant_order_id,
            token_id = %token_id,
            claimed_to = %request.destination,
            tx_hash = %tx_hash,
            "ticket claimed"
        );
        Ok(ClaimOutcome::Claimed {
            tx_hash,
            chain_claim_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::SalePolicy;
    use crate::purchase::{PurchaseOrchestrator, PurchaseOutcome};
    use mintgate_chain::MockChainClient;
    use mintgate_core::{EventId, SplitSlug};
    use mintgate_store::{MemoryLockManager, MemoryOrderStore, PaidOrderDraft};

    struct Fixture {
        store: Arc<MemoryOrderStore>,
        locks: Arc<MemoryLockManager>,
        chain: Arc<MockChainClient>,
        claims: ClaimOrchestrator,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryOrderStore::new());
        let locks = Arc::new(MemoryLockManager::new());
        let chain = Arc::new(MockChainClient::new());
        let claims = ClaimOrchestrator::new(store.clone(), locks.clone(), chain.clone());
        Fixture {
            store,
            locks,
            chain,
            claims,
        }
    }

    fn wallet(fill: &str) -> WalletAddress {
        WalletAddress::parse(&format!("0x{}", fill.repeat(20))).unwrap()
    }

    /// Mint a custody-held ticket through the real purchase path and
    /// return the plaintext claim code.
    async fn mint_custody_order(fx: &Fixture, id: &str) -> String {
        let purchases = PurchaseOrchestrator::new(
            fx.store.clone(),
            fx.locks.clone(),
            fx.chain.clone(),
            SalePolicy::new(Some(wallet("cc"))),
        );
        let outcome = purchases
            .process_notification(crate::purchase::PaidNotification {
                merchant_order_id: MerchantOrderId::new(id).unwrap(),
                event_id: EventId(7),
                split_slug: SplitSlug::new("main-hall").unwrap(),
                status: "success".to_string(),
                total_amount: "25000".to_string(),
                buyer_address: None,
            })
            .await
            .unwrap();
        match outcome {
            PurchaseOutcome::Processed { claim_code, .. } => claim_code.expect("custody mint"),
            other => panic!("expected processed, got {other:?}"),
        }
    }

    fn request(id: &str, code: &str, destination: &WalletAddress) -> ClaimRequest {
        ClaimRequest {
            merchant_order_id: MerchantOrderId::new(id).unwrap(),
            code: code.to_string(),
            destination: destination.clone(),
        }
    }

    // ---- happy path / idempotency ----

    #[tokio::test]
    async fn claim_transfers_once_then_is_idempotent_for_the_owner() {
        let fx = fixture();
        let code = mint_custody_order(&fx, "ord-1").await;
        let buyer = wallet("ab");

        let first = fx.claims.claim(request("ord-1", &code, &buyer)).await.unwrap();
        assert!(matches!(first, ClaimOutcome::Claimed { .. }));

        let repeat = fx.claims.claim(request("ord-1", &code, &buyer)).await.unwrap();
        assert!(matches!(repeat, ClaimOutcome::AlreadyClaimed));

        // A different wallet is rejected, even with the right code.
        let thief = wallet("99");
        let err = fx.claims.claim(request("ord-1", &code, &thief)).await.unwrap_err();
        assert!(matches!(err, ClaimReject::NotOwner));
    }

    // ---- precondition order ----

    #[tokio::test]
    async fn missing_order_and_wrong_code_reject_distinctly() {
        let fx = fixture();
        let buyer = wallet("ab");
        let err = fx
            .claims
            .claim(request("ghost", "AAAA-AAAA-AAAA", &buyer))
            .await
            .unwrap_err();
        assert!(matches!(err, ClaimReject::OrderNotFound));

        let code = mint_custody_order(&fx, "ord-2").await;
        let wrong = if code.starts_with('A') { "BBBB-BBBB-BBBB" } else { "AAAA-AAAA-AAAA" };
        let err = fx.claims.claim(request("ord-2", wrong, &buyer)).await.unwrap_err();
        assert!(matches!(err, ClaimReject::InvalidCode));
        // The failed attempt left the order unclaimed.
        let order = fx
            .store
            .get_by_merchant_id(&MerchantOrderId::new("ord-2").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(order.claimed_to.is_none());
    }

    #[tokio::test]
    async fn direct_to_buyer_tickets_need_no_claim() {
        let fx = fixture();
        let purchases = PurchaseOrchestrator::new(
            fx.store.clone(),
            fx.locks.clone(),
            fx.chain.clone(),
            SalePolicy::new(None),
        );
        purchases
            .process_notification(crate::purchase::PaidNotification {
                merchant_order_id: MerchantOrderId::new("ord-3").unwrap(),
                event_id: EventId(7),
                split_slug: SplitSlug::new("main-hall").unwrap(),
                status: "success".to_string(),
                total_amount: "25000".to_string(),
                buyer_address: Some(wallet("ab")),
            })
            .await
            .unwrap();
        let outcome = fx
            .claims
            .claim(request("ord-3", "ANY-CODE", &wallet("ab")))
            .await
            .unwrap();
        assert!(matches!(outcome, ClaimOutcome::NotRequired));
    }

    #[tokio::test]
    async fn expired_codes_get_claim_expired_and_state_is_untouched() {
        let fx = fixture();
        // Seed a custody order whose code expired long ago. The mint
        // is real so the token exists on the mock chain.
        let minted = fx
            .chain
            .mint_ticket(mintgate_chain::MintRequest {
                merchant_order_id: MerchantOrderId::new("ord-4").unwrap(),
                event_id: EventId(7),
                order_id: mintgate_core::OrderId::derive(&["ord-4", "7", "main-hall"]),
                recipient: wallet("cc"),
            })
            .await
            .unwrap();
        let code = "ABCD-EFGH-JKLM";
        fx.store
            .record_paid_order(PaidOrderDraft {
                merchant_order_id: MerchantOrderId::new("ord-4").unwrap(),
                event_id: EventId(7),
                split_slug: SplitSlug::new("main-hall").unwrap(),
                order_id: Some(mintgate_core::OrderId::derive(&["ord-4", "7", "main-hall"])),
                buyer_address: None,
                ticket_type: None,
                seat: None,
                amount_try: None,
                tx_hash: Some(minted.tx_hash),
                token_id: Some(minted.token_id),
                nft_address: Some(fx.chain.contract_address().clone()),
                custody_address: Some(wallet("cc")),
                claim_code_hash: Some(crate::code::hash_claim_code(code)),
                claim_expires_at: Some(Timestamp::from_epoch_secs(1_000).unwrap()),
            })
            .await
            .unwrap();
        let before = fx
            .store
            .get_by_merchant_id(&MerchantOrderId::new("ord-4").unwrap())
            .await
            .unwrap()
            .unwrap();
        let err = fx
            .claims
            .claim(request("ord-4", code, &wallet("ab")))
            .await
            .unwrap_err();
        assert!(matches!(err, ClaimReject::Expired));
        let after = fx
            .store
            .get_by_merchant_id(&MerchantOrderId::new("ord-4").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.ticket_state, before.ticket_state);
        assert!(after.claimed_to.is_none());
    }

    // ---- contention ----

    #[tokio::test]
    async fn concurrent_claim_gets_pending() {
        let fx = fixture();
        let code = mint_custody_order(&fx, "ord-5").await;
        let order = fx
            .store
            .get_by_merchant_id(&MerchantOrderId::new("ord-5").unwrap())
            .await
            .unwrap()
            .unwrap();
        let key = claim_lock_key(order.token_id.as_ref(), &order.merchant_order_id);
        let _held = fx
            .locks
            .try_acquire(&key, DEFAULT_LOCK_TTL)
            .await
            .unwrap()
            .expect("acquire");
        let outcome = fx
            .claims
            .claim(request("ord-5", &code, &wallet("ab")))
            .await
            .unwrap();
        assert!(matches!(outcome, ClaimOutcome::Pending));
    }
}
