//! # Purchase Orchestration
//!
//! Turns a verified buyer intent or a verified payment notification
//! into exactly one mint per `merchant_order_id`.
//!
//! ## Protocol
//!
//! 1. Verify the intent signature (fail closed) and deadline.
//! 2. Short-circuit `duplicate` when the stored order already carries
//!    a `tx_hash` — no lock, no side effects.
//! 3. Acquire the purchase lock; contention is a retryable `Pending`,
//!    never a blocking wait.
//! 4. Inside the lock: re-validate sale constraints, mint, persist via
//!    `record_paid_order`.
//! 5. Release the lock on every exit path.
//!
//! The caller may retry any response freely; idempotency is carried by
//! the store, not by the transport.

use std::sync::Arc;

use mintgate_chain::{ChainClient, ChainError, MintRequest};
use mintgate_core::{
    EventId, MerchantOrderId, Order, OrderId, PaymentStatus, SplitSlug, Timestamp, TokenId,
    TxHash, WalletAddress,
};
use mintgate_store::{
    keys::purchase_lock_key, LockManager, OrderStore, PaidOrderDraft, StatusDraft, StoreError,
    DEFAULT_LOCK_TTL,
};
use thiserror::Error;

use crate::code::{generate_claim_code, hash_claim_code};
use crate::intent::{IntentError, SignedIntent};
use crate::policy::SalePolicy;

/// Purchase failures. Contention and duplication are not here — they
/// are expected outcomes, not errors.
#[derive(Error, Debug)]
pub enum PurchaseError {
    #[error(transparent)]
    Intent(#[from] IntentError),

    /// Sales for the event are administratively paused.
    #[error("event {0} is paused")]
    EventPaused(EventId),

    /// The intent carries a non-positive price.
    #[error("invalid price: amount must be positive")]
    InvalidPrice,

    /// Minting needs a recipient and neither a buyer wallet nor a
    /// custody address is available.
    #[error("no recipient for mint: buyer unknown and no custody address configured")]
    NoRecipient,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Outcome of one purchase or notification call.
#[derive(Debug, Clone)]
pub enum PurchaseOutcome {
    /// A mint happened in this call.
    Processed {
        tx_hash: TxHash,
        token_id: TokenId,
        /// Plaintext claim code, present only for custody mints and
        /// only in this one response.
        claim_code: Option<String>,
    },
    /// The order was already minted; nothing happened.
    Duplicate {
        tx_hash: Option<TxHash>,
        token_id: Option<TokenId>,
    },
    /// Another in-flight attempt holds the key. Retry later.
    Pending,
    /// A non-success notification was recorded; no mint.
    StatusRecorded { payment_status: PaymentStatus },
}

/// A verified, normalized payment notification ready for orchestration.
#[derive(Debug, Clone)]
pub struct PaidNotification {
    pub merchant_order_id: MerchantOrderId,
    pub event_id: EventId,
    pub split_slug: SplitSlug,
    /// Provider status string; `success` triggers the mint path.
    pub status: String,
    pub total_amount: String,
    pub buyer_address: Option<WalletAddress>,
}

/// Orchestrates mints against the store, lock manager and chain.
pub struct PurchaseOrchestrator {
    store: Arc<dyn OrderStore>,
    locks: Arc<dyn LockManager>,
    chain: Arc<dyn ChainClient>,
    policy: SalePolicy,
}

impl PurchaseOrchestrator {
    pub fn new(
        store: Arc<dyn OrderStore>,
        locks: Arc<dyn LockManager>,
        chain: Arc<dyn ChainClient>,
        policy: SalePolicy,
    ) -> Self {
        Self {
            store,
            locks,
            chain,
            policy,
        }
    }

    /// Process a buyer-signed purchase intent.
    pub async fn purchase(&self, signed: SignedIntent) -> Result<PurchaseOutcome, PurchaseError> {
        signed.verify()?;
        let intent = &signed.intent;
        if intent.deadline < Timestamp::now() {
            return Err(IntentError::Expired {
                deadline: intent.deadline,
            }
            .into());
        }
        if intent.amount_wei == 0 {
            return Err(PurchaseError::InvalidPrice);
        }
        self.mint_once(
            intent.merchant_order_id.clone(),
            intent.event_id,
            intent.split_slug.clone(),
            intent.order_id(),
            Some(intent.buyer.clone()),
            None,
        )
        .await
    }

    /// Process a verified payment notification. Success statuses take
    /// the same mint path as intents; everything else is recorded
    /// create-only and acknowledged.
    pub async fn process_notification(
        &self,
        note: PaidNotification,
    ) -> Result<PurchaseOutcome, PurchaseError> {
        if note.status != "success" {
            let payment_status = match note.status.as_str() {
                "failed" => PaymentStatus::Failed,
                "flagged" | "fraud" => PaymentStatus::Flagged,
                _ => PaymentStatus::Pending,
            };
            self.store
                .record_order_status(StatusDraft {
                    merchant_order_id: note.merchant_order_id,
                    event_id: note.event_id,
                    split_slug: note.split_slug,
                    payment_status,
                    amount_try: Some(note.total_amount),
                })
                .await?;
            return Ok(PurchaseOutcome::StatusRecorded { payment_status });
        }
        let order_id = OrderId::derive(&[
            note.merchant_order_id.as_str(),
            &note.event_id.to_string(),
            note.split_slug.as_str(),
        ]);
        self.mint_once(
            note.merchant_order_id,
            note.event_id,
            note.split_slug,
            order_id,
            note.buyer_address,
            Some(note.total_amount),
        )
        .await
    }

    /// The shared exactly-once mint path.
    async fn mint_once(
        &self,
        merchant_order_id: MerchantOrderId,
        event_id: EventId,
        split_slug: SplitSlug,
        order_id: OrderId,
        buyer: Option<WalletAddress>,
        amount_try: Option<String>,
    ) -> Result<PurchaseOutcome, PurchaseError> {
        // Duplicate short-circuit before taking the lock.
        if let Some(existing) = self.store.get_by_merchant_id(&merchant_order_id).await? {
            if existing.tx_hash.is_some() {
                return Ok(duplicate_of(&existing));
            }
        }

        let key = purchase_lock_key(&merchant_order_id);
        let Some(lease) = self.locks.try_acquire(&key, DEFAULT_LOCK_TTL).await? else {
            tracing::debug!(%merchant_order_id, "purchase lock contended");
            return Ok(PurchaseOutcome::Pending);
        };

        // Capture the critical section's result, then release
        // unconditionally before propagating it.
        let result = self
            .mint_and_record(
                &merchant_order_id,
                event_id,
                &split_slug,
                &order_id,
                buyer,
                amount_try,
            )
            .await;
        if let Err(e) = self.locks.release(lease).await {
            tracing::warn!(%merchant_order_id, error = %e, "purchase lock release failed");
        }
        result
    }

    async fn mint_and_record(
        &self,
        merchant_order_id: &MerchantOrderId,
        event_id: EventId,
        split_slug: &SplitSlug,
        order_id: &OrderId,
        buyer: Option<WalletAddress>,
        amount_try: Option<String>,
    ) -> Result<PurchaseOutcome, PurchaseError> {
        if self.policy.is_paused(event_id) {
            return Err(PurchaseError::EventPaused(event_id));
        }

        let custody = self.policy.custody_address.clone();
        let recipient = custody
            .clone()
            .or_else(|| buyer.clone())
            .ok_or(PurchaseError::NoRecipient)?;

        let outcome = self
            .chain
            .mint_ticket(MintRequest {
                merchant_order_id: merchant_order_id.clone(),
                event_id,
                order_id: order_id.clone(),
                recipient,
            })
            .await?;
        if outcome.already_used {
            tracing::info!(%merchant_order_id, "chain reports mint replay");
            let stored = self.store.get_by_merchant_id(merchant_order_id).await?;
            return Ok(match stored {
                Some(order) => duplicate_of(&order),
                None => PurchaseOutcome::Duplicate {
                    tx_hash: Some(outcome.tx_hash),
                    token_id: Some(outcome.token_id),
                },
            });
        }

        // Claim codes exist only for custody-held tickets.
        let (claim_code, claim_code_hash, claim_expires_at) = if custody.is_some() {
            let code = generate_claim_code(&mut rand::thread_rng());
            let hash = hash_claim_code(&code);
            let ttl = i64::try_from(self.policy.claim_ttl_secs).unwrap_or(i64::MAX);
            let expires = Timestamp::now().plus_secs(ttl);
            (Some(code), Some(hash), Some(expires))
        } else {
            (None, None, None)
        };

        let recorded = self
            .store
            .record_paid_order(PaidOrderDraft {
                merchant_order_id: merchant_order_id.clone(),
                event_id,
                split_slug: split_slug.clone(),
                order_id: Some(order_id.clone()),
                buyer_address: buyer,
                ticket_type: None,
                seat: None,
                amount_try,
                tx_hash: Some(outcome.tx_hash.clone()),
                token_id: Some(outcome.token_id.clone()),
                nft_address: Some(self.chain.contract_address().clone()),
                custody_address: custody,
                claim_code_hash,
                claim_expires_at,
            })
            .await?;
        if recorded.duplicate {
            return Ok(duplicate_of(&recorded.order));
        }

        tracing::info!(
            %merchant_order_id,
            tx_hash = %outcome.tx_hash,
            token_id = %outcome.token_id,
            state = %recorded.order.ticket_state,
            "ticket minted"
        );
        Ok(PurchaseOutcome::Processed {
            tx_hash: outcome.tx_hash,
            token_id: outcome.token_id,
            claim_code,
        })
    }
}

fn duplicate_of(order: &Order) -> PurchaseOutcome {
    PurchaseOutcome::Duplicate {
        tx_hash: order.tx_hash.clone(),
        token_id: order.token_id.clone(),
    }
}
