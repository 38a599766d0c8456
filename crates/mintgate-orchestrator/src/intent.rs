//! # Signed Purchase Intents
//!
//! A buyer authorizes a purchase by signing a typed intent with their
//! Ed25519 wallet key. Verification is fail-closed: a bad signature, a
//! key that does not resolve to the declared buyer wallet, or an
//! expired deadline all reject before anything touches the store.

use ed25519_dalek::{Signature, VerifyingKey};
use mintgate_core::{
    EventId, MerchantOrderId, OrderId, SplitSlug, Timestamp, WalletAddress,
};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Intent verification failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntentError {
    /// Signature does not verify, or the signer is not the declared
    /// buyer.
    #[error("invalid intent signature")]
    InvalidSignature,

    /// The intent's deadline has passed.
    #[error("intent expired at {deadline}")]
    Expired { deadline: Timestamp },
}

/// The typed message a buyer signs to authorize one purchase.
#[derive(Debug, Clone)]
pub struct PurchaseIntent {
    pub buyer: WalletAddress,
    pub split_slug: SplitSlug,
    pub merchant_order_id: MerchantOrderId,
    pub event_id: EventId,
    pub amount_wei: u128,
    pub deadline: Timestamp,
}

impl PurchaseIntent {
    /// The canonical byte string the signature covers. Field order is
    /// part of the wire contract and never changes.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        format!(
            "mintgate-intent|{}|{}|{}|{}|{}|{}",
            self.buyer,
            self.split_slug,
            self.merchant_order_id,
            self.event_id,
            self.amount_wei,
            self.deadline.epoch_secs()
        )
        .into_bytes()
    }

    /// The derived collision-resistant order hash for this intent.
    pub fn order_id(&self) -> OrderId {
        OrderId::derive(&[
            self.buyer.as_str(),
            self.split_slug.as_str(),
            self.merchant_order_id.as_str(),
            &self.event_id.to_string(),
            &self.amount_wei.to_string(),
            &self.deadline.epoch_secs().to_string(),
        ])
    }
}

/// An intent with its signature and the signer's public key.
#[derive(Debug, Clone)]
pub struct SignedIntent {
    pub intent: PurchaseIntent,
    pub verifying_key: VerifyingKey,
    pub signature: Signature,
}

impl SignedIntent {
    /// Verify the signature and that the signer controls the declared
    /// buyer wallet. Does not check the deadline; callers decide what
    /// "now" means.
    pub fn verify(&self) -> Result<(), IntentError> {
        self.verifying_key
            .verify_strict(&self.intent.canonical_bytes(), &self.signature)
            .map_err(|_| IntentError::InvalidSignature)?;
        let signer = wallet_for_key(&self.verifying_key).map_err(|_| IntentError::InvalidSignature)?;
        if signer != self.intent.buyer {
            tracing::warn!(
                merchant_order_id = %self.intent.merchant_order_id,
                "intent signer does not match declared buyer"
            );
            return Err(IntentError::InvalidSignature);
        }
        Ok(())
    }
}

/// The wallet address controlled by an Ed25519 key: the first 20 bytes
/// of the SHA-256 of the public key, hex-encoded.
pub fn wallet_for_key(key: &VerifyingKey) -> Result<WalletAddress, mintgate_core::ValidationError> {
    let digest = Sha256::digest(key.as_bytes());
    let hex: String = digest[..20].iter().map(|b| format!("{b:02x}")).collect();
    WalletAddress::parse(&format!("0x{hex}"))
}
