//! # Domain Identity Newtypes
//!
//! Newtype wrappers for all identifiers in the ticketing pipeline.
//! These prevent accidental identifier confusion — you cannot pass a
//! `TokenId` where a `MerchantOrderId` is expected.
//!
//! ## Security Invariant
//!
//! The merchant order id is the idempotency key for the entire purchase
//! pipeline. Type-level distinction between identifier namespaces
//! prevents cross-namespace confusion where a replayed token id or tx
//! hash is mistaken for an order key.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ValidationError;

/// Maximum accepted length for caller-supplied identifier strings.
const MAX_ID_LEN: usize = 128;

/// The caller-chosen idempotency key for one logical purchase.
///
/// Opaque to mintgate: any non-empty string up to 128 characters. It is
/// immutable, globally unique, and the sole correlation key across the
/// payment notification, purchase, and claim flows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MerchantOrderId(String);

impl MerchantOrderId {
    /// Validate and wrap a caller-supplied merchant order id.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::Empty {
                field: "merchantOrderId",
            });
        }
        if id.len() > MAX_ID_LEN {
            return Err(ValidationError::TooLong {
                field: "merchantOrderId",
                max: MAX_ID_LEN,
                len: id.len(),
            });
        }
        Ok(Self(id))
    }

    /// Access the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Collision-resistant derived order identifier.
///
/// A SHA-256 digest over the canonical concatenation of the purchase
/// intent fields, rendered as 64 lowercase hex characters. Two intents
/// with identical fields derive the same `OrderId`; the merchant order
/// id remains the storage key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(String);

impl OrderId {
    /// Derive an order id by hashing the canonical field concatenation.
    pub fn derive(parts: &[&str]) -> Self {
        let mut hasher = Sha256::new();
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                hasher.update([b'|']);
            }
            hasher.update(part.as_bytes());
        }
        let hash = hasher.finalize();
        Self(hash.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Wrap an already-derived order id (e.g., loaded from storage).
    pub fn from_hex(hex: impl Into<String>) -> Result<Self, ValidationError> {
        let hex = hex.into();
        if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ValidationError::Malformed {
                field: "orderId",
                reason: "expected 64 hex characters".to_string(),
            });
        }
        Ok(Self(hex.to_lowercase()))
    }

    /// Access the inner hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Numeric identifier for an event (one independently configured sale).
///
/// Anti-replay registries are scoped per event so token numbering reuse
/// across independently-deployed contracts cannot collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

/// On-chain token identifier within one event's contract.
///
/// Kept as a string: token ids are decimal on this chain today but the
/// provider contract does not promise they fit in a machine word.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenId(String);

impl TokenId {
    /// Validate and wrap a token id.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::Empty { field: "tokenId" });
        }
        if id.len() > MAX_ID_LEN {
            return Err(ValidationError::TooLong {
                field: "tokenId",
                max: MAX_ID_LEN,
                len: id.len(),
            });
        }
        Ok(Self(id))
    }

    /// Access the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// URL-safe slug naming the payout split an order belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SplitSlug(String);

impl SplitSlug {
    /// Validate and wrap a split slug.
    ///
    /// Slugs are lowercase alphanumerics and hyphens, at most 64
    /// characters — the same alphabet the split registry accepts.
    pub fn new(slug: impl Into<String>) -> Result<Self, ValidationError> {
        let slug = slug.into();
        if slug.is_empty() {
            return Err(ValidationError::Empty { field: "splitSlug" });
        }
        if slug.len() > 64 {
            return Err(ValidationError::TooLong {
                field: "splitSlug",
                max: 64,
                len: slug.len(),
            });
        }
        if !slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(ValidationError::Malformed {
                field: "splitSlug",
                reason: "only lowercase alphanumerics and hyphens are allowed".to_string(),
            });
        }
        Ok(Self(slug))
    }

    /// Access the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// An EVM wallet or contract address: `0x` + 40 hex characters.
///
/// Normalized to lowercase at construction so equality checks (claimed
/// owner vs requesting wallet) are byte comparisons.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Parse and normalize an address.
    pub fn parse(addr: impl Into<String>) -> Result<Self, ValidationError> {
        let addr = addr.into();
        let hex = addr.strip_prefix("0x").ok_or_else(|| ValidationError::Malformed {
            field: "address",
            reason: "missing 0x prefix".to_string(),
        })?;
        if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ValidationError::Malformed {
                field: "address",
                reason: "expected 40 hex characters after 0x".to_string(),
            });
        }
        Ok(Self(addr.to_lowercase()))
    }

    /// Access the inner `0x…` string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A transaction hash: `0x` + 64 hex characters.
///
/// Once recorded on an order it is never overwritten — a present tx
/// hash is the duplicate-suppression marker for the whole pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHash(String);

impl TxHash {
    /// Parse and normalize a transaction hash.
    pub fn parse(hash: impl Into<String>) -> Result<Self, ValidationError> {
        let hash = hash.into();
        let hex = hash.strip_prefix("0x").ok_or_else(|| ValidationError::Malformed {
            field: "txHash",
            reason: "missing 0x prefix".to_string(),
        })?;
        if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ValidationError::Malformed {
                field: "txHash",
                reason: "expected 64 hex characters after 0x".to_string(),
            });
        }
        Ok(Self(hash.to_lowercase()))
    }

    /// Access the inner `0x…` string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MerchantOrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for TokenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for SplitSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for TxHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merchant_order_id_rejects_empty() {
        assert!(MerchantOrderId::new("").is_err());
        assert!(MerchantOrderId::new("   ").is_err());
    }

    #[test]
    fn merchant_order_id_rejects_oversized() {
        let long = "x".repeat(129);
        assert!(MerchantOrderId::new(long).is_err());
        assert!(MerchantOrderId::new("x".repeat(128)).is_ok());
    }

    #[test]
    fn merchant_order_id_is_opaque() {
        // Any printable string the caller chooses is valid.
        let id = MerchantOrderId::new("ord_2026-08#retry!").unwrap();
        assert_eq!(id.as_str(), "ord_2026-08#retry!");
    }

    #[test]
    fn order_id_derive_is_deterministic() {
        let a = OrderId::derive(&["0xabc", "main-sale", "ord-1"]);
        let b = OrderId::derive(&["0xabc", "main-sale", "ord-1"]);
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn order_id_derive_separator_prevents_gluing() {
        // "ab" + "c" must not collide with "a" + "bc".
        let a = OrderId::derive(&["ab", "c"]);
        let b = OrderId::derive(&["a", "bc"]);
        assert_ne!(a, b);
    }

    #[test]
    fn order_id_from_hex_validates() {
        let ok = "a".repeat(64);
        assert!(OrderId::from_hex(ok).is_ok());
        assert!(OrderId::from_hex("zz").is_err());
        assert!(OrderId::from_hex("a".repeat(63)).is_err());
    }

    #[test]
    fn wallet_address_normalizes_case() {
        let addr = WalletAddress::parse("0xABCDEF0123456789abcdef0123456789ABCDEF01").unwrap();
        assert_eq!(
            addr.as_str(),
            "0xabcdef0123456789abcdef0123456789abcdef01"
        );
    }

    #[test]
    fn wallet_address_rejects_bad_input() {
        assert!(WalletAddress::parse("abcdef0123456789abcdef0123456789abcdef01").is_err());
        assert!(WalletAddress::parse("0x1234").is_err());
        assert!(WalletAddress::parse("0xZZcdef0123456789abcdef0123456789abcdef01").is_err());
    }

    #[test]
    fn tx_hash_roundtrip() {
        let h = format!("0x{}", "ab".repeat(32));
        let tx = TxHash::parse(&h).unwrap();
        assert_eq!(tx.as_str(), h);
        assert!(TxHash::parse("0xabc").is_err());
    }

    #[test]
    fn split_slug_alphabet() {
        assert!(SplitSlug::new("main-sale-2026").is_ok());
        assert!(SplitSlug::new("Main").is_err());
        assert!(SplitSlug::new("a b").is_err());
        assert!(SplitSlug::new("").is_err());
    }

    #[test]
    fn serde_newtypes_are_transparent() {
        let id = MerchantOrderId::new("ord-1").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"ord-1\"");
        let back: MerchantOrderId = serde_json::from_str("\"ord-1\"").unwrap();
        assert_eq!(back, id);
    }
}
