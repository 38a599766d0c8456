//! # Claim Codes
//!
//! Secret codes gating custody-held tickets: three groups of four
//! characters from a 32-symbol alphabet that excludes the visually
//! ambiguous `I`, `O`, `0` and `1`. Codes are hashed before storage and
//! compared in constant time; the plaintext exists only in the purchase
//! response that delivers it to the buyer.

use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// 32 symbols, no `I`/`O`/`0`/`1`.
const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Generate a fresh `XXXX-XXXX-XXXX` code.
pub fn generate_claim_code<R: Rng>(rng: &mut R) -> String {
    let mut code = String::with_capacity(14);
    for group in 0..3 {
        if group > 0 {
            code.push('-');
        }
        for _ in 0..4 {
            let index = rng.gen_range(0..ALPHABET.len());
            code.push(ALPHABET[index] as char);
        }
    }
    code
}

/// Hash a code for storage. Normalizes first, so users may type with
/// or without hyphens and in any case.
pub fn hash_claim_code(code: &str) -> String {
    let digest = Sha256::digest(normalize(code).as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Constant-time check of a supplied code against a stored hash.
pub fn verify_claim_code(supplied: &str, stored_hash: &str) -> bool {
    let supplied_hash = hash_claim_code(supplied);
    bool::from(supplied_hash.as_bytes().ct_eq(stored_hash.as_bytes()))
}

fn normalize(code: &str) -> String {
    code.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}
