//! # mintgate-payment — Webhook Verification
//!
//! Validates and normalizes inbound payment-provider notifications
//! before they reach the purchase path. The provider signs each
//! notification with HMAC-SHA256 over the canonical concatenation
//! `merchantOrderId + salt + status + totalAmount`, base64-encoded;
//! verification recomputes that MAC with the shared merchant key and
//! compares in constant time.
//!
//! The verifier never errors on malformed input. Every failure path is
//! a [`Verification::Failed`] with a machine-readable reason, so the
//! webhook handler can choose strict or lenient handling without a
//! second taxonomy for "bad input" versus "bad signature".

pub mod config;
pub mod verify;

pub use config::VerifierConfig;
pub use verify::{PaymentVerifier, RejectReason, Verification};
