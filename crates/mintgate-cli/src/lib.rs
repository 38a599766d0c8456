//! # mintgate-cli — Operator Tooling
//!
//! Subcommand implementations for the `mintgate` binary: serving the
//! API, minting claim codes out of band, and signing or verifying
//! payment webhook bodies during provider integration.

pub mod code;
pub mod serve;
pub mod webhook;
