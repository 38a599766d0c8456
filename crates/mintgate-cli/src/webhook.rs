//! `mintgate webhook` — sign and verify provider notification bodies.
//!
//! Integration against the payment provider is easiest to debug with
//! the exact bytes in hand: `sign` computes the hash the provider
//! would attach, `verify` runs a captured body through the same
//! verifier the webhook route uses.

use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use clap::{Args, Subcommand};
use hmac::{Hmac, Mac};
use mintgate_payment::{PaymentVerifier, Verification, VerifierConfig};
use sha2::Sha256;

#[derive(Args, Debug)]
pub struct WebhookArgs {
    #[command(subcommand)]
    pub command: WebhookCommand,
}

#[derive(Subcommand, Debug)]
pub enum WebhookCommand {
    /// Compute the notification hash for the signed fields.
    Sign {
        #[arg(long)]
        merchant_order_id: String,
        #[arg(long, default_value = "success")]
        status: String,
        #[arg(long)]
        total_amount: String,
        /// Merchant key. Falls back to `MINTGATE_WEBHOOK_SECRET`.
        #[arg(long)]
        secret: Option<String>,
        /// Merchant salt. Falls back to `MINTGATE_WEBHOOK_SALT`.
        #[arg(long)]
        salt: Option<String>,
    },
    /// Verify a captured body. Reads the file, or stdin for `-`.
    Verify {
        body: PathBuf,
    },
}

pub fn run_webhook(args: &WebhookArgs) -> anyhow::Result<u8> {
    match &args.command {
        WebhookCommand::Sign {
            merchant_order_id,
            status,
            total_amount,
            secret,
            salt,
        } => {
            let config = VerifierConfig::from_env();
            let secret = secret
                .clone()
                .or(config.secret)
                .context("no secret given and MINTGATE_WEBHOOK_SECRET is unset")?;
            let salt = salt.clone().unwrap_or(config.salt);
            println!(
                "{}",
                compute_hash(&secret, &salt, merchant_order_id, status, total_amount)?
            );
            Ok(0)
        }
        WebhookCommand::Verify { body } => {
            let raw = read_body(body)?;
            let verifier = PaymentVerifier::new(VerifierConfig::from_env());
            match verifier.verify(&raw) {
                Verification::Ok {
                    merchant_order_id,
                    status,
                    total_amount,
                    ..
                } => {
                    println!("ok {merchant_order_id} {status} {total_amount}");
                    Ok(0)
                }
                Verification::Failed { reason } => {
                    println!("rejected: {reason}");
                    Ok(1)
                }
            }
        }
    }
}

fn compute_hash(
    secret: &str,
    salt: &str,
    merchant_order_id: &str,
    status: &str,
    total_amount: &str,
) -> anyhow::Result<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .context("merchant key is not usable as an HMAC key")?;
    mac.update(format!("{merchant_order_id}{salt}{status}{total_amount}").as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

fn read_body(path: &PathBuf) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("failed to read stdin")?;
        Ok(raw)
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_bodies_pass_the_verifier() {
        let config = VerifierConfig {
            secret: Some("merchant-key".into()),
            secret_test: None,
            salt: "merchant-salt".into(),
        };
        let hash =
            compute_hash("merchant-key", "merchant-salt", "ord-1", "success", "450.00").unwrap();
        let body = serde_json::json!({
            "merchantOrderId": "ord-1",
            "status": "success",
            "totalAmount": "450.00",
            "hash": hash,
        })
        .to_string();
        let verifier = PaymentVerifier::new(config);
        assert!(verifier.verify(&body).is_ok());
    }

    #[test]
    fn bodies_are_read_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("body.json");
        std::fs::write(&path, "{\"status\":\"success\"}").unwrap();
        assert_eq!(read_body(&path).unwrap(), "{\"status\":\"success\"}");
        assert!(read_body(&dir.path().join("missing.json")).is_err());
    }
}
