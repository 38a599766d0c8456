//! `mintgate claim-code` — mint claim codes out of band.
//!
//! Box-office and comp-ticket flows sometimes need codes that were
//! never attached to a payment. This generates them with the same
//! alphabet and hashing the purchase pipeline uses, so a generated
//! code can be seeded straight into an order record.

use clap::Args;
use mintgate_orchestrator::{generate_claim_code, hash_claim_code};

#[derive(Args, Debug)]
pub struct CodeArgs {
    /// How many codes to generate.
    #[arg(long, default_value_t = 1)]
    pub count: u32,

    /// Hash an existing code instead of generating new ones.
    #[arg(long, conflicts_with = "count")]
    pub hash: Option<String>,

    /// Emit JSON lines instead of tab-separated text.
    #[arg(long)]
    pub json: bool,
}

pub fn run_code(args: &CodeArgs) -> anyhow::Result<u8> {
    if let Some(code) = &args.hash {
        print_pair(args.json, code, &hash_claim_code(code));
        return Ok(0);
    }
    let mut rng = rand::thread_rng();
    for _ in 0..args.count {
        let code = generate_claim_code(&mut rng);
        print_pair(args.json, &code, &hash_claim_code(&code));
    }
    Ok(0)
}

fn print_pair(json: bool, code: &str, hash: &str) {
    if json {
        println!(
            "{}",
            serde_json::json!({ "code": code, "hash": hash })
        );
    } else {
        println!("{code}\t{hash}");
    }
}
