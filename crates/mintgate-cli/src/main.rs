//! # mintgate CLI entry point
//!
//! Parses arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mintgate_cli::code::{run_code, CodeArgs};
use mintgate_cli::serve::{run_serve, ServeArgs};
use mintgate_cli::webhook::{run_webhook, WebhookArgs};

/// Blockchain-backed ticket issuance stack.
#[derive(Parser, Debug)]
#[command(name = "mintgate", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server.
    Serve(ServeArgs),

    /// Generate or hash claim codes out of band.
    #[command(name = "claim-code")]
    ClaimCode(CodeArgs),

    /// Sign and verify payment webhook bodies.
    Webhook(WebhookArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Serve(args) => run_serve(&args),
        Commands::ClaimCode(args) => run_code(&args),
        Commands::Webhook(args) => run_webhook(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_serve_with_port() {
        let cli = Cli::try_parse_from(["mintgate", "serve", "--port", "9090"]).unwrap();
        match cli.command {
            Commands::Serve(args) => assert_eq!(args.port, Some(9090)),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn cli_parses_claim_code_generation() {
        let cli = Cli::try_parse_from(["mintgate", "claim-code", "--count", "5"]).unwrap();
        match cli.command {
            Commands::ClaimCode(args) => {
                assert_eq!(args.count, 5);
                assert!(args.hash.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn cli_rejects_count_with_hash() {
        let parsed = Cli::try_parse_from([
            "mintgate",
            "claim-code",
            "--count",
            "2",
            "--hash",
            "ABCD-EFGH-JKLM",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn cli_parses_webhook_sign() {
        let cli = Cli::try_parse_from([
            "mintgate",
            "webhook",
            "sign",
            "--merchant-order-id",
            "ord-1",
            "--total-amount",
            "450.00",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Webhook(_)));
    }
}
