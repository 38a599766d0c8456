//! `mintgate serve` — run the HTTP API.

use anyhow::Context;
use clap::Args;
use mintgate_api::state::AppState;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Listen port. Overrides `MINTGATE_PORT`.
    #[arg(long)]
    pub port: Option<u16>,
}

/// Assemble the application from the environment and serve until the
/// process is stopped.
pub fn run_serve(args: &ServeArgs) -> anyhow::Result<u8> {
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(async {
        let state = AppState::from_env()
            .await
            .context("failed to assemble application state")?;
        let port = args.port.unwrap_or(state.config.port);
        let app = mintgate_api::app(state);

        let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
            .await
            .with_context(|| format!("failed to bind port {port}"))?;
        tracing::info!(port, "mintgate API listening");
        axum::serve(listener, app)
            .await
            .context("server terminated")?;
        Ok(0)
    })
}
