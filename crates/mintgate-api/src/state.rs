//! # Application State & Configuration
//!
//! All configuration comes from `MINTGATE_*` environment variables,
//! resolved once at startup. The assembled [`AppState`] owns the store,
//! lock manager, chain client and the three orchestrators; handlers
//! only ever see this one type.

use std::sync::Arc;

use mintgate_chain::{
    ChainClient, ChainError, EvmChainClient, EvmChainConfig, MockChainClient,
};
use mintgate_core::{SplitSlug, WalletAddress};
use mintgate_orchestrator::{
    ClaimOrchestrator, GateOrchestrator, PurchaseOrchestrator, SalePolicy,
};
use mintgate_payment::{PaymentVerifier, VerifierConfig};
use mintgate_store::{
    init_pool, LockManager, MemoryLockManager, MemoryOrderStore, OrderStore, PgLockManager,
    PgOrderStore, StoreError,
};
use thiserror::Error;

use crate::audit::AuditLog;
use crate::middleware::rate_limit::RateLimitConfig;

/// Failures while assembling the application at startup.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Which chain adapter backs the deployment.
#[derive(Debug, Clone)]
pub enum ChainTarget {
    /// In-process simulated chain. Default when no RPC URL is set.
    Mock,
    /// Real ticket contract over JSON-RPC.
    Evm(EvmChainConfig),
}

/// Resolved service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Listen port (`MINTGATE_PORT`, default 8080).
    pub port: u16,
    /// Bearer token for operator endpoints (`MINTGATE_OPERATOR_TOKEN`).
    /// `None` disables operator auth; only sane for development.
    pub operator_token: Option<String>,
    /// Custody wallet for deferred-claim mints
    /// (`MINTGATE_CUSTODY_ADDRESS`). `None` mints direct-to-buyer.
    pub custody_address: Option<WalletAddress>,
    /// Claim code validity in seconds (`MINTGATE_CLAIM_TTL_SECS`).
    pub claim_ttl_secs: Option<u64>,
    /// Events with sales paused at startup
    /// (`MINTGATE_PAUSED_EVENTS`, comma-separated ids).
    pub paused_events: Vec<u64>,
    /// Event id assumed for webhook notifications that do not carry one
    /// (`MINTGATE_DEFAULT_EVENT_ID`, default 1).
    pub default_event_id: u64,
    /// Split slug assumed for webhook notifications that do not carry
    /// one (`MINTGATE_DEFAULT_SPLIT`, default `general`).
    pub default_split: SplitSlug,
    /// Webhook verification secrets.
    pub verifier: VerifierConfig,
    /// Fixed-window rate limit settings.
    pub rate_limit: RateLimitConfig,
    /// Chain adapter selection.
    pub chain: ChainTarget,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            operator_token: None,
            custody_address: None,
            claim_ttl_secs: None,
            paused_events: Vec::new(),
            default_event_id: 1,
            default_split: SplitSlug::new("general")
                .expect("constant slug is valid"),
            verifier: VerifierConfig::default(),
            rate_limit: RateLimitConfig::default(),
            chain: ChainTarget::Mock,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from the environment.
    pub fn from_env() -> Result<Self, StartupError> {
        let port = parse_var("MINTGATE_PORT")?.unwrap_or(8080);

        let custody_address = match read_nonempty("MINTGATE_CUSTODY_ADDRESS") {
            Some(raw) => Some(
                WalletAddress::parse(&raw)
                    .map_err(|e| StartupError::Config(format!("MINTGATE_CUSTODY_ADDRESS: {e}")))?,
            ),
            None => None,
        };

        let paused_events = match read_nonempty("MINTGATE_PAUSED_EVENTS") {
            Some(raw) => raw
                .split(',')
                .map(|part| {
                    part.trim().parse::<u64>().map_err(|e| {
                        StartupError::Config(format!("MINTGATE_PAUSED_EVENTS entry {part:?}: {e}"))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        let default_split = match read_nonempty("MINTGATE_DEFAULT_SPLIT") {
            Some(raw) => SplitSlug::new(raw)
                .map_err(|e| StartupError::Config(format!("MINTGATE_DEFAULT_SPLIT: {e}")))?,
            None => SplitSlug::new("general").expect("constant slug is valid"),
        };

        let chain = match read_nonempty("MINTGATE_CHAIN_RPC_URL") {
            Some(rpc_url) => {
                let contract = read_nonempty("MINTGATE_CONTRACT_ADDRESS").ok_or_else(|| {
                    StartupError::Config(
                        "MINTGATE_CONTRACT_ADDRESS is required with MINTGATE_CHAIN_RPC_URL".into(),
                    )
                })?;
                let from = read_nonempty("MINTGATE_CHAIN_FROM_ADDRESS").ok_or_else(|| {
                    StartupError::Config(
                        "MINTGATE_CHAIN_FROM_ADDRESS is required with MINTGATE_CHAIN_RPC_URL"
                            .into(),
                    )
                })?;
                ChainTarget::Evm(EvmChainConfig::new(
                    rpc_url,
                    WalletAddress::parse(&contract).map_err(|e| {
                        StartupError::Config(format!("MINTGATE_CONTRACT_ADDRESS: {e}"))
                    })?,
                    WalletAddress::parse(&from).map_err(|e| {
                        StartupError::Config(format!("MINTGATE_CHAIN_FROM_ADDRESS: {e}"))
                    })?,
                    read_nonempty("MINTGATE_CHAIN_NAME").unwrap_or_else(|| "evm".into()),
                ))
            }
            None => ChainTarget::Mock,
        };

        Ok(Self {
            port,
            operator_token: read_nonempty("MINTGATE_OPERATOR_TOKEN"),
            custody_address,
            claim_ttl_secs: parse_var("MINTGATE_CLAIM_TTL_SECS")?,
            paused_events,
            default_event_id: parse_var("MINTGATE_DEFAULT_EVENT_ID")?.unwrap_or(1),
            default_split,
            verifier: VerifierConfig::from_env(),
            rate_limit: RateLimitConfig::from_env()?,
            chain,
        })
    }

    fn sale_policy(&self) -> SalePolicy {
        let mut policy = SalePolicy::new(self.custody_address.clone());
        if let Some(secs) = self.claim_ttl_secs {
            policy = policy.with_claim_ttl_secs(secs);
        }
        for event in &self.paused_events {
            policy.pause_event(mintgate_core::EventId(*event));
        }
        policy
    }

    fn chain_client(&self) -> Result<Arc<dyn ChainClient>, StartupError> {
        Ok(match &self.chain {
            ChainTarget::Mock => Arc::new(MockChainClient::new()),
            ChainTarget::Evm(config) => Arc::new(EvmChainClient::new(config.clone())?),
        })
    }
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn OrderStore>,
    pub chain: Arc<dyn ChainClient>,
    pub purchases: Arc<PurchaseOrchestrator>,
    pub claims: Arc<ClaimOrchestrator>,
    pub gate: Arc<GateOrchestrator>,
    pub verifier: Arc<PaymentVerifier>,
    pub audit: AuditLog,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Assemble against in-memory backends. Used by tests and
    /// single-process deployments without a database.
    pub fn in_memory(config: AppConfig) -> Result<Self, StartupError> {
        let store: Arc<dyn OrderStore> = Arc::new(MemoryOrderStore::new());
        let locks: Arc<dyn LockManager> = Arc::new(MemoryLockManager::new());
        Self::assemble(config, store, locks)
    }

    /// Assemble from the environment. Postgres backs the store and
    /// lock manager when `DATABASE_URL` is set; memory otherwise.
    pub async fn from_env() -> Result<Self, StartupError> {
        let config = AppConfig::from_env()?;
        match init_pool().await? {
            Some(pool) => {
                let store: Arc<dyn OrderStore> = Arc::new(PgOrderStore::new(pool.clone()));
                let locks: Arc<dyn LockManager> = Arc::new(PgLockManager::new(pool));
                Self::assemble(config, store, locks)
            }
            None => {
                tracing::warn!("no DATABASE_URL set, orders will not survive a restart");
                Self::in_memory(config)
            }
        }
    }

    fn assemble(
        config: AppConfig,
        store: Arc<dyn OrderStore>,
        locks: Arc<dyn LockManager>,
    ) -> Result<Self, StartupError> {
        let chain = config.chain_client()?;
        let purchases = Arc::new(PurchaseOrchestrator::new(
            Arc::clone(&store),
            Arc::clone(&locks),
            Arc::clone(&chain),
            config.sale_policy(),
        ));
        let claims = Arc::new(ClaimOrchestrator::new(
            Arc::clone(&store),
            Arc::clone(&locks),
            Arc::clone(&chain),
        ));
        let gate = Arc::new(GateOrchestrator::new(Arc::clone(&store)));
        let verifier = Arc::new(PaymentVerifier::new(config.verifier.clone()));
        Ok(Self {
            store,
            chain,
            purchases,
            claims,
            gate,
            verifier,
            audit: AuditLog::default(),
            config: Arc::new(config),
        })
    }
}

fn read_nonempty(var: &str) -> Option<String> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

fn parse_var<T: std::str::FromStr>(var: &str) -> Result<Option<T>, StartupError>
where
    T::Err: std::fmt::Display,
{
    match read_nonempty(var) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| StartupError::Config(format!("{var}: {e}"))),
        None => Ok(None),
    }
}
