//! # EVM JSON-RPC Chain Client
//!
//! Production adapter for EVM-compatible chains via JSON-RPC.
//!
//! ## How It Works
//!
//! 1. Mints call the ticket contract's `mintTicket(bytes32,address)`
//!    via `eth_call` first (the simulate stage, where the contract's
//!    own replay check surfaces without spending gas), then
//!    `eth_sendTransaction`, then fetch the receipt for the token id.
//! 2. The JSON-RPC endpoint handles transaction signing. The `from`
//!    address must be managed by the RPC provider's signing service.
//! 3. Payment bindings are read with `eth_call` against the contract's
//!    `paymentBinding(uint256)` view.
//!
//! ## Security
//!
//! - The client does NOT hold private keys; signing is delegated to
//!   the RPC endpoint's key management.
//! - All RPC calls use HTTPS.

use mintgate_core::{OrderId, TokenId, TxHash, WalletAddress};

use async_trait::async_trait;

use super::{ChainClient, ChainError, ChainStage, MintOutcome, MintRequest, TransferRequest};

/// 4-byte selector for `mintTicket(bytes32,address)`.
const MINT_SELECTOR: &str = "8c3d1f5a";
/// 4-byte selector for `transferTicket(uint256,address,address)`.
const TRANSFER_SELECTOR: &str = "c2e5d9b1";
/// 4-byte selector for `markClaimed(uint256)`.
const MARK_CLAIMED_SELECTOR: &str = "4a0f7e36";
/// 4-byte selector for `paymentBinding(uint256)`.
const BINDING_SELECTOR: &str = "91d04c2e";

/// Revert data prefix the contract returns when an order id was
/// already minted. The simulate stage translates it into
/// [`MintOutcome::already_used`].
const ALREADY_MINTED_MARKER: &str = "already minted";

/// Configuration for [`EvmChainClient`].
#[derive(Debug, Clone)]
pub struct EvmChainConfig {
    /// JSON-RPC endpoint URL (must be HTTPS in production).
    pub rpc_url: String,
    /// Ticket contract address.
    pub contract_address: WalletAddress,
    /// Sender address whose transactions the RPC provider signs.
    pub from_address: WalletAddress,
    /// Human-readable chain name for logs.
    pub chain_name: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl EvmChainConfig {
    pub fn new(
        rpc_url: impl Into<String>,
        contract_address: WalletAddress,
        from_address: WalletAddress,
        chain_name: impl Into<String>,
    ) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            contract_address,
            from_address,
            chain_name: chain_name.into(),
            timeout_secs: 30,
        }
    }
}

/// Ticket contract adapter over JSON-RPC.
#[derive(Debug)]
pub struct EvmChainClient {
    client: reqwest::Client,
    config: EvmChainConfig,
}

impl EvmChainClient {
    pub fn new(config: EvmChainConfig) -> Result<Self, ChainError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChainError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Send a JSON-RPC request and return the `result` field.
    async fn rpc_call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, ChainError> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });
        let response = self
            .client
            .post(&self.config.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChainError::Unavailable(format!("{}: request timed out", self.chain_name()))
                } else {
                    ChainError::Unavailable(format!("{}: {e}", self.chain_name()))
                }
            })?;
        if !response.status().is_success() {
            return Err(ChainError::Unavailable(format!(
                "{}: HTTP {}",
                self.chain_name(),
                response.status()
            )));
        }
        let json: serde_json::Value = response.json().await.map_err(|e| {
            ChainError::Unavailable(format!("{}: invalid JSON response: {e}", self.chain_name()))
        })?;
        if let Some(error) = json.get("error") {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown RPC error");
            return Err(ChainError::Unavailable(format!(
                "{}: {message}",
                self.chain_name()
            )));
        }
        json.get("result").cloned().ok_or_else(|| {
            ChainError::Unavailable(format!(
                "{}: JSON-RPC response missing 'result' field",
                self.chain_name()
            ))
        })
    }

    /// Run a contract call at a tagged stage: `eth_call` for simulate
    /// and view reads, `eth_sendTransaction` for state changes.
    async fn contract_call(
        &self,
        method: &str,
        data: &str,
        stage: ChainStage,
    ) -> Result<serde_json::Value, ChainError> {
        let tx = serde_json::json!({
            "from": self.config.from_address.as_str(),
            "to": self.config.contract_address.as_str(),
            "data": data,
        });
        let params = match method {
            "eth_call" => serde_json::json!([tx, "latest"]),
            _ => serde_json::json!([tx]),
        };
        self.rpc_call(method, params)
            .await
            .map_err(|e| match e {
                ChainError::Unavailable(reason) => ChainError::CallFailed { stage, reason },
                other => other,
            })
    }

    /// Fetch a mined receipt, failing at the receipt stage when the
    /// transaction is still pending or reverted.
    async fn mined_receipt(&self, tx_hash: &str) -> Result<serde_json::Value, ChainError> {
        let receipt = self
            .rpc_call("eth_getTransactionReceipt", serde_json::json!([tx_hash]))
            .await
            .map_err(|e| ChainError::CallFailed {
                stage: ChainStage::Receipt,
                reason: e.to_string(),
            })?;
        if receipt.is_null() {
            return Err(ChainError::CallFailed {
                stage: ChainStage::Receipt,
                reason: format!("transaction {tx_hash} not yet mined"),
            });
        }
        let status = receipt
            .get("status")
            .and_then(|s| s.as_str())
            .unwrap_or("0x0");
        if status == "0x0" {
            return Err(ChainError::CallFailed {
                stage: ChainStage::Receipt,
                reason: format!("transaction {tx_hash} reverted"),
            });
        }
        Ok(receipt)
    }

    fn parse_tx_hash(&self, result: serde_json::Value, stage: ChainStage) -> Result<TxHash, ChainError> {
        let raw = result.as_str().ok_or_else(|| ChainError::CallFailed {
            stage,
            reason: "non-string transaction hash in RPC result".to_string(),
        })?;
        TxHash::parse(raw).map_err(|e| ChainError::CallFailed {
            stage,
            reason: format!("malformed transaction hash {raw}: {e}"),
        })
    }
}

#[async_trait]
impl ChainClient for EvmChainClient {
    async fn mint_ticket(&self, request: MintRequest) -> Result<MintOutcome, ChainError> {
        let data = format!(
            "0x{MINT_SELECTOR}{}{}",
            request.order_id.as_str(),
            pad_address(&request.recipient)
        );

        // Simulate first: the contract's replay check reverts with a
        // marker we translate into the duplicate path instead of
        // spending gas on a doomed transaction.
        match self.contract_call("eth_call", &data, ChainStage::Simulate).await {
            Ok(_) => {}
            Err(ChainError::CallFailed { reason, .. })
                if reason.to_lowercase().contains(ALREADY_MINTED_MARKER) =>
            {
                tracing::info!(
                    merchant_order_id = %request.merchant_order_id,
                    "contract reports order already minted"
                );
                let binding_token = self.token_for_order(&request.order_id).await?;
                return Ok(MintOutcome {
                    tx_hash: Self::zero_tx()?,
                    token_id: binding_token,
                    already_used: true,
                });
            }
            Err(e) => return Err(e),
        }

        let sent = self
            .contract_call("eth_sendTransaction", &data, ChainStage::Send)
            .await?;
        let tx_hash = self.parse_tx_hash(sent, ChainStage::Send)?;
        let receipt = self.mined_receipt(tx_hash.as_str()).await?;
        let token_id = token_from_receipt(&receipt)?;
        Ok(MintOutcome {
            tx_hash,
            token_id,
            already_used: false,
        })
    }

    async fn transfer_ticket(&self, request: TransferRequest) -> Result<TxHash, ChainError> {
        let data = format!(
            "0x{TRANSFER_SELECTOR}{}{}{}",
            pad_token(&request.token_id)?,
            pad_address(&request.from),
            pad_address(&request.to)
        );
        self.contract_call("eth_call", &data, ChainStage::Simulate)
            .await?;
        let sent = self
            .contract_call("eth_sendTransaction", &data, ChainStage::Send)
            .await?;
        let tx_hash = self.parse_tx_hash(sent, ChainStage::Send)?;
        self.mined_receipt(tx_hash.as_str()).await?;
        Ok(tx_hash)
    }

    async fn mark_claimed(&self, token: &TokenId) -> Result<TxHash, ChainError> {
        let data = format!("0x{MARK_CLAIMED_SELECTOR}{}", pad_token(token)?);
        let sent = self
            .contract_call("eth_sendTransaction", &data, ChainStage::Send)
            .await?;
        self.parse_tx_hash(sent, ChainStage::Send)
    }

    async fn payment_binding(&self, token: &TokenId) -> Result<Option<OrderId>, ChainError> {
        let data = format!("0x{BINDING_SELECTOR}{}", pad_token(token)?);
        let result = self
            .contract_call("eth_call", &data, ChainStage::Simulate)
            .await?;
        let raw = result.as_str().unwrap_or("0x");
        let hex = raw.trim_start_matches("0x");
        if hex.is_empty() || hex.chars().all(|c| c == '0') {
            return Ok(None);
        }
        OrderId::from_hex(hex)
            .map(Some)
            .map_err(|e| ChainError::CallFailed {
                stage: ChainStage::Simulate,
                reason: format!("malformed payment binding {raw}: {e}"),
            })
    }

    fn contract_address(&self) -> &WalletAddress {
        &self.config.contract_address
    }

    fn chain_name(&self) -> &str {
        &self.config.chain_name
    }
}

impl EvmChainClient {
    /// Resolve the token minted for an order the contract reports as
    /// already used, via `tokenForOrder(bytes32)`.
    async fn token_for_order(&self, order_id: &OrderId) -> Result<TokenId, ChainError> {
        const TOKEN_FOR_ORDER_SELECTOR: &str = "2f8a1d47";
        let data = format!("0x{TOKEN_FOR_ORDER_SELECTOR}{}", order_id.as_str());
        let result = self
            .contract_call("eth_call", &data, ChainStage::Simulate)
            .await?;
        let raw = result.as_str().unwrap_or("0x0");
        let value = u64::from_str_radix(raw.trim_start_matches("0x"), 16).map_err(|e| {
            ChainError::CallFailed {
                stage: ChainStage::Simulate,
                reason: format!("malformed token id {raw}: {e}"),
            }
        })?;
        TokenId::new(value.to_string()).map_err(|e| ChainError::Config(e.to_string()))
    }

    /// Placeholder hash reported for duplicate mints the contract
    /// short-circuited; the stored order keeps the original hash.
    fn zero_tx() -> Result<TxHash, ChainError> {
        TxHash::parse(&format!("0x{}", "0".repeat(64)))
            .map_err(|e| ChainError::Config(e.to_string()))
    }
}

/// Left-pad a 20-byte address into a 32-byte ABI word.
fn pad_address(address: &WalletAddress) -> String {
    format!("{:0>64}", address.as_str().trim_start_matches("0x"))
}

/// Encode a numeric token id as a 32-byte ABI word.
fn pad_token(token: &TokenId) -> Result<String, ChainError> {
    let value: u128 = token
        .as_str()
        .parse()
        .map_err(|_| ChainError::Config(format!("non-numeric token id {token}")))?;
    Ok(format!("{value:064x}"))
}

/// Extract the minted token id from the Transfer event in a receipt
/// (`topics[3]` of the first log, per ERC-721).
fn token_from_receipt(receipt: &serde_json::Value) -> Result<TokenId, ChainError> {
    let topic = receipt
        .get("logs")
        .and_then(|logs| logs.get(0))
        .and_then(|log| log.get("topics"))
        .and_then(|topics| topics.get(3))
        .and_then(|t| t.as_str())
        .ok_or_else(|| ChainError::CallFailed {
            stage: ChainStage::Receipt,
            reason: "receipt carries no mint event".to_string(),
        })?;
    let value = u64::from_str_radix(topic.trim_start_matches("0x"), 16).map_err(|e| {
        ChainError::CallFailed {
            stage: ChainStage::Receipt,
            reason: format!("malformed token id topic {topic}: {e}"),
        }
    })?;
    TokenId::new(value.to_string()).map_err(|e| ChainError::Config(e.to_string()))
}
