//! Executing compiled sessions against an Ethereum JSON-RPC node.
//!
//! Each evaluation deploys the synthesized contract and calls its entry
//! point with `eth_call`, so a mutating entry point is simulated rather than
//! mined. Session state lives in the source, not on chain.

use crate::abi::{self, AbiError};
use crate::value::Value;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value as Json};
use solrepl_synth::CompiledArtifact;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("cannot reach node: {0}")]
    Http(#[from] reqwest::Error),
    #[error("node error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("malformed response to {method}: {detail}")]
    Malformed { method: String, detail: String },
    #[error("node has no unlocked accounts; configure a signer")]
    NoAccounts,
    #[error("contract '{0}' has no zero-argument function '{1}'")]
    MissingEntryPoint(String, String),
    #[error("deployment {0} reverted")]
    DeployReverted(String),
    #[error("no receipt for {tx} after {waited:?}")]
    ReceiptTimeout { tx: String, waited: Duration },
    #[error("invalid hex from node: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error(transparent)]
    Abi(#[from] AbiError),
}

/// Runs a compiled entry point and yields its decoded return value.
pub trait ExecutionService {
    type Error: std::error::Error;

    /// `Ok(None)` when the entry point returns nothing.
    fn execute(
        &self,
        artifact: &CompiledArtifact,
        entry_point: &str,
    ) -> Result<Option<Value>, Self::Error>;
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// One JSON-RPC round trip. Returns the `result` member.
pub trait Transport {
    fn request(&self, method: &str, params: Json) -> Result<Json, ExecError>;
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Json>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// JSON-RPC over HTTP.
pub struct HttpTransport {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ExecError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for HttpTransport {
    fn request(&self, method: &str, params: Json) -> Result<Json, ExecError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(method, id, url = %self.url, "rpc request");

        let response: RpcResponse = self
            .client
            .post(&self.url)
            .json(&body)
            .send()?
            .error_for_status()?
            .json()?;

        if let Some(err) = response.error {
            return Err(ExecError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        Ok(response.result.unwrap_or(Json::Null))
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Node-side settings for [`RpcExecutor`].
#[derive(Debug, Clone)]
pub struct RpcOptions {
    /// Sending account. Falls back to the node's first account.
    pub signer: Option<String>,
    pub gas: u64,
    pub poll_interval: Duration,
    pub receipt_timeout: Duration,
}

impl Default for RpcOptions {
    fn default() -> Self {
        Self {
            signer: None,
            gas: 6_000_000,
            poll_interval: Duration::from_millis(100),
            receipt_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Receipt {
    #[serde(default)]
    contract_address: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

pub struct RpcExecutor<T = HttpTransport> {
    transport: T,
    options: RpcOptions,
}

impl RpcExecutor<HttpTransport> {
    pub fn connect(url: &str, timeout: Duration, options: RpcOptions) -> Result<Self, ExecError> {
        Ok(Self::new(HttpTransport::new(url, timeout)?, options))
    }
}

impl<T: Transport> RpcExecutor<T> {
    pub fn new(transport: T, options: RpcOptions) -> Self {
        Self { transport, options }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn call<R: DeserializeOwned>(&self, method: &str, params: Json) -> Result<R, ExecError> {
        let result = self.transport.request(method, params)?;
        serde_json::from_value(result).map_err(|e| ExecError::Malformed {
            method: method.to_string(),
            detail: e.to_string(),
        })
    }

    fn sender(&self) -> Result<String, ExecError> {
        if let Some(ref signer) = self.options.signer {
            return Ok(signer.clone());
        }
        let accounts: Vec<String> = self.call("eth_accounts", json!([]))?;
        accounts.into_iter().next().ok_or(ExecError::NoAccounts)
    }

    /// Deploy `artifact` and return the new contract's address.
    pub fn deploy(&self, artifact: &CompiledArtifact, from: &str) -> Result<String, ExecError> {
        let tx: String = self.call(
            "eth_sendTransaction",
            json!([{
                "from": from,
                "data": format!("0x{}", artifact.bytecode),
                "gas": format!("0x{:x}", self.options.gas),
            }]),
        )?;
        debug!(contract = %artifact.name, %tx, "deployment sent");

        let started = Instant::now();
        loop {
            let receipt: Option<Receipt> = self.call("eth_getTransactionReceipt", json!([tx]))?;
            if let Some(receipt) = receipt {
                if receipt.status.as_deref() == Some("0x0") {
                    return Err(ExecError::DeployReverted(tx));
                }
                return receipt
                    .contract_address
                    .ok_or(ExecError::DeployReverted(tx));
            }
            let waited = started.elapsed();
            if waited >= self.options.receipt_timeout {
                return Err(ExecError::ReceiptTimeout { tx, waited });
            }
            std::thread::sleep(self.options.poll_interval);
        }
    }
}

impl<T: Transport> ExecutionService for RpcExecutor<T> {
    type Error = ExecError;

    fn execute(
        &self,
        artifact: &CompiledArtifact,
        entry_point: &str,
    ) -> Result<Option<Value>, ExecError> {
        let missing =
            || ExecError::MissingEntryPoint(artifact.name.clone(), entry_point.to_string());
        let entry = artifact.function(entry_point).ok_or_else(missing)?;
        let selector = artifact.selector(entry_point).ok_or_else(missing)?;

        let from = self.sender()?;
        let address = self.deploy(artifact, &from)?;
        debug!(%address, selector, "calling entry point");

        let data: String = self.call(
            "eth_call",
            json!([
                { "from": from, "to": address, "data": format!("0x{}", selector) },
                "latest"
            ]),
        )?;
        let bytes = hex::decode(data.trim_start_matches("0x"))?;
        Ok(abi::decode_outputs(&entry.outputs, &bytes)?)
    }
}
