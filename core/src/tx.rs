//! Transaction lifecycle
//!
//! ```text
//! TxRequest ──prepare──▶ UnsignedTransaction ──Signer──▶ SignedTransaction
//!                                                            │
//!                                            eth_sendRawTransaction
//!                                                            │
//!                                  poll eth_getTransactionReceipt every 250ms
//!                                                            │
//!                                      Success ⇒ receipt, Failure ⇒ TransactionReverted
//! ```
//!
//! Keys never live in this process. Signing is delegated to a [`Signer`],
//! normally a node or wallet daemon answering `eth_signTransaction`.

use async_trait::async_trait;
use log::{debug, info, warn};
use num_bigint::BigUint;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::{Duration, Instant};

use shroud_wire::{
    Address, Bytes, H256, ReceiptStatus, TransactionReceipt, decode_bytes, decode_h256,
    encode_address, encode_bytes, encode_quantity, encode_u64,
};

use crate::abi::keccak256;
use crate::error::{Error, Result};
use crate::rpc::{CallRequest, RpcClient};

/// Default priority fee: 3 gwei
pub const DEFAULT_PRIORITY_FEE_WEI: u64 = 3_000_000_000;

/// Default receipt polling interval
pub const DEFAULT_RECEIPT_INTERVAL: Duration = Duration::from_millis(250);

// ============================================================================
// Transaction records
// ============================================================================

/// What the caller wants executed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub from: Address,
    pub to: Address,
    pub value: BigUint,
    pub data: Bytes,
}

/// Caller-supplied fee fields; anything left `None` is queried
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeeOverrides {
    pub max_fee_per_gas: Option<BigUint>,
    pub max_priority_fee_per_gas: Option<BigUint>,
    pub gas_limit: Option<u64>,
}

/// Type 2 (fee market) transaction, ready for signing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub chain_id: u64,
    pub nonce: u64,
    pub max_fee_per_gas: BigUint,
    pub max_priority_fee_per_gas: BigUint,
    pub gas_limit: u64,
    pub from: Address,
    pub to: Address,
    pub value: BigUint,
    pub data: Bytes,
}

impl UnsignedTransaction {
    /// `eth_signTransaction` parameter object
    pub fn to_json(&self) -> Value {
        json!({
            "type": "0x2",
            "chainId": encode_u64(self.chain_id),
            "nonce": encode_u64(self.nonce),
            "from": encode_address(&self.from),
            "to": encode_address(&self.to),
            "gas": encode_u64(self.gas_limit),
            "maxFeePerGas": encode_quantity(&self.max_fee_per_gas),
            "maxPriorityFeePerGas": encode_quantity(&self.max_priority_fee_per_gas),
            "value": encode_quantity(&self.value),
            "data": encode_bytes(self.data.as_slice()),
            "accessList": [],
        })
    }
}

/// Signed transaction bytes and the hash they commit to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub raw: Bytes,
    pub hash: H256,
}

impl SignedTransaction {
    pub fn from_raw(raw: Bytes) -> Self {
        let hash = keccak256(raw.as_slice());
        Self { raw, hash }
    }
}

/// `max_fee = base_fee * 1.25 + priority`
pub fn max_fee_per_gas(base_fee: &BigUint, priority_fee: &BigUint) -> BigUint {
    base_fee * 125u32 / 100u32 + priority_fee
}

// ============================================================================
// Signer
// ============================================================================

#[async_trait]
pub trait Signer: Send + Sync {
    async fn sign(&self, tx: &UnsignedTransaction) -> Result<SignedTransaction>;
}

/// Signer backed by a JSON-RPC endpoint holding the account key
pub struct RemoteSigner {
    rpc: RpcClient,
}

impl RemoteSigner {
    pub fn new(rpc: RpcClient) -> Self {
        Self { rpc }
    }
}

/// Accepts either a bare raw transaction or geth's `{raw, tx: {hash}}`
fn parse_signer_result(result: &Value) -> Result<SignedTransaction> {
    let (raw, reported) = match result {
        Value::Object(object) => {
            let raw = object.get("raw").ok_or_else(|| {
                Error::Wire(shroud_wire::WireError::MissingField {
                    field: "raw".into(),
                })
            })?;
            let reported = match object.get("tx").and_then(|tx| tx.get("hash")) {
                Some(hash) => Some(decode_h256(hash)?),
                None => None,
            };
            (decode_bytes(raw)?, reported)
        }
        other => (decode_bytes(other)?, None),
    };

    let signed = SignedTransaction::from_raw(raw);
    if let Some(reported) = reported {
        if reported != signed.hash {
            warn!(
                "signer reported hash {} but raw transaction hashes to {}",
                reported, signed.hash
            );
        }
    }
    Ok(signed)
}

#[async_trait]
impl Signer for RemoteSigner {
    async fn sign(&self, tx: &UnsignedTransaction) -> Result<SignedTransaction> {
        debug!("signing nonce {} from {}", tx.nonce, tx.from);
        let result = self
            .rpc
            .request("eth_signTransaction", json!([tx.to_json()]))
            .await?;
        parse_signer_result(&result)
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Hash of a submitted transaction and its receipt, if one arrived in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutcome {
    pub tx_hash: H256,
    pub receipt: Option<TransactionReceipt>,
}

pub struct TransactionLifecycle {
    rpc: Arc<RpcClient>,
    signer: Arc<dyn Signer>,
    chain_id: u64,
    priority_fee: BigUint,
    receipt_interval: Duration,
}

impl TransactionLifecycle {
    pub fn new(rpc: Arc<RpcClient>, signer: Arc<dyn Signer>, chain_id: u64) -> Self {
        Self {
            rpc,
            signer,
            chain_id,
            priority_fee: BigUint::from(DEFAULT_PRIORITY_FEE_WEI),
            receipt_interval: DEFAULT_RECEIPT_INTERVAL,
        }
    }

    pub fn with_priority_fee(mut self, priority_fee: BigUint) -> Self {
        self.priority_fee = priority_fee;
        self
    }

    pub fn with_receipt_interval(mut self, interval: Duration) -> Self {
        self.receipt_interval = interval;
        self
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    pub async fn prepare(
        &self,
        request: &TxRequest,
        fees: &FeeOverrides,
    ) -> Result<UnsignedTransaction> {
        let nonce = self.rpc.transaction_count(&request.from).await?;

        let gas_limit = match fees.gas_limit {
            Some(limit) => limit,
            None => self.rpc.estimate_gas(&call_request(request)).await?,
        };

        let priority = fees
            .max_priority_fee_per_gas
            .clone()
            .unwrap_or_else(|| self.priority_fee.clone());
        let max_fee = match &fees.max_fee_per_gas {
            Some(max_fee) => max_fee.clone(),
            None => {
                let base_fee = self.rpc.latest_block().await?.base_fee_per_gas;
                max_fee_per_gas(&base_fee, &priority)
            }
        };
        // nodes reject a priority fee above the fee cap
        let priority = if priority > max_fee {
            warn!(
                "priority fee {} exceeds max fee {}, capping it",
                priority, max_fee
            );
            max_fee.clone()
        } else {
            priority
        };

        Ok(UnsignedTransaction {
            chain_id: self.chain_id,
            nonce,
            max_fee_per_gas: max_fee,
            max_priority_fee_per_gas: priority,
            gas_limit,
            from: request.from,
            to: request.to,
            value: request.value.clone(),
            data: request.data.clone(),
        })
    }

    /// Sign and broadcast; returns the hash reported by the node
    pub async fn submit(&self, tx: &UnsignedTransaction) -> Result<H256> {
        let signed = self.signer.sign(tx).await?;
        let tx_hash = self.rpc.send_raw_transaction(&signed.raw).await?;
        if tx_hash != signed.hash {
            warn!(
                "node returned hash {} for transaction signed as {}",
                tx_hash, signed.hash
            );
        }
        info!("submitted transaction {} (nonce {})", tx_hash, tx.nonce);
        Ok(tx_hash)
    }

    /// Poll for the receipt; `Ok(None)` once `timeout` elapses without one
    pub async fn wait_for_receipt(
        &self,
        tx_hash: &H256,
        timeout: Option<Duration>,
    ) -> Result<Option<TransactionReceipt>> {
        let start = Instant::now();
        loop {
            if let Some(receipt) = self.rpc.transaction_receipt(tx_hash).await? {
                debug!(
                    "receipt for {} in block {}",
                    tx_hash, receipt.block_number
                );
                return Ok(Some(receipt));
            }
            if timeout.is_some_and(|limit| start.elapsed() >= limit) {
                info!("no receipt for {} after {:?}", tx_hash, start.elapsed());
                return Ok(None);
            }
            tokio::time::sleep(self.receipt_interval).await;
        }
    }

    pub fn confirm(&self, receipt: TransactionReceipt) -> Result<TransactionReceipt> {
        match receipt.status {
            ReceiptStatus::Success => Ok(receipt),
            ReceiptStatus::Failure => Err(Error::TransactionReverted {
                tx_hash: receipt.transaction_hash,
            }),
        }
    }

    /// Prepare, sign, submit, and wait for confirmation
    pub async fn execute(
        &self,
        request: &TxRequest,
        fees: &FeeOverrides,
        timeout: Option<Duration>,
    ) -> Result<TxOutcome> {
        let tx = self.prepare(request, fees).await?;
        let tx_hash = self.submit(&tx).await?;
        let receipt = match self.wait_for_receipt(&tx_hash, timeout).await? {
            Some(receipt) => Some(self.confirm(receipt)?),
            None => None,
        };
        Ok(TxOutcome { tx_hash, receipt })
    }

    /// Run `request` through `eth_call` without broadcasting anything
    pub async fn simulate(&self, request: &TxRequest) -> Result<Bytes> {
        self.rpc.call(&call_request(request)).await
    }
}

fn call_request(request: &TxRequest) -> CallRequest {
    CallRequest {
        from: Some(request.from),
        to: request.to,
        value: Some(request.value.clone()),
        data: request.data.clone(),
        gas: None,
    }
}
