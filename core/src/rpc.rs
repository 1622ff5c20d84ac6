//! JSON-RPC client
//!
//! One method per remote call. Each call sends exactly one request and
//! decodes the result through the wire codec; nothing is retried here.

use log::debug;
use num_bigint::BigUint;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use shroud_wire::{
    Address, Block, BlockTag, Bytes, H256, Log, RpcResponse, TransactionReceipt, decode_block,
    decode_bytes, decode_h256, decode_logs, decode_quantity, decode_receipt, decode_rpc_response,
    decode_u64, encode_address, encode_block_tag, encode_bytes, encode_h256, encode_quantity,
    encode_u64,
};

use crate::abi;
use crate::error::{Error, Result};
use crate::transport::HttpTransport;

/// Parameters of `eth_call` / `eth_estimateGas`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallRequest {
    pub from: Option<Address>,
    pub to: Address,
    pub value: Option<BigUint>,
    pub data: Bytes,
    pub gas: Option<u64>,
}

impl CallRequest {
    pub fn new(to: Address, data: Bytes) -> Self {
        Self {
            to,
            data,
            ..Self::default()
        }
    }

    fn to_json(&self) -> Value {
        let mut object = serde_json::Map::new();
        if let Some(from) = &self.from {
            object.insert("from".into(), json!(encode_address(from)));
        }
        object.insert("to".into(), json!(encode_address(&self.to)));
        if let Some(value) = &self.value {
            object.insert("value".into(), json!(encode_quantity(value)));
        }
        if let Some(gas) = self.gas {
            object.insert("gas".into(), json!(encode_u64(gas)));
        }
        object.insert("data".into(), json!(encode_bytes(self.data.as_slice())));
        Value::Object(object)
    }
}

/// `eth_getLogs` filter over an inclusive block range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    pub from_block: u64,
    pub to_block: BlockTag,
    pub address: Address,
    pub topics: Vec<H256>,
}

pub struct RpcClient {
    url: String,
    transport: Arc<dyn HttpTransport>,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(url: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            url: url.into(),
            transport,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue one request and return its `result`
    pub async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!("rpc #{} {}", id, method);

        let response = self
            .transport
            .post_json(&self.url, &body)
            .await?
            .require_success()?;
        match decode_rpc_response(&response.json()?)? {
            RpcResponse::Result(result) => Ok(result),
            RpcResponse::Error { code, message } => Err(Error::RpcError { code, message }),
        }
    }

    pub async fn latest_block(&self) -> Result<Block> {
        let result = self
            .request("eth_getBlockByNumber", json!(["latest", false]))
            .await?;
        Ok(decode_block(&result)?)
    }

    pub async fn chain_id(&self) -> Result<u64> {
        let result = self.request("eth_chainId", json!([])).await?;
        Ok(decode_u64(&result)?)
    }

    pub async fn balance(&self, address: &Address) -> Result<BigUint> {
        let result = self
            .request("eth_getBalance", json!([encode_address(address), "latest"]))
            .await?;
        Ok(decode_quantity(&result)?)
    }

    /// Next nonce for `address`, counting pending transactions
    pub async fn transaction_count(&self, address: &Address) -> Result<u64> {
        let result = self
            .request(
                "eth_getTransactionCount",
                json!([encode_address(address), "pending"]),
            )
            .await?;
        Ok(decode_u64(&result)?)
    }

    pub async fn transaction_receipt(&self, hash: &H256) -> Result<Option<TransactionReceipt>> {
        let result = self
            .request("eth_getTransactionReceipt", json!([encode_h256(hash)]))
            .await?;
        Ok(decode_receipt(&result)?)
    }

    pub async fn call(&self, request: &CallRequest) -> Result<Bytes> {
        let result = self
            .request("eth_call", json!([request.to_json(), "latest"]))
            .await?;
        Ok(decode_bytes(&result)?)
    }

    pub async fn estimate_gas(&self, request: &CallRequest) -> Result<u64> {
        let result = self
            .request("eth_estimateGas", json!([request.to_json()]))
            .await?;
        Ok(decode_u64(&result)?)
    }

    pub async fn send_raw_transaction(&self, raw: &Bytes) -> Result<H256> {
        let result = self
            .request(
                "eth_sendRawTransaction",
                json!([encode_bytes(raw.as_slice())]),
            )
            .await?;
        Ok(decode_h256(&result)?)
    }

    pub async fn logs(&self, filter: &LogFilter) -> Result<Vec<Log>> {
        let topics: Vec<String> = filter.topics.iter().map(encode_h256).collect();
        let params = json!([{
            "fromBlock": encode_u64(filter.from_block),
            "toBlock": encode_block_tag(filter.to_block),
            "address": encode_address(&filter.address),
            "topics": topics,
        }]);
        let result = self.request("eth_getLogs", params).await?;
        Ok(decode_logs(&result)?)
    }

    // ========================================================================
    // Pool contract reads
    // ========================================================================

    pub async fn is_known_root(&self, contract: &Address, root: &H256) -> Result<bool> {
        let output = self
            .call(&CallRequest::new(*contract, abi::encode_is_known_root(root)))
            .await?;
        abi::decode_is_known_root(&output)
    }

    pub async fn is_spent(&self, contract: &Address, nullifier_hash: &H256) -> Result<bool> {
        let output = self
            .call(&CallRequest::new(*contract, abi::encode_is_spent(nullifier_hash)))
            .await?;
        abi::decode_is_spent(&output)
    }
}
