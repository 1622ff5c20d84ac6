//! Structured wire objects
//!
//! Every decoder runs in two passes: first it checks that all expected fields
//! are present with the right primitive shape, then it interprets them. A
//! half-valid object never yields a partially filled struct.

use num_bigint::BigUint;
use serde_json::{Map, Value};

use crate::codec::{decode_address, decode_bytes, decode_h256, decode_quantity, decode_u64};
use crate::error::{Result, WireError};
use crate::primitives::{Address, Bytes, H256};

// ============================================================================
// Shape checking
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Shape {
    Hex,
    HexOrNull,
    HexArray,
    Number,
    Text,
}

impl Shape {
    fn describe(self) -> &'static str {
        match self {
            Shape::Hex => "hex string",
            Shape::HexOrNull => "hex string or null",
            Shape::HexArray => "array of hex strings",
            Shape::Number => "number",
            Shape::Text => "string",
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            Shape::Hex => is_hex(value),
            Shape::HexOrNull => value.is_null() || is_hex(value),
            Shape::HexArray => value
                .as_array()
                .is_some_and(|items| items.iter().all(is_hex)),
            Shape::Number => value.is_number(),
            Shape::Text => value.is_string(),
        }
    }
}

fn is_hex(value: &Value) -> bool {
    value
        .as_str()
        .and_then(|s| s.strip_prefix("0x"))
        .is_some_and(|digits| digits.bytes().all(|b| b.is_ascii_hexdigit()))
}

fn as_object(value: &Value) -> Result<&Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| WireError::malformed(value.to_string()))
}

fn check_fields(object: &Map<String, Value>, fields: &[(&str, Shape)]) -> Result<()> {
    for (name, shape) in fields {
        let value = object.get(*name).ok_or_else(|| WireError::MissingField {
            field: name.to_string(),
        })?;
        if !shape.matches(value) {
            return Err(WireError::WrongFieldType {
                field: name.to_string(),
                expected: shape.describe(),
            });
        }
    }
    Ok(())
}

fn nullable_address(value: &Value) -> Result<Option<Address>> {
    if value.is_null() {
        Ok(None)
    } else {
        decode_address(value).map(Some)
    }
}

// ============================================================================
// Blocks
// ============================================================================

/// Block header fields the client relies on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub parent_hash: H256,
    pub number: u64,
    pub timestamp: u64,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub base_fee_per_gas: BigUint,
}

const BLOCK_FIELDS: &[(&str, Shape)] = &[
    ("parentHash", Shape::Hex),
    ("sha3Uncles", Shape::Hex),
    ("miner", Shape::Hex),
    ("stateRoot", Shape::Hex),
    ("transactionsRoot", Shape::Hex),
    ("receiptsRoot", Shape::Hex),
    ("logsBloom", Shape::Hex),
    ("difficulty", Shape::Hex),
    ("number", Shape::Hex),
    ("gasLimit", Shape::Hex),
    ("gasUsed", Shape::Hex),
    ("timestamp", Shape::Hex),
    ("extraData", Shape::Hex),
    ("mixHash", Shape::Hex),
    ("nonce", Shape::Hex),
    ("baseFeePerGas", Shape::Hex),
    ("transactions", Shape::HexArray),
    ("uncles", Shape::HexArray),
];

pub fn decode_block(value: &Value) -> Result<Block> {
    let block = as_object(value)?;
    check_fields(block, BLOCK_FIELDS)?;
    // Post-merge nodes drop totalDifficulty; when present it must still be hex.
    if let Some(td) = block.get("totalDifficulty") {
        if !Shape::Hex.matches(td) {
            return Err(WireError::WrongFieldType {
                field: "totalDifficulty".to_string(),
                expected: Shape::Hex.describe(),
            });
        }
    }

    Ok(Block {
        parent_hash: decode_h256(&block["parentHash"])?,
        number: decode_u64(&block["number"])?,
        timestamp: decode_u64(&block["timestamp"])?,
        gas_limit: decode_u64(&block["gasLimit"])?,
        gas_used: decode_u64(&block["gasUsed"])?,
        base_fee_per_gas: decode_quantity(&block["baseFeePerGas"])?,
    })
}

// ============================================================================
// Receipts
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub tx_type: u64,
    pub block_hash: H256,
    pub block_number: u64,
    pub transaction_hash: H256,
    pub transaction_index: u64,
    pub contract_address: Option<Address>,
    pub cumulative_gas_used: u64,
    pub gas_used: u64,
    pub from: Address,
    pub to: Option<Address>,
    pub status: ReceiptStatus,
}

impl TransactionReceipt {
    pub fn succeeded(&self) -> bool {
        self.status == ReceiptStatus::Success
    }
}

const RECEIPT_FIELDS: &[(&str, Shape)] = &[
    ("type", Shape::Hex),
    ("blockHash", Shape::Hex),
    ("blockNumber", Shape::Hex),
    ("transactionHash", Shape::Hex),
    ("transactionIndex", Shape::Hex),
    ("contractAddress", Shape::HexOrNull),
    ("cumulativeGasUsed", Shape::Hex),
    ("gasUsed", Shape::Hex),
    ("from", Shape::Hex),
    ("to", Shape::HexOrNull),
    ("status", Shape::Hex),
];

/// Decode a receipt; JSON `null` means "not mined yet"
pub fn decode_receipt(value: &Value) -> Result<Option<TransactionReceipt>> {
    if value.is_null() {
        return Ok(None);
    }
    let receipt = as_object(value)?;
    check_fields(receipt, RECEIPT_FIELDS)?;

    let status = if decode_quantity(&receipt["status"])? == BigUint::from(0u8) {
        ReceiptStatus::Failure
    } else {
        ReceiptStatus::Success
    };

    Ok(Some(TransactionReceipt {
        tx_type: decode_u64(&receipt["type"])?,
        block_hash: decode_h256(&receipt["blockHash"])?,
        block_number: decode_u64(&receipt["blockNumber"])?,
        transaction_hash: decode_h256(&receipt["transactionHash"])?,
        transaction_index: decode_u64(&receipt["transactionIndex"])?,
        contract_address: nullable_address(&receipt["contractAddress"])?,
        cumulative_gas_used: decode_u64(&receipt["cumulativeGasUsed"])?,
        gas_used: decode_u64(&receipt["gasUsed"])?,
        from: decode_address(&receipt["from"])?,
        to: nullable_address(&receipt["to"])?,
        status,
    }))
}

// ============================================================================
// Logs
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Log {
    pub block_hash: H256,
    pub block_number: u64,
    pub transaction_hash: H256,
    pub transaction_index: u64,
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: Bytes,
}

const LOG_FIELDS: &[(&str, Shape)] = &[
    ("blockHash", Shape::Hex),
    ("blockNumber", Shape::Hex),
    ("transactionHash", Shape::Hex),
    ("transactionIndex", Shape::Hex),
    ("address", Shape::Hex),
    ("topics", Shape::HexArray),
    ("data", Shape::Hex),
];

pub fn decode_log(value: &Value) -> Result<Log> {
    let log = as_object(value)?;
    check_fields(log, LOG_FIELDS)?;

    // shape check guarantees an array here
    let topics = log["topics"]
        .as_array()
        .map(|items| items.iter().map(decode_h256).collect::<Result<Vec<_>>>())
        .unwrap_or_else(|| Ok(Vec::new()))?;

    Ok(Log {
        block_hash: decode_h256(&log["blockHash"])?,
        block_number: decode_u64(&log["blockNumber"])?,
        transaction_hash: decode_h256(&log["transactionHash"])?,
        transaction_index: decode_u64(&log["transactionIndex"])?,
        address: decode_address(&log["address"])?,
        topics,
        data: decode_bytes(&log["data"])?,
    })
}

pub fn decode_logs(value: &Value) -> Result<Vec<Log>> {
    value
        .as_array()
        .ok_or_else(|| WireError::malformed(value.to_string()))?
        .iter()
        .map(decode_log)
        .collect()
}

// ============================================================================
// JSON-RPC envelope
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum RpcResponse {
    Result(Value),
    Error { code: i64, message: String },
}

pub fn decode_rpc_response(value: &Value) -> Result<RpcResponse> {
    let response = as_object(value)?;
    check_fields(response, &[("jsonrpc", Shape::Text)])?;
    if response["jsonrpc"] != "2.0" {
        return Err(WireError::malformed(response["jsonrpc"].to_string()));
    }
    if !response.contains_key("id") {
        return Err(WireError::MissingField {
            field: "id".to_string(),
        });
    }

    if let Some(result) = response.get("result") {
        return Ok(RpcResponse::Result(result.clone()));
    }

    let error = response
        .get("error")
        .ok_or_else(|| WireError::MissingField {
            field: "result".to_string(),
        })?;
    let error = error.as_object().ok_or_else(|| WireError::WrongFieldType {
        field: "error".to_string(),
        expected: "object",
    })?;
    check_fields(error, &[("code", Shape::Number), ("message", Shape::Text)])?;

    let code = error["code"].as_i64().ok_or_else(|| WireError::WrongFieldType {
        field: "code".to_string(),
        expected: "integer",
    })?;
    Ok(RpcResponse::Error {
        code,
        message: error["message"].as_str().unwrap_or_default().to_string(),
    })
}

// ============================================================================
// Relayer API
// ============================================================================

/// `GET /status` body
#[derive(Debug, Clone, PartialEq)]
pub struct RelayerStatus {
    /// Address that receives the relayer fee
    pub reward_account: Address,
    /// Service fee as a percentage of the denomination (0.05 = 0.05%)
    pub service_fee_percent: f64,
}

pub fn decode_relayer_status(value: &Value) -> Result<RelayerStatus> {
    let status = as_object(value)?;
    check_fields(
        status,
        &[("rewardAccount", Shape::Hex), ("tornadoServiceFee", Shape::Number)],
    )?;
    let fee = status["tornadoServiceFee"]
        .as_f64()
        .filter(|fee| fee.is_finite() && *fee >= 0.0)
        .ok_or_else(|| WireError::malformed(status["tornadoServiceFee"].to_string()))?;

    Ok(RelayerStatus {
        reward_account: decode_address(&status["rewardAccount"])?,
        service_fee_percent: fee,
    })
}

/// `POST /v1/tornadoWithdraw` body: the job id, returned as text whether the
/// relayer sends a string or a number
pub fn decode_job_submission(value: &Value) -> Result<String> {
    let body = as_object(value)?;
    match body.get("id") {
        None => Err(WireError::MissingField {
            field: "id".to_string(),
        }),
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        Some(_) => Err(WireError::WrongFieldType {
            field: "id".to_string(),
            expected: "non-empty string or number",
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Sent,
    Accepted,
    Mined,
    Confirmed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Confirmed | JobStatus::Failed)
    }
}

/// `GET /v1/jobs/{id}` body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatusReport {
    pub status: JobStatus,
    pub tx_hash: Option<H256>,
}

pub fn decode_job_status(value: &Value) -> Result<JobStatusReport> {
    let body = as_object(value)?;
    check_fields(body, &[("status", Shape::Text)])?;

    let status = match body["status"].as_str().unwrap_or_default() {
        "SENT" => JobStatus::Sent,
        "ACCEPTED" => JobStatus::Accepted,
        "MINED" => JobStatus::Mined,
        "CONFIRMED" => JobStatus::Confirmed,
        "FAILED" => JobStatus::Failed,
        other => return Err(WireError::malformed(other)),
    };

    // only a confirmed job is expected to carry a usable hash
    let tx_hash = match body.get("txHash") {
        None | Some(Value::Null) => None,
        Some(Value::String(hash)) if hash.is_empty() => None,
        Some(hash) if status == JobStatus::Confirmed => Some(decode_h256(hash)?),
        Some(hash) => decode_h256(hash).ok(),
    };

    Ok(JobStatusReport { status, tx_hash })
}
