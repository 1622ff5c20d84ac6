//! Shroud Wire Codec
//!
//! Typed conversion between native values and the `0x`-prefixed hex format
//! spoken by Ethereum JSON-RPC nodes and withdrawal relayers.
//!
//! ```text
//!   native value ──encode──▶ "0x…" ──(JSON-RPC / relayer HTTP)──▶ node
//!   native value ◀─decode─── "0x…" ◀──────────────────────────────
//! ```
//!
//! Decoding is strict: shapes are validated before anything is interpreted
//! and a bad value is reported with the offending text, never coerced.

pub mod codec;
pub mod error;
pub mod objects;
pub mod primitives;
pub mod units;

pub use codec::{
    decode_address, decode_bytes, decode_h256, decode_quantity, decode_u64, encode_address,
    encode_block_tag, encode_bytes, encode_h256, encode_quantity, encode_u64, parse_address,
    parse_bytes, parse_h256, parse_quantity,
};
pub use error::{Result, WireError};
pub use objects::{
    Block, JobStatus, JobStatusReport, Log, ReceiptStatus, RelayerStatus, RpcResponse,
    TransactionReceipt, decode_block, decode_job_status, decode_job_submission, decode_log,
    decode_logs, decode_receipt, decode_relayer_status, decode_rpc_response,
};
pub use primitives::{Address, BlockTag, Bytes, H256};
pub use units::{ETHER, GWEI, format_units, parse_units};
