//! Deposit events
//!
//! ```text
//! eth_getLogs ──▶ Log ──decode──▶ DepositEvent ──validate──▶ EventStore
//!                                                   │
//!                                 leafIndex = 0, 1, 2, … with no gaps
//! ```

mod store;
mod sync;

pub use store::{EventStore, FileEventStore, MemoryEventStore, cache_file_name};
pub use sync::{EventSynchronizer, first_discontinuity};

use serde::{Deserialize, Serialize};
use shroud_privacy::Commitment;
use shroud_wire::{H256, Log};

use crate::abi::{DEPOSIT_EVENT_TOPIC, decode_deposit_log};
use crate::error::{Error, Result};

/// One on-chain deposit into a pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositEvent {
    pub block_number: u64,
    pub transaction_hash: H256,
    pub commitment: Commitment,
    pub leaf_index: u32,
    pub timestamp: u64,
}

impl DepositEvent {
    /// Decode a `Deposit(bytes32 indexed, uint32, uint256)` log
    pub fn from_log(log: &Log) -> Result<Self> {
        if log.topics.first() != Some(&DEPOSIT_EVENT_TOPIC) {
            return Err(Error::MalformedEvent(format!(
                "log in tx {} is not a Deposit event",
                log.transaction_hash
            )));
        }
        let decoded = decode_deposit_log(&log.topics, log.data.as_slice()).map_err(|e| {
            Error::MalformedEvent(format!("Deposit in tx {}: {}", log.transaction_hash, e))
        })?;
        let timestamp = u64::try_from(decoded.timestamp).map_err(|_| {
            Error::MalformedEvent(format!("timestamp overflows u64 in tx {}", log.transaction_hash))
        })?;

        Ok(Self {
            block_number: log.block_number,
            transaction_hash: log.transaction_hash,
            commitment: Commitment(decoded.commitment),
            leaf_index: decoded.leaf_index,
            timestamp,
        })
    }
}

/// Persisted deposits of one denomination plus the highest block already scanned
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCache {
    pub last_block: Option<u64>,
    pub events: Vec<DepositEvent>,
}
