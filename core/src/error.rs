use num_bigint::BigUint;
use shroud_privacy::{Commitment, NullifierHash, PrivacyError};
use shroud_wire::{H256, WireError};
use thiserror::Error;

/// Errors raised by the withdrawal client
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Privacy(#[from] PrivacyError),

    // ========================================================================
    // RPC layer
    // ========================================================================
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("HTTP {status}: {body}")]
    TransportError { status: u16, body: String },

    #[error("RPC error {code}: {message}")]
    RpcError { code: i64, message: String },

    #[error("contract call returned {len} bytes, expected a 32-byte word")]
    MalformedCallResult { len: usize },

    // ========================================================================
    // Event sync and tree validation
    // ========================================================================
    #[error("malformed deposit event: {0}")]
    MalformedEvent(String),

    #[error("deposit events are not contiguous, expected leaf index {expected_index}")]
    DiscontinuousLeafSequence { expected_index: u32 },

    #[error("rebuilt root {root} is not known to the contract")]
    StaleOrCorruptTree { root: H256 },

    #[error("note already spent (nullifier hash {nullifier_hash})")]
    NoteAlreadySpent { nullifier_hash: NullifierHash },

    #[error("commitment {commitment} not found among synced deposits")]
    CommitmentNotFound { commitment: Commitment },

    // ========================================================================
    // Proving and submission
    // ========================================================================
    #[error("proof generation failed: {cause}")]
    ProofGenerationFailed { cause: String },

    #[error("transaction {tx_hash} reverted")]
    TransactionReverted { tx_hash: H256 },

    #[error("unknown denomination '{0}'")]
    UnknownDenomination(String),

    // ========================================================================
    // Relayer protocol
    // ========================================================================
    #[error("relayer rejected submission with HTTP {status}: {body}")]
    RelayerSubmissionFailed { status: u16, body: String },

    #[error("relayer protocol violation: {0}")]
    RelayerProtocolViolation(String),

    #[error("relayer job {job_id} failed")]
    RelayerJobFailed { job_id: String },

    #[error("relayer job {job_id} still pending after {attempts} polls")]
    RelayerPollExhausted { job_id: String, attempts: u32 },

    #[error("relayer fee {fee} is not below the denomination {denomination}")]
    FeeExceedsDenomination { fee: BigUint, denomination: BigUint },

    #[error("no viable relayer among {candidates} candidates")]
    NoViableRelayer { candidates: usize },

    // ========================================================================
    // Local
    // ========================================================================
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
