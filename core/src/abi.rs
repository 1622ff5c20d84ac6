//! Calldata for the pool contract
//!
//! ```text
//! isKnownRoot(bytes32)                                          0x6d9833e3
//! isSpent(bytes32)                                              0xe5285dcc
//! deposit(bytes32)                                              0xb214faa5
//! withdraw(bytes,bytes32,bytes32,address,address,uint256,uint256) 0x21a0adb6
//! Deposit(bytes32 indexed,uint32,uint256)                       0xa945e51e…
//! ```

use alloy_primitives::{B256, U256};
use alloy_sol_types::{SolCall, SolEvent, sol};
use num_bigint::BigUint;
use shroud_wire::{Address, Bytes, H256};

use crate::error::{Error, Result};

sol! {
    interface ITornadoInstance {
        function isKnownRoot(bytes32 root) external view returns (bool);
        function isSpent(bytes32 nullifierHash) external view returns (bool);
        function deposit(bytes32 commitment) external payable;
        function withdraw(
            bytes proof,
            bytes32 root,
            bytes32 nullifierHash,
            address recipient,
            address relayer,
            uint256 fee,
            uint256 refund
        ) external payable;

        event Deposit(bytes32 indexed commitment, uint32 leafIndex, uint256 timestamp);
    }
}

use ITornadoInstance::{depositCall, isKnownRootCall, isSpentCall, withdrawCall};

pub const IS_KNOWN_ROOT: [u8; 4] = isKnownRootCall::SELECTOR;
pub const IS_SPENT: [u8; 4] = isSpentCall::SELECTOR;
pub const DEPOSIT: [u8; 4] = depositCall::SELECTOR;
pub const WITHDRAW: [u8; 4] = withdrawCall::SELECTOR;

/// topic0 of `Deposit(bytes32 indexed commitment, uint32 leafIndex, uint256 timestamp)`
pub const DEPOSIT_EVENT_TOPIC: H256 = H256(ITornadoInstance::Deposit::SIGNATURE_HASH.0);

pub fn keccak256(data: &[u8]) -> H256 {
    H256(alloy_primitives::keccak256(data).0)
}

fn word(value: &H256) -> B256 {
    B256::from(value.0)
}

fn address(value: &Address) -> alloy_primitives::Address {
    alloy_primitives::Address::from(value.0)
}

/// `None` if the value needs more than 256 bits
fn uint(value: &BigUint) -> Option<U256> {
    U256::try_from_be_slice(&value.to_bytes_be())
}

pub fn encode_is_known_root(root: &H256) -> Bytes {
    Bytes(isKnownRootCall { root: word(root) }.abi_encode())
}

pub fn encode_is_spent(nullifier_hash: &H256) -> Bytes {
    Bytes(
        isSpentCall {
            nullifierHash: word(nullifier_hash),
        }
        .abi_encode(),
    )
}

pub fn encode_deposit(commitment: &H256) -> Bytes {
    Bytes(
        depositCall {
            commitment: word(commitment),
        }
        .abi_encode(),
    )
}

/// Arguments of `withdraw` after the proof
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawCall<'a> {
    pub proof: &'a [u8],
    pub root: H256,
    pub nullifier_hash: H256,
    pub recipient: Address,
    pub relayer: Address,
    pub fee: &'a BigUint,
    pub refund: &'a BigUint,
}

/// `None` if fee or refund exceed 256 bits
pub fn encode_withdraw(call: &WithdrawCall<'_>) -> Option<Bytes> {
    let encoded = withdrawCall {
        proof: call.proof.to_vec().into(),
        root: word(&call.root),
        nullifierHash: word(&call.nullifier_hash),
        recipient: address(&call.recipient),
        relayer: address(&call.relayer),
        fee: uint(call.fee)?,
        refund: uint(call.refund)?,
    }
    .abi_encode();
    Some(Bytes(encoded))
}

pub fn decode_is_known_root(output: &Bytes) -> Result<bool> {
    isKnownRootCall::abi_decode_returns(output.as_slice())
        .map_err(|_| Error::MalformedCallResult { len: output.len() })
}

pub fn decode_is_spent(output: &Bytes) -> Result<bool> {
    isSpentCall::abi_decode_returns(output.as_slice())
        .map_err(|_| Error::MalformedCallResult { len: output.len() })
}

/// Fields of a decoded `Deposit` log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositLog {
    pub commitment: H256,
    pub leaf_index: u32,
    pub timestamp: U256,
}

/// Decode `Deposit` topics and data, rejecting values wider than their declared types
pub fn decode_deposit_log(
    topics: &[H256],
    data: &[u8],
) -> std::result::Result<DepositLog, alloy_sol_types::Error> {
    let decoded =
        ITornadoInstance::Deposit::decode_raw_log_validate(topics.iter().map(word), data)?;
    Ok(DepositLog {
        commitment: H256(decoded.commitment.0),
        leaf_index: decoded.leafIndex,
        timestamp: decoded.timestamp,
    })
}
