//! MiMC sponge over the BN254 scalar field
//!
//! This is the Feistel MiMC permutation deployed as the pool contract's tree
//! hasher (circomlib `MiMCSponge`, 220 rounds, exponent 5). Roots computed
//! here must match the contract bit for bit, otherwise `isKnownRoot` rejects
//! every locally rebuilt tree.
//!
//! ```text
//! round i:   t = xL + k + c[i]
//!            (xL, xR) = (xR + t^5, xL)      for i < 219
//!            xR       = xR + t^5            for i = 219
//!
//! c[0] = c[219] = 0,  c[i] = keccak256^(i+1)("mimcsponge") mod p
//! ```
//!
//! Field elements travel as big-endian 32-byte words, the same layout the
//! contract uses for `bytes32` leaves.

use ark_bn254::Fr;
use ark_ff::{BigInteger, Field, PrimeField};
use sha3::{Digest, Keccak256};
use shroud_wire::H256;

use crate::error::{PrivacyError, Result};

/// Number of Feistel rounds
pub const MIMC_ROUNDS: usize = 220;

const CONSTANTS_SEED: &[u8] = b"mimcsponge";

/// MiMC sponge with precomputed round constants
#[derive(Debug, Clone)]
pub struct MimcSponge {
    round_constants: Vec<Fr>,
}

impl Default for MimcSponge {
    fn default() -> Self {
        Self::new()
    }
}

impl MimcSponge {
    pub fn new() -> Self {
        let mut round_constants = vec![Fr::from(0u64); MIMC_ROUNDS];
        let mut digest = keccak256(CONSTANTS_SEED);
        // first and last constants stay zero
        for constant in round_constants.iter_mut().take(MIMC_ROUNDS - 1).skip(1) {
            digest = keccak256(&digest);
            *constant = Fr::from_be_bytes_mod_order(&digest);
        }
        Self { round_constants }
    }

    /// One keyed permutation of the (xL, xR) state with key 0
    pub fn permute(&self, mut xl: Fr, mut xr: Fr) -> (Fr, Fr) {
        let last = self.round_constants.len() - 1;
        for (i, c) in self.round_constants.iter().enumerate() {
            let t = xl + c;
            let t5 = t.square().square() * t;
            if i < last {
                let next = xr + t5;
                xr = xl;
                xl = next;
            } else {
                xr += t5;
            }
        }
        (xl, xr)
    }

    /// Two-to-one hash used for tree nodes
    pub fn hash_left_right(&self, left: Fr, right: Fr) -> Fr {
        let (r, c) = self.permute(left, Fr::from(0u64));
        let (r, _) = self.permute(r + right, c);
        r
    }
}

/// Interpret a big-endian word as a field element, rejecting values >= p
pub fn h256_to_field(value: &H256) -> Result<Fr> {
    let element = Fr::from_be_bytes_mod_order(value.as_bytes());
    if field_to_h256(element) != *value {
        return Err(PrivacyError::NotInField { value: *value });
    }
    Ok(element)
}

/// Big-endian 32-byte encoding of a field element
pub fn field_to_h256(element: Fr) -> H256 {
    let bytes = element.into_bigint().to_bytes_be();
    let mut word = [0u8; 32];
    let len = bytes.len().min(32);
    word[32 - len..].copy_from_slice(&bytes[bytes.len() - len..]);
    H256(word)
}

pub(crate) fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Keccak256::digest(data));
    out
}
