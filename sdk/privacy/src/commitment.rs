//! Note Commitments
//!
//! ```text
//! Commitment = Pedersen(nullifier_le || secret_le)
//! ```
//!
//! The commitment is the tree leaf published by the deposit. It hides the
//! note while letting the withdrawal prove knowledge of its preimage.

use serde::{Deserialize, Serialize};
use shroud_wire::H256;
use std::fmt;

use crate::nullifier::NullifierHash;

/// A note commitment (32-byte big-endian field element)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commitment(pub H256);

impl Commitment {
    pub fn as_h256(&self) -> &H256 {
        &self.0
    }
}

impl From<H256> for Commitment {
    fn from(value: H256) -> Self {
        Self(value)
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Public values derived from a note by the external hasher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedNote {
    pub commitment: Commitment,
    pub nullifier_hash: NullifierHash,
}
