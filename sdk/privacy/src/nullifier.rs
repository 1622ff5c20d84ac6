//! Nullifier hashes
//!
//! ```text
//! NullifierHash = Pedersen(nullifier_le)
//! ```
//!
//! Published with the withdrawal. Once the contract records it, the note
//! behind it cannot be spent again.

use serde::{Deserialize, Serialize};
use shroud_wire::H256;
use std::fmt;

/// Hash of a note's nullifier (32 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NullifierHash(pub H256);

impl NullifierHash {
    pub fn as_h256(&self) -> &H256 {
        &self.0
    }
}

impl From<H256> for NullifierHash {
    fn from(value: H256) -> Self {
        Self(value)
    }
}

impl fmt::Display for NullifierHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
