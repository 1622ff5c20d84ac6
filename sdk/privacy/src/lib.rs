//! Shroud Privacy SDK
//!
//! Note-based primitives for withdrawing from a fixed-denomination shielded pool.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Withdrawal                              │
//! │  ┌──────────────┐  ┌──────────────┐  ┌───────────────────────┐ │
//! │  │     Note     │  │  Commitment  │  │    Nullifier hash     │ │
//! │  │ (nullifier,  │  │ H(preimage)  │  │     H(nullifier)      │ │
//! │  │   secret)    │  │  tree leaf   │  │  published on spend   │ │
//! │  └──────────────┘  └──────────────┘  └───────────────────────┘ │
//! │         │                 │                     │               │
//! │         ▼                 ▼                     ▼               │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │        MiMC Merkle tree (depth 20, BN254 field)          │   │
//! │  │  • root must be known on-chain                           │   │
//! │  │  • path proves membership of the commitment              │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The pedersen hash that turns a preimage into a commitment is computed by an
//! external service; this crate only carries its outputs.

pub mod commitment;
pub mod error;
pub mod merkle;
pub mod mimc;
pub mod note;
pub mod nullifier;

pub use commitment::{Commitment, DerivedNote};
pub use error::{PrivacyError, Result};
pub use merkle::{MerkleHasher, MerklePath, MerkleTree, TREE_CAPACITY, TREE_DEPTH};
pub use mimc::{MimcSponge, field_to_h256, h256_to_field};
pub use note::{NOTE_PREFIX, Note};
pub use nullifier::NullifierHash;
