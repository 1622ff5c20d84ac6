//! Tree reconstruction and on-chain validation
//!
//! The tree is rebuilt from scratch for every withdrawal attempt and trusted
//! only after the contract confirms two facts, checked in this order:
//!
//! ```text
//! isKnownRoot(root)          false ⇒ StaleOrCorruptTree
//! isSpent(nullifierHash)     true  ⇒ NoteAlreadySpent
//! commitment ∈ leaves        no    ⇒ CommitmentNotFound
//! ```

use log::info;
use shroud_privacy::{DerivedNote, MerklePath, MerkleTree};
use shroud_wire::{Address, H256};

use crate::error::{Error, Result};
use crate::events::DepositEvent;
use crate::rpc::RpcClient;

/// Inclusion path of a note's commitment in a root the contract accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub root: H256,
    pub path: MerklePath,
    pub leaf_index: u32,
}

/// Build the tree over `events` ordered by leaf index
pub fn build_tree(events: &[DepositEvent]) -> Result<MerkleTree> {
    let mut sorted: Vec<&DepositEvent> = events.iter().collect();
    sorted.sort_by_key(|e| e.leaf_index);
    let leaves: Vec<H256> = sorted.iter().map(|e| *e.commitment.as_h256()).collect();
    Ok(MerkleTree::from_leaves(&leaves)?)
}

pub async fn resolve_path(
    events: &[DepositEvent],
    note: &DerivedNote,
    contract: &Address,
    rpc: &RpcClient,
) -> Result<ResolvedPath> {
    let tree = build_tree(events)?;
    let root = tree.root();
    info!("rebuilt tree with {} leaves, root {}", tree.len(), root);

    if !rpc.is_known_root(contract, &root).await? {
        return Err(Error::StaleOrCorruptTree { root });
    }
    if rpc.is_spent(contract, note.nullifier_hash.as_h256()).await? {
        return Err(Error::NoteAlreadySpent {
            nullifier_hash: note.nullifier_hash,
        });
    }

    let leaf_index = tree
        .index_of(&note.commitment)
        .ok_or(Error::CommitmentNotFound {
            commitment: note.commitment,
        })?;
    let path = tree.path(leaf_index)?;

    Ok(ResolvedPath {
        root,
        path,
        leaf_index,
    })
}
