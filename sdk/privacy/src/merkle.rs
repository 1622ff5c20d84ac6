//! Merkle Tree for Note Commitments
//!
//! Fixed-depth append-only tree matching the pool contract. Leaves are
//! commitments ordered by their on-chain leaf index; unused capacity is padded
//! with precomputed empty-subtree roots.
//!
//! ```text
//!                    Root
//!                   /    \
//!                 H01    Z1        Z0 = keccak256("tornado") mod p
//!                /  \   /  \       Z(i+1) = H(Zi, Zi)
//!               C0  C1 Z0  Z0
//! ```

use ark_bn254::Fr;
use ark_ff::PrimeField;
use serde::{Deserialize, Serialize};
use shroud_wire::H256;

use crate::commitment::Commitment;
use crate::error::{PrivacyError, Result};
use crate::mimc::{MimcSponge, field_to_h256, h256_to_field, keccak256};

/// Tree depth (supports 2^20 deposits)
pub const TREE_DEPTH: usize = 20;

/// Maximum number of leaves
pub const TREE_CAPACITY: usize = 1 << TREE_DEPTH;

const ZERO_VALUE_SEED: &[u8] = b"tornado";

/// A Merkle path proving inclusion of a leaf
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerklePath {
    /// Sibling hashes from leaf to root
    pub siblings: [H256; TREE_DEPTH],
    /// Position bits (false = current node is left, true = right)
    pub path_bits: [bool; TREE_DEPTH],
    /// The leaf position
    pub position: u32,
}

impl MerklePath {
    /// Verify that this path proves inclusion of `leaf` in `root`
    pub fn verify(&self, leaf: &Commitment, root: &H256) -> bool {
        let hasher = MerkleHasher::new();
        match hasher.compute_root_from_path(leaf.as_h256(), &self.siblings, &self.path_bits) {
            Ok(computed) => computed == *root,
            Err(_) => false,
        }
    }
}

/// MiMC-based node hasher with the empty-subtree roots of every level
#[derive(Debug, Clone)]
pub struct MerkleHasher {
    sponge: MimcSponge,
    /// zeros[i] is the root of an empty subtree of height i
    zeros: Vec<Fr>,
}

impl MerkleHasher {
    pub fn new() -> Self {
        let sponge = MimcSponge::new();
        let mut zeros = Vec::with_capacity(TREE_DEPTH + 1);
        let mut current = Self::zero_leaf();
        zeros.push(current);
        for _ in 0..TREE_DEPTH {
            current = sponge.hash_left_right(current, current);
            zeros.push(current);
        }
        Self { sponge, zeros }
    }

    fn zero_leaf() -> Fr {
        Fr::from_be_bytes_mod_order(&keccak256(ZERO_VALUE_SEED))
    }

    pub fn hash_pair(&self, left: Fr, right: Fr) -> Fr {
        self.sponge.hash_left_right(left, right)
    }

    /// Empty-subtree root at `level` (0 = empty leaf)
    pub fn zero(&self, level: usize) -> H256 {
        field_to_h256(self.zeros[level])
    }

    /// Root of the empty tree
    pub fn empty_root(&self) -> H256 {
        self.zero(TREE_DEPTH)
    }

    /// Fold a leaf through its authentication path
    pub fn compute_root_from_path(
        &self,
        leaf: &H256,
        siblings: &[H256],
        path_bits: &[bool],
    ) -> Result<H256> {
        let mut current = h256_to_field(leaf)?;
        for (sibling, is_right) in siblings.iter().zip(path_bits.iter()) {
            let sibling = h256_to_field(sibling)?;
            current = if *is_right {
                self.hash_pair(sibling, current)
            } else {
                self.hash_pair(current, sibling)
            };
        }
        Ok(field_to_h256(current))
    }
}

impl Default for MerkleHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Densely built tree over an ordered leaf sequence
///
/// Only occupied nodes are stored; every level is the pairwise hash of the
/// level below, padded on the right with that level's zero value.
pub struct MerkleTree {
    /// layers[0] are the leaves, layers[TREE_DEPTH] holds the root
    layers: Vec<Vec<Fr>>,
    hasher: MerkleHasher,
}

impl MerkleTree {
    /// Build the tree from leaves given in leaf-index order
    pub fn from_leaves(leaves: &[H256]) -> Result<Self> {
        Self::with_hasher(MerkleHasher::new(), leaves)
    }

    pub fn with_hasher(hasher: MerkleHasher, leaves: &[H256]) -> Result<Self> {
        if leaves.len() > TREE_CAPACITY {
            return Err(PrivacyError::TreeFull {
                leaves: leaves.len(),
                capacity: TREE_CAPACITY,
            });
        }

        let mut layers = Vec::with_capacity(TREE_DEPTH + 1);
        layers.push(
            leaves
                .iter()
                .map(h256_to_field)
                .collect::<Result<Vec<_>>>()?,
        );

        for level in 0..TREE_DEPTH {
            let below = &layers[level];
            let zero = hasher.zeros[level];
            let above: Vec<Fr> = below
                .chunks(2)
                .map(|pair| hasher.hash_pair(pair[0], pair.get(1).copied().unwrap_or(zero)))
                .collect();
            layers.push(above);
        }

        Ok(Self { layers, hasher })
    }

    pub fn len(&self) -> usize {
        self.layers[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers[0].is_empty()
    }

    pub fn root(&self) -> H256 {
        self.layers[TREE_DEPTH]
            .first()
            .map(|root| field_to_h256(*root))
            .unwrap_or_else(|| self.hasher.empty_root())
    }

    /// Leaf index of the first leaf equal to `commitment`
    pub fn index_of(&self, commitment: &Commitment) -> Option<u32> {
        let target = h256_to_field(commitment.as_h256()).ok()?;
        self.layers[0]
            .iter()
            .position(|leaf| *leaf == target)
            .and_then(|index| u32::try_from(index).ok())
    }

    /// Get the Merkle path of the leaf at `index`
    pub fn path(&self, index: u32) -> Result<MerklePath> {
        let position = index as usize;
        if position >= self.len() {
            return Err(PrivacyError::LeafIndexOutOfRange {
                index,
                leaves: self.len(),
            });
        }

        let mut siblings = [H256::ZERO; TREE_DEPTH];
        let mut path_bits = [false; TREE_DEPTH];
        let mut current = position;

        for level in 0..TREE_DEPTH {
            path_bits[level] = current & 1 == 1;
            let sibling = self.layers[level]
                .get(current ^ 1)
                .copied()
                .unwrap_or(self.hasher.zeros[level]);
            siblings[level] = field_to_h256(sibling);
            current >>= 1;
        }

        Ok(MerklePath {
            siblings,
            path_bits,
            position: index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(hex_str: &str) -> H256 {
        hex_str.parse().unwrap()
    }

    fn leaves(values: &[u64]) -> Vec<H256> {
        values.iter().map(|v| H256::from_u64(*v)).collect()
    }

    #[test]
    fn test_zero_values_match_contract() {
        let hasher = MerkleHasher::new();
        assert_eq!(
            hasher.zero(0),
            word("0x2fe54c60d3acabf3343a35b6eba15db4821b340f76e741e2249685ed4899af6c")
        );
        assert_eq!(
            hasher.zero(1),
            word("0x256a6135777eee2fd26f54b8b7037a25439d5235caee224154186d2b8a52e31d")
        );
        assert_eq!(
            hasher.zero(2),
            word("0x1151949895e82ab19924de92c40a3d6f7bcb60d92b00504b8199613683f0c200")
        );
        assert_eq!(
            hasher.zero(3),
            word("0x20121ee811489ff8d61f09fb89e313f14959a0f28bb428a20dba6b0b068b3bdb")
        );
    }

    #[test]
    fn test_empty_tree() {
        let tree = MerkleTree::from_leaves(&[]).unwrap();
        assert!(tree.is_empty());
        assert_eq!(
            tree.root(),
            word("0x29d7ed391256ccc3ea596c86e933b89ff339d25ea8ddced975ae2fe30b5296d4")
        );
        assert!(tree.path(0).is_err());
    }

    #[test]
    fn test_known_roots() {
        let one = MerkleTree::from_leaves(&leaves(&[1])).unwrap();
        assert_eq!(
            one.root(),
            word("0x0a8ab16921ac878ebf0edb3883cc1df6e0a443e09588af3cda17e41b4a7fb6f9")
        );

        let two = MerkleTree::from_leaves(&leaves(&[1, 2])).unwrap();
        assert_eq!(
            two.root(),
            word("0x2a8f5562e5e3f6c807682f10513c97c6e8f44bb90bcb8a7fb76aea8b4c66e3d8")
        );

        let three = MerkleTree::from_leaves(&leaves(&[1, 2, 3])).unwrap();
        assert_eq!(
            three.root(),
            word("0x156c224f23b580116f1e543fc0b78ce38f1a4aa826f2460852cfbd0860da8dd8")
        );
    }

    #[test]
    fn test_root_is_deterministic() {
        let a = MerkleTree::from_leaves(&leaves(&[5, 6, 7, 8, 9])).unwrap();
        let b = MerkleTree::from_leaves(&leaves(&[5, 6, 7, 8, 9])).unwrap();
        assert_eq!(a.root(), b.root());

        let reordered = MerkleTree::from_leaves(&leaves(&[6, 5, 7, 8, 9])).unwrap();
        assert_ne!(a.root(), reordered.root());
    }

    #[test]
    fn test_every_path_reconstructs_root() {
        let tree = MerkleTree::from_leaves(&leaves(&[11, 12, 13, 14, 15])).unwrap();
        let root = tree.root();
        for index in 0..5u32 {
            let path = tree.path(index).unwrap();
            let leaf = Commitment(H256::from_u64(11 + index as u64));
            assert!(path.verify(&leaf, &root), "path for leaf {index}");
            assert_eq!(path.position, index);
        }
    }

    #[test]
    fn test_path_shape() {
        let tree = MerkleTree::from_leaves(&leaves(&[1, 2, 3])).unwrap();
        let path = tree.path(2).unwrap();
        let hasher = MerkleHasher::new();

        // leaf 2 is a left child whose right sibling is empty
        assert!(!path.path_bits[0]);
        assert_eq!(path.siblings[0], hasher.zero(0));
        // its parent is the right child of H(1, 2)
        assert!(path.path_bits[1]);
        assert_eq!(
            path.siblings[1],
            word("0x2bcea035a1251603f1ceaf73cd4ae89427c47075bb8e3a944039ff1e3d6d2a6f")
        );
        for level in 2..TREE_DEPTH {
            assert!(!path.path_bits[level]);
            assert_eq!(path.siblings[level], hasher.zero(level));
        }
    }

    #[test]
    fn test_path_invalid_commitment() {
        let tree = MerkleTree::from_leaves(&leaves(&[1, 2])).unwrap();
        let path = tree.path(0).unwrap();
        assert!(!path.verify(&Commitment(H256::from_u64(99)), &tree.root()));
    }

    #[test]
    fn test_index_of() {
        let tree = MerkleTree::from_leaves(&leaves(&[40, 41, 42])).unwrap();
        assert_eq!(tree.index_of(&Commitment(H256::from_u64(42))), Some(2));
        assert_eq!(tree.index_of(&Commitment(H256::from_u64(43))), None);
    }

    #[test]
    fn test_rejects_out_of_field_leaf() {
        let err = MerkleTree::from_leaves(&[H256([0xff; 32])]).err().unwrap();
        assert_eq!(
            err,
            PrivacyError::NotInField {
                value: H256([0xff; 32])
            }
        );
    }
}
