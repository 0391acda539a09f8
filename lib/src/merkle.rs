//! Append-only commitment tree with a bounded window of recent roots.

use alloc::vec;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

use crate::error::MerkleError;
use crate::{hash_pair, keccak256, B256};

/// Deepest tree supported; leaf indices are `u32`.
pub const MAX_LEVELS: usize = 32;

/// Roots kept by [`IncrementalMerkleTree::new`].
pub const DEFAULT_ROOT_HISTORY_SIZE: usize = 30;

/// Inclusion path for one leaf.
///
/// The side a node occupies at level `i` is bit `i` of `leaf_index`:
/// 0 means the running hash is the left child.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MerklePath {
    pub leaf_index: u32,
    /// Sibling hashes from the leaf level upwards.
    pub siblings: Vec<B256>,
}

impl MerklePath {
    /// Placeholder path for zero-amount inputs, which the circuit never checks.
    pub fn empty(levels: usize) -> Self {
        MerklePath {
            leaf_index: 0,
            siblings: vec![B256::ZERO; levels],
        }
    }

    /// Fold the path from `leaf` up to a root.
    pub fn compute_root(&self, leaf: B256) -> B256 {
        let mut current = leaf;
        let mut index = self.leaf_index;
        for sibling in &self.siblings {
            current = if index & 1 == 0 {
                hash_pair(&current, sibling)
            } else {
                hash_pair(sibling, &current)
            };
            index >>= 1;
        }
        current
    }

    pub fn verify(&self, leaf: B256, expected_root: B256) -> bool {
        self.compute_root(leaf) == expected_root
    }
}

/// Compute the zero values for each level of the tree.
///   zeros[0] = keccak256(bytes32(0))
///   zeros[i] = hash_pair(zeros[i-1], zeros[i-1])
pub fn compute_zeros(levels: usize) -> Vec<B256> {
    let mut zeros = vec![B256::ZERO; levels.max(1)];
    zeros[0] = keccak256(&[0u8; 32]);
    for i in 1..zeros.len() {
        zeros[i] = hash_pair(&zeros[i - 1], &zeros[i - 1]);
    }
    zeros
}

/// Root of an empty tree with the given number of levels.
pub fn compute_empty_root(levels: usize) -> B256 {
    let zeros = compute_zeros(levels);
    let top = zeros[zeros.len() - 1];
    hash_pair(&top, &top)
}

/// Incremental Merkle tree over note commitments.
///
/// Keeps the filled left subtrees for O(levels) inserts, every leaf for
/// path generation, and a ring buffer of the last `root_history_size` roots.
#[derive(Clone, Debug)]
pub struct IncrementalMerkleTree {
    levels: usize,
    zeros: Vec<B256>,
    filled_subtrees: Vec<B256>,
    roots: Vec<B256>,
    current_root_index: usize,
    leaves: Vec<B256>,
}

impl IncrementalMerkleTree {
    /// Empty tree with the default root history window.
    pub fn new(levels: usize) -> Result<Self, MerkleError> {
        Self::with_root_history(levels, DEFAULT_ROOT_HISTORY_SIZE)
    }

    pub fn with_root_history(levels: usize, root_history_size: usize) -> Result<Self, MerkleError> {
        if levels == 0 || levels > MAX_LEVELS {
            return Err(MerkleError::InvalidHeight(levels));
        }
        if root_history_size == 0 {
            return Err(MerkleError::EmptyHistory);
        }

        let zeros = compute_zeros(levels);
        let filled_subtrees = zeros.clone();
        let mut roots = vec![B256::ZERO; root_history_size];
        roots[0] = compute_empty_root(levels);

        Ok(IncrementalMerkleTree {
            levels,
            zeros,
            filled_subtrees,
            roots,
            current_root_index: 0,
            leaves: Vec::new(),
        })
    }

    /// Replay commitments in insertion order.
    pub fn from_leaves<I>(levels: usize, root_history_size: usize, leaves: I) -> Result<Self, MerkleError>
    where
        I: IntoIterator<Item = B256>,
    {
        let mut tree = Self::with_root_history(levels, root_history_size)?;
        for leaf in leaves {
            tree.insert(leaf)?;
        }
        Ok(tree)
    }

    pub fn levels(&self) -> usize {
        self.levels
    }

    pub fn root_history_size(&self) -> usize {
        self.roots.len()
    }

    pub fn capacity(&self) -> u64 {
        1u64 << self.levels
    }

    pub fn len(&self) -> u32 {
        self.leaves.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Free leaf slots.
    pub fn remaining(&self) -> u64 {
        self.capacity() - self.leaves.len() as u64
    }

    pub fn leaves(&self) -> &[B256] {
        &self.leaves
    }

    /// Append a leaf and push the new root into history. Returns the leaf index.
    pub fn insert(&mut self, leaf: B256) -> Result<u32, MerkleError> {
        if self.remaining() == 0 {
            return Err(MerkleError::TreeFull);
        }
        let index = self.leaves.len() as u32;

        let mut current_index = index;
        let mut current_hash = leaf;
        for i in 0..self.levels {
            if current_index % 2 == 0 {
                // Left child: pair with zero on the right
                self.filled_subtrees[i] = current_hash;
                current_hash = hash_pair(&current_hash, &self.zeros[i]);
            } else {
                // Right child: pair with filled subtree on the left
                current_hash = hash_pair(&self.filled_subtrees[i], &current_hash);
            }
            current_index /= 2;
        }

        self.current_root_index = (self.current_root_index + 1) % self.roots.len();
        self.roots[self.current_root_index] = current_hash;
        self.leaves.push(leaf);

        Ok(index)
    }

    /// Get the most recent root.
    pub fn root(&self) -> B256 {
        self.roots[self.current_root_index]
    }

    /// Check if a root exists in recent history.
    pub fn is_known_root(&self, root: B256) -> bool {
        !root.is_zero() && self.roots.iter().any(|known| *known == root)
    }

    pub fn index_of(&self, leaf: &B256) -> Option<u32> {
        self.leaves.iter().position(|l| l == leaf).map(|i| i as u32)
    }

    /// Inclusion path for the leaf at `leaf_index` against the current root.
    pub fn path(&self, leaf_index: u32) -> Result<MerklePath, MerkleError> {
        if leaf_index as usize >= self.leaves.len() {
            return Err(MerkleError::IndexOutOfRange(leaf_index));
        }

        // Nodes past the filled prefix of a level are that level's zero value.
        let mut level_nodes = self.leaves.clone();
        let mut idx = leaf_index as usize;
        let mut siblings = Vec::with_capacity(self.levels);

        for level in 0..self.levels {
            let zero = self.zeros[level];
            siblings.push(level_nodes.get(idx ^ 1).copied().unwrap_or(zero));

            level_nodes = level_nodes
                .chunks(2)
                .map(|pair| hash_pair(&pair[0], pair.get(1).unwrap_or(&zero)))
                .collect();
            idx /= 2;
        }

        Ok(MerklePath {
            leaf_index,
            siblings,
        })
    }

    /// Inclusion path for a commitment, located by value.
    pub fn prove_membership(&self, leaf: &B256) -> Result<MerklePath, MerkleError> {
        let index = self.index_of(leaf).ok_or(MerkleError::LeafNotFound)?;
        self.path(index)
    }
}
