//! Spent-nullifier set.
//!
//! Append-only: membership is the only double-spend guard, so nothing is
//! ever removed.

use std::collections::HashSet;

use alloy_primitives::B256;

#[derive(Clone, Debug, Default)]
pub struct NullifierSet {
    set: HashSet<B256>,
}

impl NullifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the nullifier has already been seen.
    pub fn contains(&self, nullifier: &B256) -> bool {
        self.set.contains(nullifier)
    }

    /// Returns `true` if the nullifier was newly inserted.
    pub fn insert(&mut self, nullifier: B256) -> bool {
        self.set.insert(nullifier)
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}
