//! Errors raised by the shared primitives.

use thiserror::Error;

/// Commitment tree errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MerkleError {
    /// Tree height outside `1..=MAX_LEVELS`.
    #[error("invalid tree height {0}")]
    InvalidHeight(usize),

    /// Root history window must hold at least one root.
    #[error("root history size must be non-zero")]
    EmptyHistory,

    /// Every leaf slot is already used.
    #[error("merkle tree is full")]
    TreeFull,

    /// No leaf was inserted at this index.
    #[error("leaf index {0} out of range")]
    IndexOutOfRange(u32),

    /// The commitment was never inserted.
    #[error("commitment not found in tree")]
    LeafNotFound,
}

/// Reasons a transaction witness does not satisfy the circuit relation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CircuitError {
    #[error("witness has {got} {side}, circuit expects {expected}")]
    ArityMismatch {
        side: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("amount exceeds the 248-bit range")]
    AmountOutOfRange,

    #[error("spending key does not match note pubkey for input {0}")]
    KeyMismatch(usize),

    #[error("merkle path invalid for input {0}")]
    InvalidMerklePath(usize),

    #[error("duplicate input nullifier")]
    DuplicateNullifier,

    #[error("input and output amounts don't balance")]
    Unbalanced,
}
