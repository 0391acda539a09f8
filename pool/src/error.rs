//! Pool, builder and key errors.

use alloy_primitives::{Address, B256, U256};
use bridge_pool_lib::{CircuitError, MerkleError};
use thiserror::Error;

/// Every way a pool operation can fail.
///
/// State-machine checks run before any mutation, so an `Err` from
/// [`crate::ShieldedPool::transact`] always means nothing changed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    // ----- state machine rejections -----
    #[error("unknown merkle root {0}")]
    UnknownRoot(B256),

    #[error("input {0} is already spent")]
    DoubleSpend(B256),

    #[error("ext data hash mismatch: bundle has {bound}, ext data hashes to {computed}")]
    ExtDataMismatch { bound: B256, computed: B256 },

    #[error("invalid transaction proof")]
    InvalidProof,

    #[error("{0}")]
    LimitExceeded(&'static str),

    #[error("bridged amount mismatch: {0}")]
    AmountMismatch(&'static str),

    #[error("can't withdraw to zero address")]
    ZeroRecipient,

    #[error("merkle tree is full")]
    TreeFull,

    #[error("insufficient funds: {owner} holds {available}, needs {required}")]
    InsufficientFunds {
        owner: Address,
        available: U256,
        required: U256,
    },

    #[error("only the bridge may call this, got {0}")]
    UnauthorizedBridge(Address),

    #[error("token {0} is not supported")]
    UnsupportedToken(Address),

    // ----- recoverable by the caller -----
    #[error("root {0} fell out of the history window, rebuild against a fresh snapshot")]
    StaleRoot(B256),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("commitment {0} not found in tree")]
    NotFound(B256),

    // ----- builder / key errors -----
    #[error("note has no spending key")]
    MissingSpendingKey,

    #[error("keypair does not own the note")]
    OwnerMismatch,

    #[error("amount exceeds the field's safe range")]
    AmountOverflow,

    #[error("{0} inputs exceed the largest circuit")]
    InsufficientInputs(usize),

    #[error("{0} outputs exceed the largest circuit")]
    TooManyOutputs(usize),

    #[error("could not decrypt output")]
    Decryption,

    #[error("cryptographic primitive failure: {0}")]
    Crypto(&'static str),

    // ----- collaborators -----
    #[error("ledger error: {0}")]
    Ledger(String),

    #[error("merkle error: {0}")]
    Merkle(MerkleError),

    #[error("circuit error: {0}")]
    Circuit(#[from] CircuitError),

    #[error("proving failed: {0}")]
    Proving(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PoolError {
    /// Whether retrying after refreshing local state can succeed.
    ///
    /// Permanent rejections (invalid proof, double spend, limits) report `false`.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PoolError::StaleRoot(_)
                | PoolError::UnknownRoot(_)
                | PoolError::Decode(_)
                | PoolError::NotFound(_)
        )
    }
}

impl From<MerkleError> for PoolError {
    fn from(err: MerkleError) -> Self {
        match err {
            MerkleError::TreeFull => PoolError::TreeFull,
            MerkleError::InvalidHeight(_) | MerkleError::EmptyHistory => {
                PoolError::Config(err.to_string())
            }
            MerkleError::IndexOutOfRange(_) | MerkleError::LeafNotFound => PoolError::Merkle(err),
        }
    }
}

pub type Result<T, E = PoolError> = std::result::Result<T, E>;
