#![no_std]
extern crate alloc;

pub mod circuit;
pub mod error;
pub mod merkle;

pub use alloy_primitives::{B256, I256, U256};
pub use circuit::{evaluate, CircuitShape, InputWitness, PublicInputs, TransactionWitness};
pub use error::{CircuitError, MerkleError};
pub use merkle::{compute_empty_root, compute_zeros, IncrementalMerkleTree, MerklePath};

use serde::{Deserialize, Serialize};
use tiny_keccak::{Hasher, Keccak};

// =============================================================================
//                          KECCAK256 HELPERS
// =============================================================================

/// Compute keccak256 hash. This matches Solidity's keccak256() opcode.
/// Note: tiny_keccak::Keccak is pre-standard Keccak-256 (NOT SHA3-256).
pub fn keccak256(data: &[u8]) -> B256 {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    B256::from(output)
}

/// Hash a pair of 32-byte nodes: keccak256(left ++ right).
///
/// Order-sensitive; the caller decides which side a node sits on from the
/// parity of its index at that level.
pub fn hash_pair(left: &B256, right: &B256) -> B256 {
    let mut data = [0u8; 64];
    data[..32].copy_from_slice(left.as_slice());
    data[32..].copy_from_slice(right.as_slice());
    keccak256(&data)
}

// =============================================================================
//                          FIELD BOUNDS
// =============================================================================

/// Exclusive upper bound for note amounts, fees and the public amount (2^248).
pub const MAX_AMOUNT: U256 = U256::from_limbs([0, 0, 0, 1 << 56]);

/// Whether `amount` fits the range the circuit can range-check.
pub fn is_safe_amount(amount: &U256) -> bool {
    *amount < MAX_AMOUNT
}

// =============================================================================
//                              NOTE TYPE
// =============================================================================

/// Circuit-level view of a shielded note.
///
///   commitment = keccak256(amount_be32 || pubkey || blinding)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Note {
    /// Token amount in base units
    pub amount: U256,
    /// Owner's public key: keccak256(spending_key)
    pub pubkey: B256,
    /// Random blinding factor for hiding
    pub blinding: B256,
}

impl Note {
    /// Compute the note commitment. Total preimage: 96 bytes.
    pub fn commitment(&self) -> B256 {
        let mut preimage = [0u8; 96];
        preimage[0..32].copy_from_slice(&self.amount.to_be_bytes::<32>());
        preimage[32..64].copy_from_slice(self.pubkey.as_slice());
        preimage[64..96].copy_from_slice(self.blinding.as_slice());
        keccak256(&preimage)
    }
}

// =============================================================================
//                          KEY DERIVATION
// =============================================================================

/// Derive the public key from a spending key.
/// pubkey = keccak256(spending_key)
pub fn derive_pubkey(spending_key: &B256) -> B256 {
    keccak256(spending_key.as_slice())
}

/// Spend authorisation over a commitment at a tree position.
/// signature = keccak256(spending_key || commitment || index_be32)
pub fn sign(spending_key: &B256, commitment: &B256, index: u32) -> B256 {
    let mut preimage = [0u8; 68];
    preimage[0..32].copy_from_slice(spending_key.as_slice());
    preimage[32..64].copy_from_slice(commitment.as_slice());
    preimage[64..68].copy_from_slice(&index.to_be_bytes());
    keccak256(&preimage)
}

// =============================================================================
//                           NULLIFIER
// =============================================================================

/// Compute the nullifier for a note at a tree position.
/// nullifier = keccak256(commitment || index_be32 || signature)
pub fn compute_nullifier(commitment: &B256, index: u32, signature: &B256) -> B256 {
    let mut preimage = [0u8; 68];
    preimage[0..32].copy_from_slice(commitment.as_slice());
    preimage[32..36].copy_from_slice(&index.to_be_bytes());
    preimage[36..68].copy_from_slice(signature.as_slice());
    keccak256(&preimage)
}

// =============================================================================
//                              TESTS
// =============================================================================
