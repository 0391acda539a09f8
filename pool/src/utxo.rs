//! Wallet-side notes.

use alloy_primitives::{Bytes, B256, U256};
use bridge_pool_lib::{compute_nullifier, Note};
use rand::Rng;

use crate::error::{PoolError, Result};
use crate::keypair::{Keypair, ShieldedAddress};

/// A note as its owner (or sender) sees it.
///
/// Holds a copy of the owner's public address, never a spending key; the
/// key is borrowed only by [`Utxo::nullifier`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Utxo {
    pub amount: U256,
    pub owner: ShieldedAddress,
    pub blinding: B256,
    /// Leaf index once the commitment is in the tree.
    pub index: Option<u32>,
}

impl Utxo {
    /// New note with a random blinding factor.
    pub fn new(amount: U256, keypair: &Keypair) -> Self {
        Self::with_blinding(amount, keypair, random_blinding())
    }

    pub fn with_blinding(amount: U256, keypair: &Keypair, blinding: B256) -> Self {
        Utxo {
            amount,
            owner: *keypair.shielded_address(),
            blinding,
            index: None,
        }
    }

    /// Zero-value note used to pad a circuit slot.
    pub fn zero(keypair: &Keypair) -> Self {
        Self::new(U256::ZERO, keypair)
    }

    pub fn with_index(mut self, index: u32) -> Self {
        self.index = Some(index);
        self
    }

    pub fn to_note(&self) -> Note {
        Note {
            amount: self.amount,
            pubkey: self.owner.pubkey,
            blinding: self.blinding,
        }
    }

    pub fn commitment(&self) -> B256 {
        self.to_note().commitment()
    }

    /// Nullifier revealed when this note is spent.
    ///
    /// Needs the owner's spending key and, for non-zero notes, the tree index.
    pub fn nullifier(&self, keypair: &Keypair) -> Result<B256> {
        keypair.spending_key()?;
        if keypair.pubkey() != self.owner.pubkey {
            return Err(PoolError::OwnerMismatch);
        }
        let commitment = self.commitment();
        let index = match self.index {
            Some(index) => index,
            None if self.amount.is_zero() => 0,
            None => return Err(PoolError::NotFound(commitment)),
        };
        let signature = keypair.sign(&commitment, index)?;
        Ok(compute_nullifier(&commitment, index, &signature))
    }

    /// `amount || blinding` encrypted to the owner.
    pub fn encrypt(&self) -> Result<Bytes> {
        let mut plaintext = Vec::with_capacity(64);
        plaintext.extend_from_slice(&self.amount.to_be_bytes::<32>());
        plaintext.extend_from_slice(self.blinding.as_slice());
        Ok(self.owner.encrypt(&plaintext)?.into())
    }

    /// Rebuild a note from an encrypted output found at `index`.
    pub fn decrypt(keypair: &Keypair, data: &[u8], index: u32) -> Result<Self> {
        let (amount, blinding) = keypair.decrypt_output(data)?;
        Ok(Utxo::with_blinding(amount, keypair, blinding).with_index(index))
    }
}

pub fn random_blinding() -> B256 {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    B256::from(bytes)
}
