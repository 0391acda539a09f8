//! Shielded keys and addresses.
//!
//! A spending key `sk` determines everything else:
//!   pubkey            = keccak256(sk)
//!   encryption secret = keccak256("bridge-pool/encryption" || sk)   (X25519)
//!
//! The public half is a [`ShieldedAddress`], shared as a 130-character
//! string: `0x` + hex(pubkey) + hex(encryption public key).

use std::fmt;
use std::str::FromStr;

use alloy_primitives::{B256, U256};
use bridge_pool_lib::{derive_pubkey, keccak256, sign};
use crypto_box::aead::generic_array::GenericArray;
use crypto_box::aead::{Aead, AeadCore, OsRng};
use crypto_box::{PublicKey, SalsaBox, SecretKey};
use rand::Rng;

use crate::error::{PoolError, Result};

const ENCRYPTION_DOMAIN: &[u8] = b"bridge-pool/encryption";
const NONCE_LEN: usize = 24;
const KEY_LEN: usize = 32;

pub const ADDRESS_PREFIX: &str = "0x";
/// Prefix plus 64 hex-encoded bytes.
pub const ADDRESS_LEN: usize = 2 + 128;

/// Public part of a keypair: enough to create and encrypt notes for its owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShieldedAddress {
    pub pubkey: B256,
    pub encryption_key: [u8; KEY_LEN],
}

impl ShieldedAddress {
    /// Encrypt to this address with a fresh ephemeral key.
    ///
    /// Layout: nonce(24) || ephemeral public key(32) || ciphertext.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let recipient = PublicKey::from(self.encryption_key);
        let ephemeral = SecretKey::generate(&mut OsRng);
        let nonce = SalsaBox::generate_nonce(&mut OsRng);

        let ciphertext = SalsaBox::new(&recipient, &ephemeral)
            .encrypt(&nonce, plaintext)
            .map_err(|_| PoolError::Crypto("note encryption failed"))?;

        let mut out = Vec::with_capacity(NONCE_LEN + KEY_LEN + ciphertext.len());
        out.extend_from_slice(nonce.as_slice());
        out.extend_from_slice(ephemeral.public_key().as_bytes());
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }
}

impl fmt::Display for ShieldedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{ADDRESS_PREFIX}{}{}",
            hex::encode(self.pubkey),
            hex::encode(self.encryption_key)
        )
    }
}

impl FromStr for ShieldedAddress {
    type Err = PoolError;

    fn from_str(s: &str) -> Result<Self> {
        let body = s
            .strip_prefix(ADDRESS_PREFIX)
            .ok_or_else(|| PoolError::Decode(format!("address must start with {ADDRESS_PREFIX}")))?;
        if s.len() != ADDRESS_LEN {
            return Err(PoolError::Decode(format!(
                "address must be {ADDRESS_LEN} characters, got {}",
                s.len()
            )));
        }
        let bytes = hex::decode(body).map_err(|e| PoolError::Decode(format!("address: {e}")))?;

        let mut pubkey = [0u8; 32];
        let mut encryption_key = [0u8; KEY_LEN];
        pubkey.copy_from_slice(&bytes[..32]);
        encryption_key.copy_from_slice(&bytes[32..]);
        Ok(ShieldedAddress {
            pubkey: B256::from(pubkey),
            encryption_key,
        })
    }
}

/// A shielded identity. Built from [`Keypair::from_string`] it holds only the
/// public half and can receive but never spend.
#[derive(Clone)]
pub struct Keypair {
    spending_key: Option<B256>,
    address: ShieldedAddress,
}

impl Keypair {
    /// Fresh keypair with a random spending key.
    pub fn generate() -> Self {
        let sk: [u8; 32] = rand::thread_rng().gen();
        Self::from_spending_key(B256::from(sk))
    }

    pub fn from_spending_key(spending_key: B256) -> Self {
        let encryption = encryption_secret(&spending_key);
        let address = ShieldedAddress {
            pubkey: derive_pubkey(&spending_key),
            encryption_key: *encryption.public_key().as_bytes(),
        };
        Keypair {
            spending_key: Some(spending_key),
            address,
        }
    }

    /// Public-only keypair for a counterparty's address string.
    pub fn from_string(s: &str) -> Result<Self> {
        Ok(Keypair {
            spending_key: None,
            address: s.parse()?,
        })
    }

    /// Address string shared with senders.
    pub fn address(&self) -> String {
        self.address.to_string()
    }

    pub fn shielded_address(&self) -> &ShieldedAddress {
        &self.address
    }

    pub fn pubkey(&self) -> B256 {
        self.address.pubkey
    }

    pub fn can_spend(&self) -> bool {
        self.spending_key.is_some()
    }

    pub fn spending_key(&self) -> Result<&B256> {
        self.spending_key.as_ref().ok_or(PoolError::MissingSpendingKey)
    }

    /// Spend authorisation for the note `commitment` at tree position `index`.
    pub fn sign(&self, commitment: &B256, index: u32) -> Result<B256> {
        Ok(sign(self.spending_key()?, commitment, index))
    }

    /// Open a ciphertext produced by [`ShieldedAddress::encrypt`].
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        let secret = encryption_secret(self.spending_key()?);
        if data.len() < NONCE_LEN + KEY_LEN {
            return Err(PoolError::Decryption);
        }
        let (nonce, rest) = data.split_at(NONCE_LEN);
        let (ephemeral, ciphertext) = rest.split_at(KEY_LEN);

        let mut ephemeral_key = [0u8; KEY_LEN];
        ephemeral_key.copy_from_slice(ephemeral);
        let ephemeral = PublicKey::from(ephemeral_key);

        SalsaBox::new(&ephemeral, &secret)
            .decrypt(GenericArray::from_slice(nonce), ciphertext)
            .map_err(|_| PoolError::Decryption)
    }

    /// Recover `(amount, blinding)` from an encrypted note output.
    pub fn decrypt_output(&self, data: &[u8]) -> Result<(U256, B256)> {
        let plaintext = self.decrypt(data)?;
        if plaintext.len() != 64 {
            return Err(PoolError::Decryption);
        }
        let amount = U256::from_be_slice(&plaintext[..32]);
        let blinding = B256::from_slice(&plaintext[32..]);
        Ok((amount, blinding))
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("address", &self.address())
            .field("can_spend", &self.can_spend())
            .finish()
    }
}

fn encryption_secret(spending_key: &B256) -> SecretKey {
    let mut preimage = Vec::with_capacity(ENCRYPTION_DOMAIN.len() + 32);
    preimage.extend_from_slice(ENCRYPTION_DOMAIN);
    preimage.extend_from_slice(spending_key.as_slice());
    SecretKey::from(keccak256(&preimage).0)
}
