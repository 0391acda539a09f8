//! Proving-system seam.
//!
//! The pool only needs `prove`/`verify` over the transaction relation in
//! [`bridge_pool_lib::circuit`]. Backends pick the shape from the witness
//! (proving) or from the public-input arity (verifying).

use alloy_primitives::{Bytes, B256};
use bridge_pool_lib::{evaluate, keccak256, CircuitShape, PublicInputs, TransactionWitness};
use tracing::debug;

use crate::error::Result;

pub trait ProvingSystem {
    /// Prove a witness; fails if it does not satisfy the relation.
    fn prove(&self, witness: &TransactionWitness) -> Result<(Bytes, PublicInputs)>;

    /// Check `proof` against `public`. `Ok(false)` is a rejected proof;
    /// `Err` is reserved for backend failures.
    fn verify(&self, proof: &[u8], public: &PublicInputs) -> Result<bool>;
}

impl<P: ProvingSystem + ?Sized> ProvingSystem for &P {
    fn prove(&self, witness: &TransactionWitness) -> Result<(Bytes, PublicInputs)> {
        (**self).prove(witness)
    }

    fn verify(&self, proof: &[u8], public: &PublicInputs) -> Result<bool> {
        (**self).verify(proof, public)
    }
}

/// Development backend.
///
/// Proving runs the relation and refuses false statements; the proof is
/// `keccak256(vk(shape) || public_inputs)`, with `vk` derived from a setup
/// seed. Any change to a public input breaks the proof. It hides nothing
/// and is only sound against provers that don't hold the seed.
#[derive(Clone, Debug)]
pub struct ReferenceProver {
    seed: B256,
}

impl ReferenceProver {
    pub fn new(seed: B256) -> Self {
        ReferenceProver { seed }
    }

    pub fn verifying_key(&self, shape: CircuitShape) -> B256 {
        let mut preimage = Vec::with_capacity(64);
        preimage.extend_from_slice(b"bridge-pool/reference-setup");
        preimage.extend_from_slice(self.seed.as_slice());
        preimage.push(shape.tag());
        keccak256(&preimage)
    }

    fn seal(&self, shape: CircuitShape, public: &PublicInputs) -> B256 {
        let mut preimage = self.verifying_key(shape).to_vec();
        preimage.extend_from_slice(&public.encode());
        keccak256(&preimage)
    }
}

impl Default for ReferenceProver {
    fn default() -> Self {
        ReferenceProver::new(keccak256(b"bridge-pool/default-setup"))
    }
}

impl ProvingSystem for ReferenceProver {
    fn prove(&self, witness: &TransactionWitness) -> Result<(Bytes, PublicInputs)> {
        let public = evaluate(witness)?;
        let proof = self.seal(witness.shape, &public);
        debug!(shape = ?witness.shape, root = %public.root, "reference proof generated");
        Ok((Bytes::copy_from_slice(proof.as_slice()), public))
    }

    fn verify(&self, proof: &[u8], public: &PublicInputs) -> Result<bool> {
        let Some(shape) = public.shape() else {
            return Ok(false);
        };
        Ok(proof == self.seal(shape, public).as_slice())
    }
}
