//! SP1 zkVM backend for the transaction relation.
//!
//! One guest per circuit shape. Proofs are compressed SP1 proofs serialised
//! as JSON; the guest commits the encoded public inputs, which verification
//! compares against the statement it is asked about.

use std::fs;
use std::path::Path;

use alloy_primitives::Bytes;
use anyhow::Context;
use bridge_pool::error::{PoolError, Result};
use bridge_pool::ProvingSystem;
use bridge_pool_lib::{evaluate, CircuitShape, PublicInputs, TransactionWitness};
use sp1_sdk::{
    include_elf, EnvProver, HashableKey, ProverClient, SP1ProofWithPublicValues, SP1ProvingKey,
    SP1Stdin, SP1VerifyingKey,
};
use tracing::info;

pub const TRANSACTION2_ELF: &[u8] = include_elf!("transaction2-program");
pub const TRANSACTION16_ELF: &[u8] = include_elf!("transaction16-program");

struct Keys {
    pk: SP1ProvingKey,
    vk: SP1VerifyingKey,
}

pub struct Sp1Prover {
    client: EnvProver,
    small: Keys,
    large: Keys,
}

fn elf(shape: CircuitShape) -> &'static [u8] {
    match shape {
        CircuitShape::Small => TRANSACTION2_ELF,
        CircuitShape::Large => TRANSACTION16_ELF,
    }
}

fn stdin_for(witness: &TransactionWitness) -> SP1Stdin {
    let mut stdin = SP1Stdin::new();
    stdin.write(witness);
    stdin
}

impl Sp1Prover {
    /// Client configured by `SP1_PROVER` and friends; runs setup for both guests.
    pub fn from_env() -> Self {
        let client = ProverClient::from_env();
        let (pk, vk) = client.setup(TRANSACTION2_ELF);
        let small = Keys { pk, vk };
        let (pk, vk) = client.setup(TRANSACTION16_ELF);
        let large = Keys { pk, vk };
        Sp1Prover {
            client,
            small,
            large,
        }
    }

    fn keys(&self, shape: CircuitShape) -> &Keys {
        match shape {
            CircuitShape::Small => &self.small,
            CircuitShape::Large => &self.large,
        }
    }

    pub fn vkeys(&self) -> [(&'static str, String); 2] {
        [
            ("TRANSACTION2_VKEY", self.small.vk.bytes32()),
            ("TRANSACTION16_VKEY", self.large.vk.bytes32()),
        ]
    }

    /// Run the guest without proving. Returns the committed bytes and the cycle count.
    pub fn execute(&self, witness: &TransactionWitness) -> anyhow::Result<(Vec<u8>, u64)> {
        let (public_values, report) = self
            .client
            .execute(elf(witness.shape), &stdin_for(witness))
            .run()?;
        Ok((public_values.to_vec(), report.total_instruction_count()))
    }

    /// Prove and write the proof bytes to `path`. Returns the proof size.
    pub fn prove_to_file(&self, witness: &TransactionWitness, path: &Path) -> anyhow::Result<usize> {
        let (proof, _) = self.prove(witness)?;
        fs::write(path, &proof).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(proof.len())
    }
}

impl ProvingSystem for Sp1Prover {
    fn prove(&self, witness: &TransactionWitness) -> Result<(Bytes, PublicInputs)> {
        // Refuse false statements before spending prover time on them.
        let public = evaluate(witness)?;

        let keys = self.keys(witness.shape);
        info!(shape = ?witness.shape, "generating compressed proof");
        let proof = self
            .client
            .prove(&keys.pk, &stdin_for(witness))
            .compressed()
            .run()
            .map_err(|e| PoolError::Proving(e.to_string()))?;
        if proof.public_values.as_slice() != public.encode().as_slice() {
            return Err(PoolError::Proving(
                "guest committed unexpected public values".into(),
            ));
        }

        let bytes = serde_json::to_vec(&proof).map_err(|e| PoolError::Proving(e.to_string()))?;
        Ok((bytes.into(), public))
    }

    fn verify(&self, proof: &[u8], public: &PublicInputs) -> Result<bool> {
        let Some(shape) = public.shape() else {
            return Ok(false);
        };
        let Ok(proof) = serde_json::from_slice::<SP1ProofWithPublicValues>(proof) else {
            return Ok(false);
        };
        if proof.public_values.as_slice() != public.encode().as_slice() {
            return Ok(false);
        }
        Ok(self.client.verify(&proof, &self.keys(shape).vk).is_ok())
    }
}
