//! The transaction relation proved by every backend.
//!
//! A witness spends `k` input notes and creates `m` output notes, where
//! `(k, m)` is fixed by the [`CircuitShape`]. [`evaluate`] checks the
//! witness and returns the public inputs a verifier sees:
//!
//!   [root, nullifier_0..k, commitment_0..m, net_amount, ext_data_hash]
//!
//! `net_amount` is the signed public amount minus the relayer fee, so the
//! relation is `sum(inputs) + net_amount == sum(outputs)`.

use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

use crate::error::CircuitError;
use crate::merkle::MerklePath;
use crate::{compute_nullifier, derive_pubkey, is_safe_amount, sign, Note, B256, I256, U256};

/// Fixed circuit arities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CircuitShape {
    /// 2 inputs, 2 outputs.
    Small,
    /// 16 inputs, 16 outputs.
    Large,
}

impl CircuitShape {
    pub const fn inputs(self) -> usize {
        match self {
            CircuitShape::Small => 2,
            CircuitShape::Large => 16,
        }
    }

    pub const fn outputs(self) -> usize {
        match self {
            CircuitShape::Small => 2,
            CircuitShape::Large => 16,
        }
    }

    /// Smallest shape that fits the requested counts.
    pub fn fitting(inputs: usize, outputs: usize) -> Option<Self> {
        [CircuitShape::Small, CircuitShape::Large]
            .into_iter()
            .find(|shape| inputs <= shape.inputs() && outputs <= shape.outputs())
    }

    /// Shape whose arity matches exactly, if any.
    pub fn for_arity(inputs: usize, outputs: usize) -> Option<Self> {
        [CircuitShape::Small, CircuitShape::Large]
            .into_iter()
            .find(|shape| inputs == shape.inputs() && outputs == shape.outputs())
    }

    pub const fn tag(self) -> u8 {
        match self {
            CircuitShape::Small => 2,
            CircuitShape::Large => 16,
        }
    }
}

/// Private data for one spent note.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InputWitness {
    pub note: Note,
    pub spending_key: B256,
    /// Tree position and siblings; ignored when `note.amount` is zero.
    pub path: MerklePath,
}

/// Full witness for one transaction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionWitness {
    pub shape: CircuitShape,
    pub root: B256,
    pub net_amount: I256,
    pub ext_data_hash: B256,
    pub inputs: Vec<InputWitness>,
    pub outputs: Vec<Note>,
}

/// Values a verifier checks the proof against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicInputs {
    pub root: B256,
    pub input_nullifiers: Vec<B256>,
    pub output_commitments: Vec<B256>,
    pub net_amount: I256,
    pub ext_data_hash: B256,
}

impl PublicInputs {
    /// Shape implied by the nullifier and commitment counts.
    pub fn shape(&self) -> Option<CircuitShape> {
        CircuitShape::for_arity(self.input_nullifiers.len(), self.output_commitments.len())
    }

    /// Concatenated 32-byte words; `net_amount` in two's complement.
    pub fn encode(&self) -> Vec<u8> {
        let words = 3 + self.input_nullifiers.len() + self.output_commitments.len();
        let mut out = Vec::with_capacity(words * 32);
        out.extend_from_slice(self.root.as_slice());
        for nullifier in &self.input_nullifiers {
            out.extend_from_slice(nullifier.as_slice());
        }
        for commitment in &self.output_commitments {
            out.extend_from_slice(commitment.as_slice());
        }
        out.extend_from_slice(&self.net_amount.into_raw().to_be_bytes::<32>());
        out.extend_from_slice(self.ext_data_hash.as_slice());
        out
    }
}

/// Check the witness against the relation and derive its public inputs.
pub fn evaluate(witness: &TransactionWitness) -> Result<PublicInputs, CircuitError> {
    let shape = witness.shape;
    if witness.inputs.len() != shape.inputs() {
        return Err(CircuitError::ArityMismatch {
            side: "inputs",
            expected: shape.inputs(),
            got: witness.inputs.len(),
        });
    }
    if witness.outputs.len() != shape.outputs() {
        return Err(CircuitError::ArityMismatch {
            side: "outputs",
            expected: shape.outputs(),
            got: witness.outputs.len(),
        });
    }

    let mut input_sum = U256::ZERO;
    let mut input_nullifiers = Vec::with_capacity(shape.inputs());
    for (i, input) in witness.inputs.iter().enumerate() {
        let note = &input.note;
        if !is_safe_amount(&note.amount) {
            return Err(CircuitError::AmountOutOfRange);
        }
        if derive_pubkey(&input.spending_key) != note.pubkey {
            return Err(CircuitError::KeyMismatch(i));
        }

        let commitment = note.commitment();
        let index = input.path.leaf_index;
        let signature = sign(&input.spending_key, &commitment, index);
        let nullifier = compute_nullifier(&commitment, index, &signature);

        // Padding notes carry no value and need no membership proof.
        if !note.amount.is_zero() && !input.path.verify(commitment, witness.root) {
            return Err(CircuitError::InvalidMerklePath(i));
        }

        if input_nullifiers.contains(&nullifier) {
            return Err(CircuitError::DuplicateNullifier);
        }
        input_nullifiers.push(nullifier);
        input_sum = input_sum
            .checked_add(note.amount)
            .ok_or(CircuitError::AmountOutOfRange)?;
    }

    let mut output_sum = U256::ZERO;
    let mut output_commitments = Vec::with_capacity(shape.outputs());
    for note in &witness.outputs {
        if !is_safe_amount(&note.amount) {
            return Err(CircuitError::AmountOutOfRange);
        }
        output_commitments.push(note.commitment());
        output_sum = output_sum
            .checked_add(note.amount)
            .ok_or(CircuitError::AmountOutOfRange)?;
    }

    let magnitude = witness.net_amount.unsigned_abs();
    if !is_safe_amount(&magnitude) {
        return Err(CircuitError::AmountOutOfRange);
    }
    let balanced_inputs = if witness.net_amount.is_negative() {
        input_sum.checked_sub(magnitude)
    } else {
        input_sum.checked_add(magnitude)
    };
    if balanced_inputs != Some(output_sum) {
        return Err(CircuitError::Unbalanced);
    }

    Ok(PublicInputs {
        root: witness.root,
        input_nullifiers,
        output_commitments,
        net_amount: witness.net_amount,
        ext_data_hash: witness.ext_data_hash,
    })
}
