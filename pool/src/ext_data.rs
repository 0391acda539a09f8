//! Public transaction metadata, the proof bundle, and their ABI encodings.
//!
//! `ExtData` is bound into the proof through `extDataHash =
//! keccak256(abi.encode(ExtData))`. The bridge carries
//! `abi.encode(ProofArgs, ExtData)` as its payload.

use alloy_primitives::{Address, Bytes, B256, I256, U256};
use alloy_sol_types::{sol, SolValue};
use bridge_pool_lib::{keccak256, CircuitShape, PublicInputs};
use serde::{Deserialize, Serialize};

use crate::error::{PoolError, Result};

sol! {
    struct ProofArgs {
        bytes proof;
        bytes32 root;
        bytes32[] inputNullifiers;
        bytes32[] outputCommitments;
        int256 publicAmount;
        bytes32 extDataHash;
    }

    struct ExtDataArgs {
        address recipient;
        address relayer;
        uint256 fee;
        bytes[] encryptedOutputs;
        bool isL1Withdrawal;
        uint256 l1Fee;
    }
}

/// Transaction metadata the proof commits to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtData {
    /// Withdrawal recipient; zero for deposits and transfers.
    pub recipient: Address,
    /// Account paid `relayer_fee`.
    pub relayer: Address,
    pub relayer_fee: U256,
    /// One ciphertext per output slot, in output order.
    pub encrypted_outputs: Vec<Bytes>,
    /// Pay the withdrawal out through the bridge instead of locally.
    pub is_cross_domain_withdrawal: bool,
    /// Fee the bridge keeps on the far side of a cross-domain withdrawal.
    pub l1_fee: U256,
}

impl ExtData {
    pub fn hash(&self) -> B256 {
        keccak256(&self.to_abi().abi_encode())
    }

    fn to_abi(&self) -> ExtDataArgs {
        ExtDataArgs {
            recipient: self.recipient,
            relayer: self.relayer,
            fee: self.relayer_fee,
            encryptedOutputs: self.encrypted_outputs.clone(),
            isL1Withdrawal: self.is_cross_domain_withdrawal,
            l1Fee: self.l1_fee,
        }
    }

    fn from_abi(args: ExtDataArgs) -> Self {
        ExtData {
            recipient: args.recipient,
            relayer: args.relayer,
            relayer_fee: args.fee,
            encrypted_outputs: args.encryptedOutputs,
            is_cross_domain_withdrawal: args.isL1Withdrawal,
            l1_fee: args.l1Fee,
        }
    }
}

/// What a builder submits: the proof and every public input it was made for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofBundle {
    pub proof: Bytes,
    pub root: B256,
    pub input_nullifiers: Vec<B256>,
    pub output_commitments: Vec<B256>,
    /// `sum(outputs) + relayer_fee - sum(inputs)`: positive deposits, negative withdraws.
    pub public_amount: I256,
    pub ext_data_hash: B256,
}

impl ProofBundle {
    pub fn shape(&self) -> Option<CircuitShape> {
        CircuitShape::for_arity(self.input_nullifiers.len(), self.output_commitments.len())
    }

    /// Circuit public inputs; the circuit sees the public amount net of the fee.
    pub fn public_inputs(&self, relayer_fee: U256) -> Result<PublicInputs> {
        let fee = I256::try_from(relayer_fee).map_err(|_| PoolError::AmountOverflow)?;
        let net_amount = self
            .public_amount
            .checked_sub(fee)
            .ok_or(PoolError::AmountOverflow)?;
        Ok(PublicInputs {
            root: self.root,
            input_nullifiers: self.input_nullifiers.clone(),
            output_commitments: self.output_commitments.clone(),
            net_amount,
            ext_data_hash: self.ext_data_hash,
        })
    }

    fn to_abi(&self) -> ProofArgs {
        ProofArgs {
            proof: self.proof.clone(),
            root: self.root,
            inputNullifiers: self.input_nullifiers.clone(),
            outputCommitments: self.output_commitments.clone(),
            publicAmount: self.public_amount,
            extDataHash: self.ext_data_hash,
        }
    }

    fn from_abi(args: ProofArgs) -> Self {
        ProofBundle {
            proof: args.proof,
            root: args.root,
            input_nullifiers: args.inputNullifiers,
            output_commitments: args.outputCommitments,
            public_amount: args.publicAmount,
            ext_data_hash: args.extDataHash,
        }
    }
}

/// `abi.encode(ProofArgs, ExtData)` for bridge transit.
pub fn encode_bridge_payload(bundle: &ProofBundle, ext_data: &ExtData) -> Bytes {
    (bundle.to_abi(), ext_data.to_abi()).abi_encode_params().into()
}

/// Exact inverse of [`encode_bridge_payload`].
pub fn decode_bridge_payload(data: &[u8]) -> Result<(ProofBundle, ExtData)> {
    let (args, ext) = <(ProofArgs, ExtDataArgs)>::abi_decode_params(data)
        .map_err(|e| PoolError::Decode(format!("bridge payload: {e}")))?;
    Ok((ProofBundle::from_abi(args), ExtData::from_abi(ext)))
}
