//! Client-side transaction construction.
//!
//! A [`TransactionBuilder`] works against a snapshot of the commitment tree,
//! so proofs can be built off the pool's write path. The pool accepts any
//! root still in its history window; once the snapshot root is evicted the
//! builder must [`sync`](TransactionBuilder::sync) and rebuild.

use alloy_primitives::{Address, Bytes, I256, U256};
use bridge_pool_lib::{
    is_safe_amount, CircuitShape, IncrementalMerkleTree, InputWitness, MerkleError, MerklePath,
    TransactionWitness,
};
use tracing::debug;

use crate::error::{PoolError, Result};
use crate::ext_data::{ExtData, ProofBundle};
use crate::keypair::Keypair;
use crate::ledger::TokenLedger;
use crate::pool::{PoolEvent, ShieldedPool, TransactReceipt};
use crate::prover::ProvingSystem;
use crate::utxo::Utxo;

/// What to spend and what to create.
///
/// Each input is paired with the keypair that owns it; the key is only
/// borrowed while the witness is built.
#[derive(Clone, Debug, Default)]
pub struct TransactionRequest<'a> {
    pub inputs: Vec<(Utxo, &'a Keypair)>,
    pub outputs: Vec<Utxo>,
    pub recipient: Address,
    pub relayer: Address,
    pub relayer_fee: U256,
    pub is_cross_domain_withdrawal: bool,
    pub l1_fee: U256,
}

impl<'a> TransactionRequest<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, utxo: Utxo, keypair: &'a Keypair) -> Self {
        self.inputs.push((utxo, keypair));
        self
    }

    pub fn output(mut self, utxo: Utxo) -> Self {
        self.outputs.push(utxo);
        self
    }

    pub fn recipient(mut self, recipient: Address) -> Self {
        self.recipient = recipient;
        self
    }

    pub fn relayer(mut self, relayer: Address, fee: U256) -> Self {
        self.relayer = relayer;
        self.relayer_fee = fee;
        self
    }

    /// Route the withdrawal through the bridge, leaving `l1_fee` to it.
    pub fn cross_domain(mut self, l1_fee: U256) -> Self {
        self.is_cross_domain_withdrawal = true;
        self.l1_fee = l1_fee;
        self
    }
}

/// A proved transaction ready for submission.
#[derive(Clone, Debug)]
pub struct PreparedTransaction {
    pub bundle: ProofBundle,
    pub ext_data: ExtData,
    /// Output notes in commitment order, padding included.
    pub outputs: Vec<Utxo>,
}

pub struct TransactionBuilder<P> {
    prover: P,
    tree: IncrementalMerkleTree,
}

impl<P: ProvingSystem> TransactionBuilder<P> {
    pub fn new(prover: P, tree: IncrementalMerkleTree) -> Self {
        TransactionBuilder { prover, tree }
    }

    /// Builder over the pool's current tree.
    pub fn for_pool<V: ProvingSystem>(prover: P, pool: &ShieldedPool<V>) -> Self {
        Self::new(prover, pool.snapshot())
    }

    /// Builder over a tree rebuilt from published commitments.
    pub fn from_events(
        prover: P,
        levels: usize,
        root_history_size: usize,
        events: &[PoolEvent],
    ) -> Result<Self> {
        Ok(Self::new(
            prover,
            tree_from_events(levels, root_history_size, events)?,
        ))
    }

    /// Refresh the snapshot from the pool.
    pub fn sync<V: ProvingSystem>(&mut self, pool: &ShieldedPool<V>) {
        self.tree = pool.snapshot();
    }

    pub fn tree(&self) -> &IncrementalMerkleTree {
        &self.tree
    }

    pub fn prepare_transaction(&self, request: &TransactionRequest<'_>) -> Result<PreparedTransaction> {
        let shape = pick_shape(request.inputs.len(), request.outputs.len())?;

        let amounts = request
            .inputs
            .iter()
            .map(|(utxo, _)| &utxo.amount)
            .chain(request.outputs.iter().map(|utxo| &utxo.amount))
            .chain([&request.relayer_fee, &request.l1_fee]);
        for amount in amounts {
            if !is_safe_amount(amount) {
                return Err(PoolError::AmountOverflow);
            }
        }

        let levels = self.tree.levels();
        let mut inputs = Vec::with_capacity(shape.inputs());
        let mut sum_in = U256::ZERO;
        for (utxo, keypair) in &request.inputs {
            inputs.push(self.input_witness(utxo, keypair)?);
            sum_in += utxo.amount;
        }
        while inputs.len() < shape.inputs() {
            let keypair = Keypair::generate();
            inputs.push(InputWitness {
                note: Utxo::zero(&keypair).to_note(),
                spending_key: *keypair.spending_key()?,
                path: MerklePath::empty(levels),
            });
        }

        let mut outputs = request.outputs.clone();
        while outputs.len() < shape.outputs() {
            outputs.push(Utxo::zero(&Keypair::generate()));
        }
        let sum_out = outputs
            .iter()
            .fold(U256::ZERO, |acc, utxo| acc + utxo.amount);

        let public_amount = signed(sum_out + request.relayer_fee)? - signed(sum_in)?;
        if !is_safe_amount(&public_amount.unsigned_abs()) {
            return Err(PoolError::AmountOverflow);
        }

        let encrypted_outputs = outputs
            .iter()
            .map(Utxo::encrypt)
            .collect::<Result<Vec<Bytes>>>()?;
        let ext_data = ExtData {
            recipient: request.recipient,
            relayer: request.relayer,
            relayer_fee: request.relayer_fee,
            encrypted_outputs,
            is_cross_domain_withdrawal: request.is_cross_domain_withdrawal,
            l1_fee: request.l1_fee,
        };
        let ext_data_hash = ext_data.hash();

        let witness = TransactionWitness {
            shape,
            root: self.tree.root(),
            net_amount: public_amount - signed(request.relayer_fee)?,
            ext_data_hash,
            inputs,
            outputs: outputs.iter().map(Utxo::to_note).collect(),
        };
        let (proof, public) = self.prover.prove(&witness)?;
        debug!(
            ?shape,
            %public_amount,
            root = %public.root,
            "transaction prepared"
        );

        Ok(PreparedTransaction {
            bundle: ProofBundle {
                proof,
                root: public.root,
                input_nullifiers: public.input_nullifiers,
                output_commitments: public.output_commitments,
                public_amount,
                ext_data_hash,
            },
            ext_data,
            outputs,
        })
    }

    /// Prepare and submit in one step.
    ///
    /// Fails with [`PoolError::StaleRoot`] if the snapshot root has left the
    /// pool's history window; [`sync`](Self::sync) and retry.
    pub fn transaction<V: ProvingSystem, L: TokenLedger>(
        &self,
        pool: &mut ShieldedPool<V>,
        ledger: &mut L,
        sender: Address,
        request: &TransactionRequest<'_>,
    ) -> Result<TransactReceipt> {
        let root = self.tree.root();
        if !pool.is_known_root(root) {
            return Err(PoolError::StaleRoot(root));
        }
        let prepared = self.prepare_transaction(request)?;
        pool.transact(ledger, sender, &prepared.bundle, &prepared.ext_data)
    }

    fn input_witness(&self, utxo: &Utxo, keypair: &Keypair) -> Result<InputWitness> {
        let spending_key = *keypair.spending_key()?;
        if keypair.pubkey() != utxo.owner.pubkey {
            return Err(PoolError::OwnerMismatch);
        }
        let path = if utxo.amount.is_zero() {
            MerklePath {
                leaf_index: utxo.index.unwrap_or(0),
                ..MerklePath::empty(self.tree.levels())
            }
        } else {
            let commitment = utxo.commitment();
            let not_found = |err: MerkleError| match err {
                MerkleError::LeafNotFound | MerkleError::IndexOutOfRange(_) => {
                    PoolError::NotFound(commitment)
                }
                other => other.into(),
            };
            // A known index pins the leaf; identical commitments may sit elsewhere.
            match utxo.index {
                Some(index) => {
                    if self.tree.leaves().get(index as usize) != Some(&commitment) {
                        return Err(PoolError::NotFound(commitment));
                    }
                    self.tree.path(index).map_err(not_found)?
                }
                None => self.tree.prove_membership(&commitment).map_err(not_found)?,
            }
        };
        Ok(InputWitness {
            note: utxo.to_note(),
            spending_key,
            path,
        })
    }
}

fn pick_shape(inputs: usize, outputs: usize) -> Result<CircuitShape> {
    let largest = CircuitShape::Large;
    if inputs > largest.inputs() {
        return Err(PoolError::InsufficientInputs(inputs));
    }
    if outputs > largest.outputs() {
        return Err(PoolError::TooManyOutputs(outputs));
    }
    CircuitShape::fitting(inputs, outputs).ok_or(PoolError::InsufficientInputs(inputs))
}

fn signed(value: U256) -> Result<I256> {
    I256::try_from(value).map_err(|_| PoolError::AmountOverflow)
}

/// Rebuild the commitment tree from `NewCommitment` events.
pub fn tree_from_events(
    levels: usize,
    root_history_size: usize,
    events: &[PoolEvent],
) -> Result<IncrementalMerkleTree> {
    let mut commitments: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            PoolEvent::NewCommitment {
                commitment, index, ..
            } => Some((*index, *commitment)),
            _ => None,
        })
        .collect();
    commitments.sort_by_key(|(index, _)| *index);
    for (expected, (index, commitment)) in commitments.iter().enumerate() {
        if *index as usize != expected {
            return Err(PoolError::Decode(format!(
                "commitment {commitment} at index {index}, expected {expected}"
            )));
        }
    }
    let tree = IncrementalMerkleTree::from_leaves(
        levels,
        root_history_size,
        commitments.into_iter().map(|(_, commitment)| commitment),
    )?;
    Ok(tree)
}

/// Every note in `events` addressed to `keypair`, with its tree index.
pub fn scan_notes(keypair: &Keypair, events: &[PoolEvent]) -> Result<Vec<Utxo>> {
    keypair.spending_key()?;
    let notes = events
        .iter()
        .filter_map(|event| match event {
            PoolEvent::NewCommitment {
                commitment,
                index,
                encrypted_output,
            } => Utxo::decrypt(keypair, encrypted_output, *index)
                .ok()
                .filter(|utxo| utxo.commitment() == *commitment),
            _ => None,
        })
        .collect();
    Ok(notes)
}

/// Non-zero notes owned by `keypair` whose nullifier the pool has not seen.
pub fn unspent_notes<V: ProvingSystem>(keypair: &Keypair, pool: &ShieldedPool<V>) -> Result<Vec<Utxo>> {
    let mut unspent = Vec::new();
    for utxo in scan_notes(keypair, pool.events())? {
        if utxo.amount.is_zero() {
            continue;
        }
        if !pool.is_spent(&utxo.nullifier(keypair)?) {
            unspent.push(utxo);
        }
    }
    Ok(unspent)
}
