//! SP1 transaction circuit, small shape: 2 inputs, 2 outputs.
//!
//! Runs the transaction relation over a private witness and commits the
//! encoded public inputs (7 x bytes32):
//!   [root, nullifier0, nullifier1, commitment0, commitment1, netAmount, extDataHash]

#![no_main]
sp1_zkvm::entrypoint!(main);

use bridge_pool_lib::{evaluate, CircuitShape, TransactionWitness};

pub fn main() {
    let witness = sp1_zkvm::io::read::<TransactionWitness>();
    assert_eq!(witness.shape, CircuitShape::Small, "wrong circuit shape");

    let public = match evaluate(&witness) {
        Ok(public) => public,
        Err(err) => panic!("invalid transaction: {err}"),
    };

    sp1_zkvm::io::commit_slice(&public.encode());
}
