//! SP1 transaction circuit, large shape: 16 inputs, 16 outputs.
//!
//! Same relation as the small circuit; used for bulk deposits and payouts.
//! Public values are 35 x bytes32:
//!   [root, nullifier0..16, commitment0..16, netAmount, extDataHash]

#![no_main]
sp1_zkvm::entrypoint!(main);

use bridge_pool_lib::{evaluate, CircuitShape, TransactionWitness};

pub fn main() {
    let witness = sp1_zkvm::io::read::<TransactionWitness>();
    assert_eq!(witness.shape, CircuitShape::Large, "wrong circuit shape");

    let public = evaluate(&witness).unwrap_or_else(|err| panic!("invalid transaction: {err}"));

    sp1_zkvm::io::commit_slice(&public.encode());
}
