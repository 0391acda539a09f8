use alloy_primitives::{B256, I256, U256};
use bridge_pool::{Keypair, PoolError, ShieldedAddress, TransactionRequest, Utxo};
use bridge_pool_lib::{evaluate, TransactionWitness};
use proptest::prelude::*;
use rand::Rng;

use crate::harness::*;

fn milli(n: u64) -> U256 {
    U256::from(n) * U256::from(10u64).pow(U256::from(15u64))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_address_round_trip(key in any::<[u8; 32]>()) {
        let keypair = Keypair::from_spending_key(B256::from(key));
        let address = keypair.address();
        prop_assert_eq!(address.len(), 130);

        let public = Keypair::from_string(&address).unwrap();
        prop_assert_eq!(public.pubkey(), keypair.pubkey());
        prop_assert_eq!(public.shielded_address(), keypair.shielded_address());
        prop_assert!(!public.can_spend());
    }

    #[test]
    fn test_truncated_address_is_rejected(key in any::<[u8; 32]>(), cut in 1usize..129) {
        let address = Keypair::from_spending_key(B256::from(key)).address();
        let result = address[..cut].parse::<ShieldedAddress>();
        prop_assert!(matches!(result, Err(PoolError::Decode(_))));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    /// Custody moves by `public_amount - relayer_fee`, which is `public_amount`
    /// when no relayer is paid, and the amounts always balance.
    #[test]
    fn test_conservation(deposit in 150u64..1000, keep in 0u64..50, fee in 0u64..3) {
        let mut fx = Fixture::new();
        let alice = Keypair::generate();

        let receipt = fx.deposit(&alice, milli(deposit));
        prop_assert_eq!(receipt.public_amount, I256::try_from(milli(deposit)).unwrap());
        prop_assert_eq!(fx.balance(POOL), milli(deposit));

        let note = fx.single_note(&alice).unwrap();
        let fee = milli(fee);
        let request = TransactionRequest::new()
            .input(note.clone(), &alice)
            .output(Utxo::new(milli(keep), &alice))
            .recipient(RECIPIENT_B)
            .relayer(RELAYER, fee);
        let before = fx.balance(POOL);
        let receipt = fx.submit(&request).unwrap();

        let sum_out = I256::try_from(milli(keep)).unwrap();
        let sum_in = I256::try_from(note.amount).unwrap();
        let fee_signed = I256::try_from(fee).unwrap();
        prop_assert_eq!(sum_out + fee_signed - sum_in, receipt.public_amount);

        let after = fx.balance(POOL);
        let change = I256::try_from(after).unwrap() - I256::try_from(before).unwrap();
        prop_assert_eq!(change, receipt.public_amount - fee_signed);
        prop_assert_eq!(fx.balance(RECIPIENT_B) + fx.balance(RELAYER) + after, milli(deposit));
    }
}

#[test]
fn test_witness_serialize_json() {
    let fx = Fixture::new();
    let alice = Keypair::generate();
    let prepared = fx.prepare(&TransactionRequest::new().output(Utxo::new(milli(5), &alice)));

    // Rebuild the witness the prover saw from the prepared outputs.
    let witness = TransactionWitness {
        shape: prepared.bundle.shape().unwrap(),
        root: prepared.bundle.root,
        net_amount: prepared.bundle.public_amount,
        ext_data_hash: prepared.bundle.ext_data_hash,
        inputs: (0..2)
            .map(|_| {
                let key = B256::from(rand::thread_rng().gen::<[u8; 32]>());
                let owner = Keypair::from_spending_key(key);
                bridge_pool_lib::InputWitness {
                    note: Utxo::zero(&owner).to_note(),
                    spending_key: key,
                    path: bridge_pool_lib::MerklePath::empty(fx.pool.tree().levels()),
                }
            })
            .collect(),
        outputs: prepared.outputs.iter().map(Utxo::to_note).collect(),
    };

    let json = serde_json::to_string(&witness).unwrap();
    let decoded: TransactionWitness = serde_json::from_str(&json).unwrap();
    let public = evaluate(&decoded).unwrap();
    assert_eq!(public, evaluate(&witness).unwrap());
    assert_eq!(public.output_commitments, prepared.bundle.output_commitments);
    assert_eq!(public.encode().len(), 32 * 7);
    assert!(!hex::encode(public.encode()).is_empty());
}
