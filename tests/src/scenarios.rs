use alloy_primitives::{Address, Bytes, B256, U256};
use bridge_pool::{
    encode_bridge_payload, BridgeMessage, Keypair, PoolConfig, PoolError, PoolEvent,
    TransactionRequest, Utxo,
};
use bridge_pool_lib::CircuitShape;

use crate::harness::*;

// ============================================================================
// Bridged scenarios
// ============================================================================

#[test]
fn test_scenario_a_deposit_via_bridge_then_withdraw() {
    let mut fx = Fixture::new();
    let alice = Keypair::generate();

    fx.bridge_deposit(&alice, ether("0.1"));
    assert_eq!(fx.balance(BRIDGE), U256::ZERO);
    assert_eq!(fx.balance(POOL), ether("0.1"));

    let note = fx.single_note(&alice).unwrap();
    let request = TransactionRequest::new()
        .input(note, &alice)
        .output(Utxo::new(ether("0.02"), &alice))
        .recipient(RECIPIENT_B);
    fx.submit(&request).unwrap();

    assert_eq!(fx.balance(RECIPIENT_B), ether("0.08"));
    assert_eq!(fx.balance(BRIDGE), U256::ZERO);
    assert_eq!(fx.balance(POOL), ether("0.02"));
    assert_eq!(fx.single_note(&alice).unwrap().amount, ether("0.02"));
}

#[test]
fn test_scenario_b_split_send_and_cross_domain_exit() {
    let mut fx = Fixture::new();
    let alice = Keypair::generate();
    let bob = Keypair::generate();

    fx.bridge_deposit(&alice, ether("0.13"));

    let bob_public = Keypair::from_string(&bob.address()).unwrap();
    let note = fx.single_note(&alice).unwrap();
    let request = TransactionRequest::new()
        .input(note, &alice)
        .output(Utxo::new(ether("0.06"), &bob_public))
        .output(Utxo::new(ether("0.07"), &alice));
    let receipt = fx.submit(&request).unwrap();
    assert!(receipt.public_amount.is_zero());

    let bob_note = fx.single_note(&bob).unwrap();
    assert_eq!(bob_note.amount, ether("0.06"));
    let request = TransactionRequest::new()
        .input(bob_note, &bob)
        .recipient(RECIPIENT_B);
    fx.submit(&request).unwrap();

    let change = fx.single_note(&alice).unwrap();
    assert_eq!(change.amount, ether("0.07"));
    let request = TransactionRequest::new()
        .input(change, &alice)
        .recipient(RECIPIENT_A)
        .cross_domain(U256::ZERO);
    fx.submit(&request).unwrap();
    assert_eq!(fx.balance(BRIDGE), ether("0.07"));
    assert!(fx.pool.events().iter().any(|e| matches!(
        e,
        PoolEvent::CrossDomainWithdrawal { recipient, .. } if *recipient == RECIPIENT_A
    )));

    let relayed = fx
        .bridge
        .relay_withdrawals(&mut fx.token, &mut fx.pool)
        .unwrap();
    assert_eq!(relayed, 1);

    assert_eq!(fx.balance(RECIPIENT_A), ether("0.07"));
    assert_eq!(fx.balance(RECIPIENT_B), ether("0.06"));
    assert_eq!(fx.balance(BRIDGE), U256::ZERO);
    assert_eq!(fx.balance(POOL), U256::ZERO);
}

#[test]
fn test_bridged_replay_is_rejected() {
    let mut fx = Fixture::new();
    let alice = Keypair::generate();
    let message = fx.lock_deposit(&alice, ether("0.1"));
    fx.bridge
        .deliver(&mut fx.token, &mut fx.pool, &message)
        .unwrap();
    let leaves = fx.pool.leaf_count();

    // Second delivery of the same message, with fresh custody.
    fx.bridge.lock(&mut fx.token, FUNDER, ether("0.1")).unwrap();
    let err = fx
        .bridge
        .deliver(&mut fx.token, &mut fx.pool, &message)
        .unwrap_err();
    assert!(matches!(err, PoolError::DoubleSpend(_)));
    assert_eq!(fx.pool.leaf_count(), leaves);
}

#[test]
fn test_bridged_withdrawal_bundle_is_rejected() {
    let mut fx = Fixture::new();
    let alice = Keypair::generate();
    fx.deposit(&alice, ether("0.1"));

    let note = fx.single_note(&alice).unwrap();
    let prepared = fx.prepare(
        &TransactionRequest::new()
            .input(note, &alice)
            .recipient(RECIPIENT_B),
    );
    let data = encode_bridge_payload(&prepared.bundle, &prepared.ext_data);
    let err = fx
        .pool
        .on_bridge_deposit(&mut fx.token, BRIDGE, TOKEN, ether("0.1"), &data)
        .unwrap_err();
    assert!(matches!(err, PoolError::AmountMismatch(_)));
    assert!(fx
        .bridge
        .deposit_message(TOKEN, &prepared.bundle, &prepared.ext_data)
        .is_err());
}

#[test]
fn test_garbage_bridge_payload_is_a_recoverable_decode_error() {
    let mut fx = Fixture::new();
    fx.bridge.lock(&mut fx.token, FUNDER, ether("0.1")).unwrap();
    let message = BridgeMessage::Deposit {
        token: TOKEN,
        amount: ether("0.1"),
        data: Bytes::from(vec![0xFF; 40]),
    };
    let err = fx
        .bridge
        .deliver(&mut fx.token, &mut fx.pool, &message)
        .unwrap_err();
    assert!(matches!(err, PoolError::Decode(_)));
    assert!(err.is_recoverable());
}

// ============================================================================
// Tampering and double spends
// ============================================================================

#[test]
fn test_tampered_ext_data_is_rejected() {
    let mut fx = Fixture::new();
    let alice = Keypair::generate();
    fx.deposit(&alice, ether("0.1"));
    let note = fx.single_note(&alice).unwrap();
    let prepared = fx.prepare(
        &TransactionRequest::new()
            .input(note, &alice)
            .recipient(RECIPIENT_B),
    );

    let mut tampered = Vec::new();
    let mut t = prepared.clone();
    t.ext_data.recipient = RECIPIENT_A;
    tampered.push(t);
    let mut t = prepared.clone();
    t.ext_data.relayer = RELAYER;
    tampered.push(t);
    let mut t = prepared.clone();
    t.ext_data.relayer_fee = U256::from(1u64);
    tampered.push(t);
    let mut t = prepared.clone();
    t.ext_data.is_cross_domain_withdrawal = true;
    tampered.push(t);
    let mut t = prepared.clone();
    t.ext_data.l1_fee = U256::from(1u64);
    tampered.push(t);
    for byte in [0usize, 30, 90] {
        let mut t = prepared.clone();
        let mut output = t.ext_data.encrypted_outputs[1].to_vec();
        output[byte] ^= 0x01;
        t.ext_data.encrypted_outputs[1] = output.into();
        tampered.push(t);
    }

    let before = fx.state();
    for t in &tampered {
        let err = fx.submit_prepared(t).unwrap_err();
        assert!(matches!(err, PoolError::ExtDataMismatch { .. }), "{err:?}");
        assert_eq!(fx.state(), before);
    }

    fx.submit_prepared(&prepared).unwrap();
    assert_eq!(fx.balance(RECIPIENT_B), ether("0.1"));
}

#[test]
fn test_double_spend_is_rejected_whatever_else_changes() {
    let mut fx = Fixture::new();
    let alice = Keypair::generate();
    fx.deposit(&alice, ether("0.1"));
    let note = fx.single_note(&alice).unwrap();

    let first = fx.prepare(
        &TransactionRequest::new()
            .input(note.clone(), &alice)
            .output(Utxo::new(ether("0.1"), &alice)),
    );
    let second = fx.prepare(
        &TransactionRequest::new()
            .input(note, &alice)
            .recipient(RECIPIENT_B),
    );
    fx.submit_prepared(&first).unwrap();

    let before = fx.state();
    let err = fx.submit_prepared(&second).unwrap_err();
    assert!(matches!(err, PoolError::DoubleSpend(_)));
    assert!(!err.is_recoverable());
    assert_eq!(fx.state(), before);
}

#[test]
fn test_forged_public_amount_is_rejected() {
    let mut fx = Fixture::new();
    let alice = Keypair::generate();
    fx.deposit(&alice, ether("0.1"));
    let note = fx.single_note(&alice).unwrap();
    let mut prepared = fx.prepare(
        &TransactionRequest::new()
            .input(note, &alice)
            .recipient(RECIPIENT_B),
    );
    prepared.bundle.public_amount = prepared.bundle.public_amount * alloy_primitives::I256::try_from(2).unwrap();

    let err = fx.submit_prepared(&prepared).unwrap_err();
    assert_eq!(err, PoolError::InvalidProof);
}

// ============================================================================
// Root history
// ============================================================================

#[test]
fn test_proof_against_recent_root_is_accepted() {
    let mut fx = Fixture::new();
    let alice = Keypair::generate();
    let bob = Keypair::generate();

    let early = fx.prepare(&TransactionRequest::new().output(Utxo::new(ether("0.1"), &alice)));
    for _ in 0..3 {
        fx.deposit(&bob, ether("0.01"));
    }
    assert_ne!(fx.pool.last_root(), early.bundle.root);

    let receipt = fx.submit_prepared(&early).unwrap();
    assert_eq!(receipt.commitment_indices, vec![6, 7]);
}

#[test]
fn test_proof_against_evicted_root_is_unknown() {
    let config = PoolConfig {
        root_history_size: 4,
        ..PoolConfig::default()
    };
    let mut fx = Fixture::with_config(config);
    let alice = Keypair::generate();

    let early = fx.prepare(&TransactionRequest::new().output(Utxo::new(ether("0.1"), &alice)));
    fx.deposit(&alice, ether("0.01"));
    assert!(fx.pool.is_known_root(early.bundle.root));
    fx.deposit(&alice, ether("0.01"));
    assert!(!fx.pool.is_known_root(early.bundle.root));

    let before = fx.state();
    let err = fx.submit_prepared(&early).unwrap_err();
    assert_eq!(err, PoolError::UnknownRoot(early.bundle.root));
    assert!(err.is_recoverable());
    assert_eq!(fx.state(), before);
}

// ============================================================================
// Policy limits
// ============================================================================

fn withdraw_exactly(fx: &mut Fixture, amount: U256, cross_domain: bool) -> bridge_pool::Result<()> {
    let alice = Keypair::generate();
    fx.deposit(&alice, amount);
    let note = fx.single_note(&alice).unwrap();
    let mut request = TransactionRequest::new()
        .input(note, &alice)
        .recipient(RECIPIENT_B);
    if cross_domain {
        request = request.cross_domain(U256::ZERO);
    }
    fx.submit(&request).map(|_| ())
}

#[test]
fn test_minimum_withdrawal_is_inclusive() {
    let mut fx = Fixture::new();
    let minimum = fx.pool.config().minimum_withdrawal_amount;

    withdraw_exactly(&mut fx, minimum, false).unwrap();
    assert_eq!(fx.balance(RECIPIENT_B), minimum);

    let err = withdraw_exactly(&mut fx, minimum - U256::from(1u64), false).unwrap_err();
    assert!(matches!(err, PoolError::LimitExceeded(_)));
    assert_eq!(fx.balance(RECIPIENT_B), minimum);
}

#[test]
fn test_cross_domain_withdrawal_ignores_minimum() {
    let mut fx = Fixture::new();
    let dust = ether("0.001");
    withdraw_exactly(&mut fx, dust, true).unwrap();
    assert_eq!(fx.balance(BRIDGE), dust);
}

#[test]
fn test_maximum_deposit_is_inclusive() {
    let mut fx = Fixture::new();
    let maximum = fx.pool.config().maximum_deposit_amount;
    let alice = Keypair::generate();

    fx.deposit(&alice, maximum);
    assert_eq!(fx.balance(POOL), maximum);

    let before = fx.state();
    let request = TransactionRequest::new().output(Utxo::new(maximum + U256::from(1u64), &alice));
    let err = fx.submit(&request).unwrap_err();
    assert!(matches!(err, PoolError::LimitExceeded(_)));
    assert_eq!(fx.state(), before);
}

#[test]
fn test_full_tree_rejects_before_mutation() {
    let config = PoolConfig {
        tree_levels: 2,
        ..PoolConfig::default()
    };
    let mut fx = Fixture::with_config(config);
    let alice = Keypair::generate();
    fx.deposit(&alice, ether("0.01"));
    fx.deposit(&alice, ether("0.01"));
    assert_eq!(fx.pool.tree().remaining(), 0);

    let before = fx.state();
    let request = TransactionRequest::new().output(Utxo::new(ether("0.01"), &alice));
    assert_eq!(fx.submit(&request).unwrap_err(), PoolError::TreeFull);
    assert_eq!(fx.state(), before);
}

// ============================================================================
// Shapes and fees
// ============================================================================

#[test]
fn test_bulk_payout_uses_large_shape() {
    let mut fx = Fixture::new();
    let alice = Keypair::generate();
    let payees: Vec<Keypair> = (0..5).map(|_| Keypair::generate()).collect();

    let mut request = TransactionRequest::new();
    for payee in &payees {
        request = request.output(Utxo::new(ether("0.01"), payee));
    }
    let prepared = fx.prepare(&request);
    assert_eq!(prepared.bundle.shape(), Some(CircuitShape::Large));
    fx.submit_prepared(&prepared).unwrap();
    assert_eq!(fx.pool.leaf_count(), 16);

    for payee in &payees {
        assert_eq!(fx.single_note(payee).unwrap().amount, ether("0.01"));
    }
    assert!(fx.single_note(&alice).is_err());
}

#[test]
fn test_relayer_fee_and_custody() {
    let mut fx = Fixture::new();
    let alice = Keypair::generate();
    fx.deposit(&alice, ether("0.1"));
    let note = fx.single_note(&alice).unwrap();

    let request = TransactionRequest::new()
        .input(note, &alice)
        .output(Utxo::new(ether("0.04"), &alice))
        .recipient(RECIPIENT_B)
        .relayer(RELAYER, ether("0.005"));
    let before = fx.balance(POOL);
    let receipt = fx.submit(&request).unwrap();

    // public amount = 0.04 + 0.005 - 0.1
    assert_eq!(receipt.public_amount.unsigned_abs(), ether("0.055"));
    assert!(receipt.public_amount.is_negative());
    assert_eq!(fx.balance(RECIPIENT_B), ether("0.055"));
    assert_eq!(fx.balance(RELAYER), ether("0.005"));
    assert_eq!(before - fx.balance(POOL), ether("0.06"));
    assert_eq!(fx.pool.last_balance(), fx.balance(POOL));
}

#[test]
fn test_zero_recipient_cannot_withdraw() {
    let mut fx = Fixture::new();
    let alice = Keypair::generate();
    fx.deposit(&alice, ether("0.1"));
    let note = fx.single_note(&alice).unwrap();
    let request = TransactionRequest::new()
        .input(note, &alice)
        .recipient(Address::ZERO);
    assert_eq!(fx.submit(&request).unwrap_err(), PoolError::ZeroRecipient);
}

#[test]
fn test_spent_notes_are_not_rescanned() {
    let mut fx = Fixture::new();
    let alice = Keypair::generate();
    fx.deposit(&alice, ether("0.1"));
    let note = fx.single_note(&alice).unwrap();
    let nullifier = note.nullifier(&alice).unwrap();

    let request = TransactionRequest::new()
        .input(note, &alice)
        .recipient(RECIPIENT_B);
    fx.submit(&request).unwrap();

    assert!(fx.pool.is_spent(&nullifier));
    assert!(bridge_pool::unspent_notes(&alice, &fx.pool).unwrap().is_empty());
    assert!(!fx.pool.is_spent(&B256::ZERO));
}
