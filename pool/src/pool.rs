//! The authoritative pool state machine.
//!
//! Owns the commitment tree and the nullifier set. Every entry point checks
//! all pre-conditions first and mutates only once they pass, so a rejected
//! submission leaves tree, nullifiers, balances and events untouched.

use std::collections::VecDeque;

use alloy_primitives::{Address, Bytes, B256, I256, U256};
use bridge_pool_lib::{is_safe_amount, IncrementalMerkleTree};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::bridge::BridgeMessage;
use crate::config::PoolConfig;
use crate::error::{PoolError, Result};
use crate::ext_data::{decode_bridge_payload, ExtData, ProofBundle};
use crate::keypair::ShieldedAddress;
use crate::ledger::TokenLedger;
use crate::nullifier::NullifierSet;
use crate::prover::ProvingSystem;

/// Accounts the pool interacts with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolAccounts {
    /// The pool's custody account.
    pub pool: Address,
    pub token: Address,
    /// The only caller allowed to use [`ShieldedPool::on_bridge_deposit`].
    pub bridge: Address,
    /// Receives bridged funds whose transaction was rejected.
    pub rescue: Option<Address>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PoolEvent {
    NewCommitment {
        commitment: B256,
        index: u32,
        encrypted_output: Bytes,
    },
    NewNullifier {
        nullifier: B256,
    },
    PublicKey {
        owner: Address,
        key: String,
    },
    CrossDomainWithdrawal {
        recipient: Address,
        amount: U256,
        l1_fee: U256,
    },
    BridgeFundsRescued {
        to: Address,
        amount: U256,
    },
}

/// Outcome of an accepted transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactReceipt {
    /// Leaf index of each output commitment, in output order.
    pub commitment_indices: Vec<u32>,
    pub root: B256,
    pub public_amount: I256,
}

/// Where a deposit's tokens come from.
#[derive(Clone, Copy, Debug)]
enum Funding {
    /// Pulled from the submitter during the transition.
    FromSender(Address),
    /// Already moved into custody by the bridge.
    Custodied,
}

pub struct ShieldedPool<V> {
    config: PoolConfig,
    accounts: PoolAccounts,
    verifier: V,
    tree: IncrementalMerkleTree,
    nullifiers: NullifierSet,
    /// Custody balance after the last settled transition.
    last_balance: U256,
    events: Vec<PoolEvent>,
    outbox: VecDeque<BridgeMessage>,
}

impl<V: ProvingSystem> ShieldedPool<V> {
    pub fn new(config: PoolConfig, accounts: PoolAccounts, verifier: V) -> Result<Self> {
        config.validate()?;
        let tree = IncrementalMerkleTree::with_root_history(
            config.tree_levels as usize,
            config.root_history_size,
        )?;
        info!(
            levels = config.tree_levels,
            history = config.root_history_size,
            pool = %accounts.pool,
            "shielded pool initialised"
        );
        Ok(ShieldedPool {
            config,
            accounts,
            verifier,
            tree,
            nullifiers: NullifierSet::new(),
            last_balance: U256::ZERO,
            events: Vec::new(),
            outbox: VecDeque::new(),
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn accounts(&self) -> &PoolAccounts {
        &self.accounts
    }

    pub fn last_root(&self) -> B256 {
        self.tree.root()
    }

    pub fn is_known_root(&self, root: B256) -> bool {
        self.tree.is_known_root(root)
    }

    pub fn is_spent(&self, nullifier: &B256) -> bool {
        self.nullifiers.contains(nullifier)
    }

    pub fn leaf_count(&self) -> u32 {
        self.tree.len()
    }

    pub fn last_balance(&self) -> U256 {
        self.last_balance
    }

    /// Read-only view of the commitment tree.
    pub fn tree(&self) -> &IncrementalMerkleTree {
        &self.tree
    }

    /// Owned copy of the tree for off-line proof building.
    pub fn snapshot(&self) -> IncrementalMerkleTree {
        self.tree.clone()
    }

    pub fn events(&self) -> &[PoolEvent] {
        &self.events
    }

    /// Oldest outbound bridge message not yet relayed.
    pub fn next_outbound(&self) -> Option<&BridgeMessage> {
        self.outbox.front()
    }

    /// Remove the oldest outbound message once the bridge has paid it.
    pub fn acknowledge_outbound(&mut self) -> Option<BridgeMessage> {
        self.outbox.pop_front()
    }

    pub fn pending_outbound(&self) -> usize {
        self.outbox.len()
    }

    /// Publish a shielded address for an account so senders can find it.
    pub fn register(&mut self, owner: Address, address: &ShieldedAddress) {
        self.events.push(PoolEvent::PublicKey {
            owner,
            key: address.to_string(),
        });
    }

    /// Validate and apply a transaction submitted by `sender`.
    ///
    /// A deposit pulls `public_amount` from `sender`.
    pub fn transact<L: TokenLedger>(
        &mut self,
        ledger: &mut L,
        sender: Address,
        bundle: &ProofBundle,
        ext_data: &ExtData,
    ) -> Result<TransactReceipt> {
        self.execute(ledger, bundle, ext_data, Funding::FromSender(sender))
            .inspect_err(|err| warn!(%err, "transaction rejected"))
    }

    /// Bridge callback: `amount` of `token` has already been moved into custody
    /// and `data` carries an encoded deposit bundle.
    ///
    /// Replays are not detected here beyond what the nullifier set catches;
    /// the bridge is assumed to deliver each message at most once.
    pub fn on_bridge_deposit<L: TokenLedger>(
        &mut self,
        ledger: &mut L,
        caller: Address,
        token: Address,
        amount: U256,
        data: &[u8],
    ) -> Result<TransactReceipt> {
        if caller != self.accounts.bridge {
            return Err(PoolError::UnauthorizedBridge(caller));
        }
        if token != self.accounts.token || ledger.token() != token {
            return Err(PoolError::UnsupportedToken(token));
        }

        let (bundle, ext_data) = decode_bridge_payload(data)?;
        if !bundle.public_amount.is_positive() {
            return Err(PoolError::AmountMismatch("bridged transaction must be a deposit"));
        }
        if bundle.public_amount.unsigned_abs() != amount {
            return Err(PoolError::AmountMismatch(
                "public amount differs from the bridged amount",
            ));
        }
        let received = ledger
            .balance_of(self.accounts.pool)
            .saturating_sub(self.last_balance);
        if received < amount {
            return Err(PoolError::AmountMismatch("bridge did not send enough tokens"));
        }

        match self.execute(ledger, &bundle, &ext_data, Funding::Custodied) {
            Ok(receipt) => Ok(receipt),
            Err(err) => {
                warn!(%err, %amount, "bridged transaction rejected");
                if let Some(rescue) = self.accounts.rescue {
                    match ledger.transfer(self.accounts.pool, rescue, received) {
                        Ok(()) => {
                            self.last_balance = ledger.balance_of(self.accounts.pool);
                            self.events.push(PoolEvent::BridgeFundsRescued {
                                to: rescue,
                                amount: received,
                            });
                            warn!(%rescue, %received, "bridged funds moved to rescue account");
                        }
                        Err(rescue_err) => {
                            warn!(%rescue, %rescue_err, "rescue transfer failed");
                        }
                    }
                }
                Err(err)
            }
        }
    }

    fn execute<L: TokenLedger>(
        &mut self,
        ledger: &mut L,
        bundle: &ProofBundle,
        ext_data: &ExtData,
        funding: Funding,
    ) -> Result<TransactReceipt> {
        self.validate(bundle, ext_data)?;

        let pool = self.accounts.pool;
        let amount = bundle.public_amount.unsigned_abs();
        let deposit = if bundle.public_amount.is_positive() { amount } else { U256::ZERO };
        let withdrawal = if bundle.public_amount.is_negative() { amount } else { U256::ZERO };

        let incoming = match funding {
            Funding::FromSender(sender) => {
                let available = ledger.balance_of(sender);
                if available < deposit {
                    return Err(PoolError::InsufficientFunds {
                        owner: sender,
                        available,
                        required: deposit,
                    });
                }
                deposit
            }
            Funding::Custodied => U256::ZERO,
        };
        let payouts = withdrawal + ext_data.relayer_fee;
        let custody = ledger.balance_of(pool) + incoming;
        if custody < payouts {
            return Err(PoolError::InsufficientFunds {
                owner: pool,
                available: custody,
                required: payouts,
            });
        }

        // All checks passed; from here on every step is covered by them.
        if let Funding::FromSender(sender) = funding {
            if !deposit.is_zero() {
                ledger.transfer(sender, pool, deposit)?;
            }
        }
        self.apply(ledger, bundle, ext_data, withdrawal)
    }

    /// Pre-conditions, in order: root, nullifiers, ext data binding, proof,
    /// amount policy, tree capacity.
    fn validate(&self, bundle: &ProofBundle, ext_data: &ExtData) -> Result<()> {
        if !self.tree.is_known_root(bundle.root) {
            return Err(PoolError::UnknownRoot(bundle.root));
        }

        for (i, nullifier) in bundle.input_nullifiers.iter().enumerate() {
            if self.nullifiers.contains(nullifier) || bundle.input_nullifiers[..i].contains(nullifier) {
                return Err(PoolError::DoubleSpend(*nullifier));
            }
        }

        let computed = ext_data.hash();
        if computed != bundle.ext_data_hash {
            return Err(PoolError::ExtDataMismatch {
                bound: bundle.ext_data_hash,
                computed,
            });
        }

        if ext_data.encrypted_outputs.len() != bundle.output_commitments.len() {
            return Err(PoolError::Decode(format!(
                "{} encrypted outputs for {} commitments",
                ext_data.encrypted_outputs.len(),
                bundle.output_commitments.len()
            )));
        }

        let amount = bundle.public_amount.unsigned_abs();
        if !is_safe_amount(&ext_data.relayer_fee) || !is_safe_amount(&amount) {
            return Err(PoolError::AmountOverflow);
        }
        let public = bundle.public_inputs(ext_data.relayer_fee)?;
        if bundle.shape().is_none() || !self.verifier.verify(&bundle.proof, &public)? {
            return Err(PoolError::InvalidProof);
        }

        if bundle.public_amount.is_positive() && amount > self.config.maximum_deposit_amount {
            return Err(PoolError::LimitExceeded("amount is larger than maximumDepositAmount"));
        }
        if bundle.public_amount.is_negative() {
            if ext_data.recipient == Address::ZERO {
                return Err(PoolError::ZeroRecipient);
            }
            if ext_data.is_cross_domain_withdrawal {
                if ext_data.l1_fee > amount {
                    return Err(PoolError::LimitExceeded("l1 fee is larger than the withdrawal"));
                }
            } else if amount < self.config.minimum_withdrawal_amount {
                return Err(PoolError::LimitExceeded("amount is less than minimumWithdrawalAmount"));
            }
        }

        if self.tree.remaining() < bundle.output_commitments.len() as u64 {
            return Err(PoolError::TreeFull);
        }
        Ok(())
    }

    fn apply<L: TokenLedger>(
        &mut self,
        ledger: &mut L,
        bundle: &ProofBundle,
        ext_data: &ExtData,
        withdrawal: U256,
    ) -> Result<TransactReceipt> {
        let pool = self.accounts.pool;

        if !withdrawal.is_zero() {
            if ext_data.is_cross_domain_withdrawal {
                ledger.transfer(pool, self.accounts.bridge, withdrawal)?;
                self.outbox.push_back(BridgeMessage::Withdrawal {
                    recipient: ext_data.recipient,
                    amount: withdrawal,
                    l1_fee: ext_data.l1_fee,
                });
                self.events.push(PoolEvent::CrossDomainWithdrawal {
                    recipient: ext_data.recipient,
                    amount: withdrawal,
                    l1_fee: ext_data.l1_fee,
                });
            } else {
                ledger.transfer(pool, ext_data.recipient, withdrawal)?;
            }
        }
        if !ext_data.relayer_fee.is_zero() {
            ledger.transfer(pool, ext_data.relayer, ext_data.relayer_fee)?;
        }

        let mut commitment_indices = Vec::with_capacity(bundle.output_commitments.len());
        for (commitment, encrypted_output) in bundle
            .output_commitments
            .iter()
            .zip(&ext_data.encrypted_outputs)
        {
            let index = self.tree.insert(*commitment)?;
            commitment_indices.push(index);
            self.events.push(PoolEvent::NewCommitment {
                commitment: *commitment,
                index,
                encrypted_output: encrypted_output.clone(),
            });
        }
        for nullifier in &bundle.input_nullifiers {
            self.nullifiers.insert(*nullifier);
            self.events.push(PoolEvent::NewNullifier {
                nullifier: *nullifier,
            });
        }
        self.last_balance = ledger.balance_of(pool);

        info!(
            public_amount = %bundle.public_amount,
            root = %self.tree.root(),
            leaves = self.tree.len(),
            "transaction accepted"
        );
        Ok(TransactReceipt {
            commitment_indices,
            root: self.tree.root(),
            public_amount: bundle.public_amount,
        })
    }
}
