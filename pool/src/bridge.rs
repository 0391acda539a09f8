//! Cross-domain bridge adapter.
//!
//! Models the token bridge plus its message relay as explicit messages. A
//! deposit moves tokens from the bridge into pool custody and then calls
//! [`ShieldedPool::on_bridge_deposit`]; a cross-domain withdrawal is queued
//! by the pool and paid out on the far side by [`BridgeAdapter::relay_withdrawals`].
//!
//! Delivery is assumed at-most-once. The adapter does not deduplicate.

use alloy_primitives::{Address, Bytes, U256};
use tracing::{debug, info, warn};

use crate::error::{PoolError, Result};
use crate::ext_data::{encode_bridge_payload, ExtData, ProofBundle};
use crate::ledger::TokenLedger;
use crate::pool::{ShieldedPool, TransactReceipt};
use crate::prover::ProvingSystem;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BridgeMessage {
    /// Tokens bound for the pool with an encoded deposit bundle.
    Deposit {
        token: Address,
        amount: U256,
        data: Bytes,
    },
    /// Pool custody released towards `recipient` on the other ledger.
    Withdrawal {
        recipient: Address,
        amount: U256,
        l1_fee: U256,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BridgeAdapter {
    /// Account holding tokens in transit.
    pub address: Address,
    /// Receives the l1 fee of relayed withdrawals.
    pub fee_collector: Address,
}

impl BridgeAdapter {
    pub fn new(address: Address, fee_collector: Address) -> Self {
        BridgeAdapter {
            address,
            fee_collector,
        }
    }

    /// Wrap a prepared deposit for transit.
    pub fn deposit_message(&self, token: Address, bundle: &ProofBundle, ext_data: &ExtData) -> Result<BridgeMessage> {
        if !bundle.public_amount.is_positive() {
            return Err(PoolError::AmountMismatch("bridged transaction must be a deposit"));
        }
        Ok(BridgeMessage::Deposit {
            token,
            amount: bundle.public_amount.unsigned_abs(),
            data: encode_bridge_payload(bundle, ext_data),
        })
    }

    /// Take `amount` from `from` into the bridge, ahead of a deposit message.
    pub fn lock<L: TokenLedger>(&self, ledger: &mut L, from: Address, amount: U256) -> Result<()> {
        ledger.transfer(from, self.address, amount)?;
        debug!(%from, %amount, "tokens locked in bridge");
        Ok(())
    }

    /// Deliver a deposit: custody first, then the pool callback.
    ///
    /// A rejected deposit that was not rescued is returned to the bridge, so a
    /// failed delivery leaves balances as they were.
    pub fn deliver<V: ProvingSystem, L: TokenLedger>(
        &self,
        ledger: &mut L,
        pool: &mut ShieldedPool<V>,
        message: &BridgeMessage,
    ) -> Result<Option<TransactReceipt>> {
        match message {
            BridgeMessage::Deposit {
                token,
                amount,
                data,
            } => {
                let custody = pool.accounts().pool;
                ledger.transfer(self.address, custody, *amount)?;
                match pool.on_bridge_deposit(ledger, self.address, *token, *amount, data) {
                    Ok(receipt) => {
                        info!(%amount, leaves = pool.leaf_count(), "bridged deposit delivered");
                        Ok(Some(receipt))
                    }
                    Err(err) => {
                        let stranded = ledger
                            .balance_of(custody)
                            .saturating_sub(pool.last_balance())
                            .min(*amount);
                        if !stranded.is_zero() {
                            if let Err(refund) = ledger.transfer(custody, self.address, stranded) {
                                warn!(%refund, %stranded, "could not return rejected deposit to bridge");
                            } else {
                                warn!(%err, %stranded, "rejected deposit returned to bridge");
                            }
                        }
                        Err(err)
                    }
                }
            }
            BridgeMessage::Withdrawal { .. } => {
                self.pay_out(ledger, message)?;
                Ok(None)
            }
        }
    }

    /// Pay out queued cross-domain withdrawals in order. A message leaves the
    /// queue only once it has been paid; on error the rest stay queued.
    /// Returns how many were relayed.
    pub fn relay_withdrawals<V: ProvingSystem, L: TokenLedger>(
        &self,
        ledger: &mut L,
        pool: &mut ShieldedPool<V>,
    ) -> Result<usize> {
        let mut relayed = 0;
        while let Some(message) = pool.next_outbound().cloned() {
            self.pay_out(ledger, &message)?;
            pool.acknowledge_outbound();
            relayed += 1;
        }
        Ok(relayed)
    }

    fn pay_out<L: TokenLedger>(&self, ledger: &mut L, message: &BridgeMessage) -> Result<()> {
        let BridgeMessage::Withdrawal {
            recipient,
            amount,
            l1_fee,
        } = message
        else {
            return Err(PoolError::Decode("expected a withdrawal message".into()));
        };
        let net = amount
            .checked_sub(*l1_fee)
            .ok_or(PoolError::AmountMismatch("l1 fee exceeds the withdrawal"))?;
        let available = ledger.balance_of(self.address);
        if available < *amount {
            return Err(PoolError::InsufficientFunds {
                owner: self.address,
                available,
                required: *amount,
            });
        }
        ledger.transfer(self.address, *recipient, net)?;
        if !l1_fee.is_zero() {
            ledger.transfer(self.address, self.fee_collector, *l1_fee)?;
        }
        info!(%recipient, %net, %l1_fee, "cross-domain withdrawal relayed");
        Ok(())
    }
}
