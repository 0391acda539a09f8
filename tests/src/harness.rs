//! Shared fixtures: one pool, one token, one bridge.

use alloy_primitives::{address, Address, U256};
use anyhow::{ensure, Result};
use bridge_pool::{
    parse_amount, unspent_notes, BridgeAdapter, BridgeMessage, InMemoryToken, Keypair,
    PoolAccounts, PoolConfig, PreparedTransaction, ReferenceProver, ShieldedPool, TokenLedger,
    TransactReceipt, TransactionBuilder, TransactionRequest, Utxo,
};

pub const POOL: Address = address!("00000000000000000000000000000000000000a0");
pub const TOKEN: Address = address!("00000000000000000000000000000000000000a1");
pub const BRIDGE: Address = address!("00000000000000000000000000000000000000a2");
pub const FEE_COLLECTOR: Address = address!("00000000000000000000000000000000000000a3");
pub const FUNDER: Address = address!("00000000000000000000000000000000000000f0");
pub const RELAYER: Address = address!("00000000000000000000000000000000000000f1");
pub const RECIPIENT_A: Address = address!("28846f1Ec065eEa239152213373bb58B1C9Fc93B");
pub const RECIPIENT_B: Address = address!("DeaD00000000000000000000000000000000BEEf");

pub fn ether(s: &str) -> U256 {
    parse_amount(s).unwrap()
}

pub struct Fixture {
    pub pool: ShieldedPool<ReferenceProver>,
    pub token: InMemoryToken,
    pub bridge: BridgeAdapter,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    pub fn with_config(config: PoolConfig) -> Self {
        let accounts = PoolAccounts {
            pool: POOL,
            token: TOKEN,
            bridge: BRIDGE,
            rescue: None,
        };
        let pool = ShieldedPool::new(config, accounts, ReferenceProver::default()).unwrap();
        let mut token = InMemoryToken::new(TOKEN);
        token.mint(FUNDER, ether("100"));
        Fixture {
            pool,
            token,
            bridge: BridgeAdapter::new(BRIDGE, FEE_COLLECTOR),
        }
    }

    pub fn builder(&self) -> TransactionBuilder<ReferenceProver> {
        TransactionBuilder::for_pool(ReferenceProver::default(), &self.pool)
    }

    pub fn prepare(&self, request: &TransactionRequest<'_>) -> PreparedTransaction {
        self.builder().prepare_transaction(request).unwrap()
    }

    /// Deposit message for a single note, with the tokens already locked in the bridge.
    pub fn lock_deposit(&mut self, owner: &Keypair, amount: U256) -> BridgeMessage {
        let prepared = self.prepare(&TransactionRequest::new().output(Utxo::new(amount, owner)));
        self.bridge.lock(&mut self.token, FUNDER, amount).unwrap();
        self.bridge
            .deposit_message(TOKEN, &prepared.bundle, &prepared.ext_data)
            .unwrap()
    }

    pub fn bridge_deposit(&mut self, owner: &Keypair, amount: U256) -> TransactReceipt {
        let message = self.lock_deposit(owner, amount);
        self.bridge
            .deliver(&mut self.token, &mut self.pool, &message)
            .unwrap()
            .unwrap()
    }

    /// Direct deposit paid by `FUNDER`.
    pub fn deposit(&mut self, owner: &Keypair, amount: U256) -> TransactReceipt {
        let request = TransactionRequest::new().output(Utxo::new(amount, owner));
        self.submit(&request).unwrap()
    }

    pub fn submit(&mut self, request: &TransactionRequest<'_>) -> bridge_pool::Result<TransactReceipt> {
        self.builder()
            .transaction(&mut self.pool, &mut self.token, FUNDER, request)
    }

    pub fn submit_prepared(&mut self, prepared: &PreparedTransaction) -> bridge_pool::Result<TransactReceipt> {
        self.pool
            .transact(&mut self.token, FUNDER, &prepared.bundle, &prepared.ext_data)
    }

    pub fn single_note(&self, owner: &Keypair) -> Result<Utxo> {
        let mut notes = unspent_notes(owner, &self.pool)?;
        ensure!(notes.len() == 1, "expected one unspent note, found {}", notes.len());
        Ok(notes.remove(0))
    }

    pub fn balance(&self, account: Address) -> U256 {
        self.token.balance_of(account)
    }

    /// Everything a rejected transition must leave unchanged.
    pub fn state(&self) -> (alloy_primitives::B256, u32, usize, U256, U256) {
        (
            self.pool.last_root(),
            self.pool.leaf_count(),
            self.pool.events().len(),
            self.balance(POOL),
            self.balance(FUNDER),
        )
    }
}
