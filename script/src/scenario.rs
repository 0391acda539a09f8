//! Local walkthroughs against the in-memory token and the reference prover.
//!
//!   a - deposit 0.1 through the bridge, withdraw 0.08 to an external account
//!   b - deposit 0.13, pay 0.06 to a second wallet, both withdraw; the first
//!       party exits through the bridge

use alloy_primitives::{address, utils::format_ether, Address, U256};
use anyhow::{ensure, Context, Result};
use bridge_pool::{
    parse_amount, unspent_notes, BridgeAdapter, InMemoryToken, Keypair, PoolAccounts, PoolConfig,
    ReferenceProver, ShieldedPool, TokenLedger, TransactReceipt, TransactionBuilder,
    TransactionRequest, Utxo,
};
use clap::ValueEnum;
use tracing::info;

const POOL: Address = address!("00000000000000000000000000000000000000a0");
const TOKEN: Address = address!("00000000000000000000000000000000000000a1");
const BRIDGE: Address = address!("00000000000000000000000000000000000000a2");
const FEE_COLLECTOR: Address = address!("00000000000000000000000000000000000000a3");
/// Funds bridged deposits on the far ledger.
const FUNDER: Address = address!("00000000000000000000000000000000000000f0");
/// Submits transactions on behalf of users.
const RELAYER: Address = address!("00000000000000000000000000000000000000f1");
const RECIPIENT_A: Address = address!("28846f1Ec065eEa239152213373bb58B1C9Fc93B");
const RECIPIENT_B: Address = address!("DeaD00000000000000000000000000000000BEEf");

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    A,
    B,
}

/// Final token balances by label.
pub type Balances = Vec<(&'static str, U256)>;

struct World {
    pool: ShieldedPool<ReferenceProver>,
    token: InMemoryToken,
    bridge: BridgeAdapter,
}

impl World {
    fn new(config: PoolConfig) -> Result<Self> {
        let accounts = PoolAccounts {
            pool: POOL,
            token: TOKEN,
            bridge: BRIDGE,
            rescue: None,
        };
        let pool = ShieldedPool::new(config, accounts, ReferenceProver::default())
            .context("failed to initialise pool")?;
        let mut token = InMemoryToken::new(TOKEN);
        token.mint(FUNDER, parse_amount("10")?);
        Ok(World {
            pool,
            token,
            bridge: BridgeAdapter::new(BRIDGE, FEE_COLLECTOR),
        })
    }

    fn bridge_deposit(&mut self, owner: &Keypair, amount: U256) -> Result<()> {
        let builder = TransactionBuilder::for_pool(ReferenceProver::default(), &self.pool);
        let prepared = builder
            .prepare_transaction(&TransactionRequest::new().output(Utxo::new(amount, owner)))
            .context("failed to prepare deposit")?;

        self.bridge.lock(&mut self.token, FUNDER, amount)?;
        let message = self
            .bridge
            .deposit_message(TOKEN, &prepared.bundle, &prepared.ext_data)?;
        self.bridge
            .deliver(&mut self.token, &mut self.pool, &message)
            .context("bridged deposit rejected")?;
        info!(amount = %format_ether(amount), "deposited through bridge");
        Ok(())
    }

    fn submit(&mut self, request: &TransactionRequest<'_>) -> Result<TransactReceipt> {
        let builder = TransactionBuilder::for_pool(ReferenceProver::default(), &self.pool);
        let receipt = builder
            .transaction(&mut self.pool, &mut self.token, RELAYER, request)
            .context("transaction rejected")?;
        Ok(receipt)
    }

    /// The only unspent note `owner` holds.
    fn single_note(&self, owner: &Keypair) -> Result<Utxo> {
        let mut notes = unspent_notes(owner, &self.pool)?;
        ensure!(notes.len() == 1, "expected one unspent note, found {}", notes.len());
        Ok(notes.remove(0))
    }

    fn balances(&self, accounts: &[(&'static str, Address)]) -> Balances {
        accounts
            .iter()
            .map(|(label, account)| (*label, self.token.balance_of(*account)))
            .collect()
    }
}

pub fn run(scenario: Scenario, config: PoolConfig) -> Result<Balances> {
    match scenario {
        Scenario::A => run_a(config),
        Scenario::B => run_b(config),
    }
}

fn run_a(config: PoolConfig) -> Result<Balances> {
    let mut world = World::new(config)?;
    let alice = Keypair::generate();

    let deposit = parse_amount("0.1")?;
    world.bridge_deposit(&alice, deposit)?;

    let withdraw = parse_amount("0.08")?;
    let note = world.single_note(&alice)?;
    let request = TransactionRequest::new()
        .input(note, &alice)
        .output(Utxo::new(deposit - withdraw, &alice))
        .recipient(RECIPIENT_B);
    world.submit(&request)?;
    info!(amount = %format_ether(withdraw), recipient = %RECIPIENT_B, "withdrawn");

    Ok(world.balances(&[
        ("recipient", RECIPIENT_B),
        ("bridge", BRIDGE),
        ("pool", POOL),
    ]))
}

fn run_b(config: PoolConfig) -> Result<Balances> {
    let mut world = World::new(config)?;
    let alice = Keypair::generate();
    let bob = Keypair::generate();

    world.bridge_deposit(&alice, parse_amount("0.13")?)?;

    // Alice only knows Bob's published address string.
    let bob_public = Keypair::from_string(&bob.address())?;
    let note = world.single_note(&alice)?;
    let request = TransactionRequest::new()
        .input(note, &alice)
        .output(Utxo::new(parse_amount("0.06")?, &bob_public))
        .output(Utxo::new(parse_amount("0.07")?, &alice));
    world.submit(&request)?;
    info!("alice paid bob inside the pool");

    let bob_note = world.single_note(&bob)?;
    let request = TransactionRequest::new()
        .input(bob_note, &bob)
        .recipient(RECIPIENT_B);
    world.submit(&request)?;

    let change = world.single_note(&alice)?;
    let request = TransactionRequest::new()
        .input(change, &alice)
        .recipient(RECIPIENT_A)
        .cross_domain(U256::ZERO);
    world.submit(&request)?;
    let relayed = world.bridge.relay_withdrawals(&mut world.token, &mut world.pool)?;
    info!(relayed, "cross-domain withdrawals relayed");

    Ok(world.balances(&[
        ("recipient-a", RECIPIENT_A),
        ("recipient-b", RECIPIENT_B),
        ("bridge", BRIDGE),
        ("pool", POOL),
    ]))
}
