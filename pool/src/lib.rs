//! Shielded value-transfer pool with a cross-domain bridge path.
//!
//! Users hold notes whose commitments live in an append-only Merkle tree.
//! Spending a note reveals its nullifier and a proof over the transaction
//! relation in [`bridge_pool_lib::circuit`]; the [`ShieldedPool`] checks the
//! proof, the nullifiers and the bound [`ExtData`], then moves tokens.

pub mod bridge;
pub mod builder;
pub mod config;
pub mod error;
pub mod ext_data;
pub mod keypair;
pub mod ledger;
pub mod nullifier;
pub mod pool;
pub mod prover;
pub mod utxo;

pub use bridge::{BridgeAdapter, BridgeMessage};
pub use builder::{
    scan_notes, tree_from_events, unspent_notes, PreparedTransaction, TransactionBuilder,
    TransactionRequest,
};
pub use config::{parse_amount, PoolConfig};
pub use error::{PoolError, Result};
pub use ext_data::{decode_bridge_payload, encode_bridge_payload, ExtData, ProofBundle};
pub use keypair::{Keypair, ShieldedAddress};
pub use ledger::{InMemoryToken, TokenLedger};
pub use nullifier::NullifierSet;
pub use pool::{PoolAccounts, PoolEvent, ShieldedPool, TransactReceipt};
pub use prover::{ProvingSystem, ReferenceProver};
pub use utxo::Utxo;

pub use bridge_pool_lib as primitives;
