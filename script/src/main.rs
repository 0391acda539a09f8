//! Command-line front end for the bridge pool.
//!
//! Subcommands:
//!   keygen   - Generate a shielded keypair, optionally saving it as a wallet file
//!   address  - Decode and check an address string
//!   demo     - Run a local deposit/transfer/withdraw scenario
//!   config   - Print the pool configuration resolved from the environment
//!   vkeys    - Print the guest verification keys (feature `sp1`)
//!   prove    - Prove a witness file with the zkVM (feature `sp1`)

mod scenario;
#[cfg(feature = "sp1")]
mod sp1;

use std::fs;
use std::path::{Path, PathBuf};

use alloy_primitives::{utils::format_ether, B256};
use anyhow::{ensure, Context, Result};
use bridge_pool::{Keypair, PoolConfig, ShieldedAddress};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::scenario::Scenario;

#[derive(Parser)]
#[command(name = "bridge-pool")]
#[command(about = "Shielded pool with a cross-domain bridge path")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new shielded keypair
    Keygen {
        /// Write the spending key and address to this wallet file
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Decode an address string, or show the address of a wallet file
    Address {
        /// Address string ("0x" + 128 hex chars)
        #[arg(conflicts_with = "wallet")]
        address: Option<String>,
        /// Wallet file written by `keygen --out`
        #[arg(long)]
        wallet: Option<PathBuf>,
    },
    /// Run a scenario against an in-memory ledger
    Demo {
        #[arg(value_enum, default_value = "a")]
        scenario: Scenario,
    },
    /// Print the resolved pool configuration as JSON
    Config,
    /// Print the verification keys of the transaction guests
    #[cfg(feature = "sp1")]
    Vkeys,
    /// Prove a TransactionWitness JSON file
    #[cfg(feature = "sp1")]
    Prove {
        /// Path to JSON file with a TransactionWitness
        #[arg(long)]
        input: PathBuf,
        /// Path to write proof output JSON
        #[arg(long)]
        output: PathBuf,
        /// Just execute without generating a real proof (fast, for testing)
        #[arg(long, default_value = "false")]
        execute_only: bool,
    },
}

/// On-disk wallet.
#[derive(Serialize, Deserialize)]
struct WalletFile {
    spending_key: B256,
    address: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bridge_pool=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Keygen { out } => {
            let keypair = Keypair::generate();
            println!("{}", keypair.address());
            if let Some(path) = out {
                let wallet = WalletFile {
                    spending_key: *keypair.spending_key()?,
                    address: keypair.address(),
                };
                fs::write(&path, serde_json::to_string_pretty(&wallet)?)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("Wallet saved to {}", path.display());
            }
        }
        Commands::Address { address, wallet } => {
            let address = match (address, wallet) {
                (Some(address), _) => address,
                (None, Some(path)) => wallet_keypair(&path)?.address(),
                (None, None) => anyhow::bail!("pass an address string or --wallet"),
            };
            let decoded: ShieldedAddress = address.parse().context("invalid address")?;
            println!("Owner key:      {}", decoded.pubkey);
            println!("Encryption key: 0x{}", hex::encode(decoded.encryption_key));
        }
        Commands::Demo { scenario } => {
            let config = PoolConfig::from_env()?;
            println!("\n=== Scenario {scenario:?} ===\n");
            for (label, balance) in scenario::run(scenario, config)? {
                println!("{label:<12} {}", format_ether(balance));
            }
        }
        Commands::Config => {
            let config = PoolConfig::from_env()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        #[cfg(feature = "sp1")]
        Commands::Vkeys => {
            let prover = sp1::Sp1Prover::from_env();
            for (name, vkey) in prover.vkeys() {
                println!("{name}: {vkey}");
            }
        }
        #[cfg(feature = "sp1")]
        Commands::Prove {
            input,
            output,
            execute_only,
        } => {
            let json = fs::read_to_string(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let witness: bridge_pool_lib::TransactionWitness = serde_json::from_str(&json)?;
            let prover = sp1::Sp1Prover::from_env();
            if execute_only {
                let (public, cycles) = prover.execute(&witness)?;
                println!("Execution successful. Cycles: {cycles}");
                println!("Public values size: {} bytes", public.len());
                return Ok(());
            }
            let proof = prover.prove_to_file(&witness, &output)?;
            println!("Proof written to {} ({} bytes)", output.display(), proof);
        }
    }

    Ok(())
}

fn wallet_keypair(path: &Path) -> Result<Keypair> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let wallet: WalletFile = serde_json::from_str(&json).context("malformed wallet file")?;
    let keypair = Keypair::from_spending_key(wallet.spending_key);
    ensure!(
        keypair.address() == wallet.address,
        "wallet address does not match its spending key"
    );
    Ok(keypair)
}
