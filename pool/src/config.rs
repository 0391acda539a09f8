//! Pool parameters, fixed at construction.
//!
//! Environment overrides (a `.env` file is honoured):
//!   TREE_LEVELS                - Merkle tree depth (default: 5)
//!   ROOT_HISTORY_SIZE          - roots accepted for proofs (default: 30)
//!   MINIMUM_WITHDRAWAL_AMOUNT  - in ether units (default: 0.05)
//!   MAXIMUM_DEPOSIT_AMOUNT     - in ether units (default: 1)

use alloy_primitives::utils::parse_ether;
use alloy_primitives::U256;
use bridge_pool_lib::merkle::{DEFAULT_ROOT_HISTORY_SIZE, MAX_LEVELS};
use serde::{Deserialize, Serialize};

use crate::error::{PoolError, Result};

pub const DEFAULT_TREE_LEVELS: u8 = 5;
pub const DEFAULT_MINIMUM_WITHDRAWAL: &str = "0.05";
pub const DEFAULT_MAXIMUM_DEPOSIT: &str = "1";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub tree_levels: u8,
    pub root_history_size: usize,
    /// Smallest withdrawal paid out on the pool's own ledger (inclusive).
    pub minimum_withdrawal_amount: U256,
    /// Largest single deposit (inclusive).
    pub maximum_deposit_amount: U256,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            tree_levels: DEFAULT_TREE_LEVELS,
            root_history_size: DEFAULT_ROOT_HISTORY_SIZE,
            minimum_withdrawal_amount: ether(DEFAULT_MINIMUM_WITHDRAWAL),
            maximum_deposit_amount: ether(DEFAULT_MAXIMUM_DEPOSIT),
        }
    }
}

impl PoolConfig {
    /// Defaults overridden by environment variables.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        let defaults = PoolConfig::default();

        let config = PoolConfig {
            tree_levels: env_parse("TREE_LEVELS", defaults.tree_levels)?,
            root_history_size: env_parse("ROOT_HISTORY_SIZE", defaults.root_history_size)?,
            minimum_withdrawal_amount: env_ether(
                "MINIMUM_WITHDRAWAL_AMOUNT",
                defaults.minimum_withdrawal_amount,
            )?,
            maximum_deposit_amount: env_ether(
                "MAXIMUM_DEPOSIT_AMOUNT",
                defaults.maximum_deposit_amount,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let levels = self.tree_levels as usize;
        if levels == 0 || levels > MAX_LEVELS {
            return Err(PoolError::Config(format!(
                "tree_levels must be in 1..={MAX_LEVELS}, got {levels}"
            )));
        }
        if self.root_history_size == 0 {
            return Err(PoolError::Config("root_history_size must be non-zero".into()));
        }
        if !bridge_pool_lib::is_safe_amount(&self.maximum_deposit_amount) {
            return Err(PoolError::Config(
                "maximum_deposit_amount exceeds the field's safe range".into(),
            ));
        }
        Ok(())
    }
}

/// Parse a decimal ether amount ("0.05") into wei.
pub fn parse_amount(s: &str) -> Result<U256> {
    parse_ether(s.trim()).map_err(|e| PoolError::Config(format!("invalid amount {s:?}: {e}")))
}

fn ether(s: &str) -> U256 {
    parse_amount(s).unwrap_or_default()
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| PoolError::Config(format!("{key} must be a number, got {value:?}"))),
        Err(_) => Ok(default),
    }
}

fn env_ether(key: &str, default: U256) -> Result<U256> {
    match std::env::var(key) {
        Ok(value) => parse_amount(&value),
        Err(_) => Ok(default),
    }
}
