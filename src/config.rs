//! Configuration management for Aetherium Nova

use crate::consensus::SelectionPolicy;
use crate::error::ChainError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default = "default_validators")]
    pub validators: Vec<ValidatorConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_interval")]
    pub block_interval_secs: u64,
    #[serde(default = "default_interval")]
    pub reward_interval_secs: u64,
    #[serde(default = "default_max_block_transactions")]
    pub max_block_transactions: usize,
    #[serde(default = "default_retained_blocks")]
    pub retained_blocks: usize,
    #[serde(default = "default_retained_confirmed")]
    pub retained_confirmed: usize,
    #[serde(default = "default_initial_balance")]
    pub initial_balance: f64,
    #[serde(default = "default_min_recipient_length")]
    pub min_recipient_length: usize,
    #[serde(default)]
    pub selection: SelectionPolicy,
    /// Fixed RNG seed; entropy from the OS when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            wallet: WalletConfig::default(),
            validators: default_validators(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            block_interval_secs: default_interval(),
            reward_interval_secs: default_interval(),
            max_block_transactions: default_max_block_transactions(),
            retained_blocks: default_retained_blocks(),
            retained_confirmed: default_retained_confirmed(),
            initial_balance: default_initial_balance(),
            min_recipient_length: default_min_recipient_length(),
            selection: SelectionPolicy::default(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    #[serde(default = "default_wallet_path")]
    pub path: PathBuf,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            path: default_wallet_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ValidatorConfig {
    pub name: String,
    pub total_stake: f64,
    pub apr: f64,
}

impl ValidatorConfig {
    fn new(name: &str, total_stake: f64, apr: f64) -> Self {
        Self {
            name: name.to_string(),
            total_stake,
            apr,
        }
    }
}

impl Config {
    /// Rejects values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ChainError> {
        let sim = &self.simulation;
        if sim.block_interval_secs == 0 || sim.reward_interval_secs == 0 {
            return Err(ChainError::ConfigError(
                "simulation intervals must be at least one second".to_string(),
            ));
        }
        if sim.max_block_transactions == 0 {
            return Err(ChainError::ConfigError(
                "simulation.max_block_transactions must be positive".to_string(),
            ));
        }
        if sim.retained_blocks == 0 || sim.retained_confirmed == 0 {
            return Err(ChainError::ConfigError(
                "simulation retention windows must be positive".to_string(),
            ));
        }
        if !sim.initial_balance.is_finite() || sim.initial_balance < 0.0 {
            return Err(ChainError::ConfigError(
                "simulation.initial_balance must be a non-negative number".to_string(),
            ));
        }
        for v in &self.validators {
            if v.name.trim().is_empty() {
                return Err(ChainError::ConfigError("validator name must be set".to_string()));
            }
            if !v.total_stake.is_finite() || v.total_stake < 0.0 {
                return Err(ChainError::ConfigError(format!(
                    "validator {} has a negative stake",
                    v.name
                )));
            }
            if !v.apr.is_finite() || v.apr < 0.0 {
                return Err(ChainError::ConfigError(format!(
                    "validator {} has a negative APR",
                    v.name
                )));
            }
        }
        Ok(())
    }
}

/// Parses and validates a TOML document.
pub fn parse_config(contents: &str) -> Result<Config, ChainError> {
    let config: Config = toml::from_str(contents)?;
    config.validate()?;
    Ok(config)
}

/// Loads `path`, or `config.toml` in the working directory when `None`.
///
/// A missing file yields the defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, ChainError> {
    let path = path.unwrap_or_else(|| Path::new("config.toml"));
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = fs::read_to_string(path)?;
    parse_config(&contents)
}

fn default_interval() -> u64 {
    3
}

fn default_max_block_transactions() -> usize {
    crate::mempool::MAX_BLOCK_TRANSACTIONS
}

fn default_retained_blocks() -> usize {
    crate::blockchain::RETAINED_BLOCKS
}

fn default_retained_confirmed() -> usize {
    50
}

fn default_initial_balance() -> f64 {
    1000.0
}

fn default_min_recipient_length() -> usize {
    10
}

fn default_wallet_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".aetherium-nova")
        .join("wallet.json")
}

pub fn default_validators() -> Vec<ValidatorConfig> {
    vec![
        ValidatorConfig::new("Quantum Leap Validator", 12_500_000.0, 5.5),
        ValidatorConfig::new("Cosmic Node Solutions", 10_200_000.0, 5.8),
        ValidatorConfig::new("Cypher-State Digital", 8_900_000.0, 6.1),
        ValidatorConfig::new("Nova Syndicate", 15_100_000.0, 5.2),
        ValidatorConfig::new("Pioneer Staking", 7_500_000.0, 6.5),
        ValidatorConfig::new("Aether Stake Pool", 11_300_000.0, 5.7),
    ]
}
