//! Wallet persistence for Aetherium Nova
//!
//! Only the active wallet survives a restart: its key pair, balance and stake
//! positions. The ledger, mempool and validator set start fresh every run.

use crate::blockchain::StakePosition;
use crate::crypto::{Address, KeyPair};
use crate::error::ChainError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// The stored form of a wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletRecord {
    pub public_key: Address,
    pub secret_key: String,
    pub balance: f64,
    #[serde(default)]
    pub stakes: Vec<StakePosition>,
}

impl WalletRecord {
    /// Rebuilds the signing key, refusing records whose halves disagree.
    pub fn keypair(&self) -> Result<KeyPair, ChainError> {
        let keypair = KeyPair::from_secret_hex(&self.secret_key)?;
        if keypair.public_key_hex() != self.public_key {
            return Err(ChainError::WalletError(
                "Stored public key does not match secret key".to_string(),
            ));
        }
        if !self.balance.is_finite() {
            return Err(ChainError::WalletError("Stored balance is not a number".to_string()));
        }
        Ok(keypair)
    }
}

/// Abstraction for wallet storage backends.
pub trait WalletStore: Send + Sync {
    /// The stored record, or `None` when nothing usable is stored.
    fn load(&self) -> Result<Option<WalletRecord>, ChainError>;
    fn save(&self, record: &WalletRecord) -> Result<(), ChainError>;
    fn clear(&self) -> Result<(), ChainError>;
}

/// One JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonWalletStore {
    path: PathBuf,
}

impl JsonWalletStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonWalletStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl WalletStore for JsonWalletStore {
    fn load(&self) -> Result<Option<WalletRecord>, ChainError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)?;
        let record = match serde_json::from_str::<WalletRecord>(&contents) {
            Ok(record) => record,
            Err(e) => {
                warn!("Discarding unreadable wallet record {}: {}", self.path.display(), e);
                self.clear()?;
                return Ok(None);
            }
        };
        if let Err(e) = record.keypair() {
            warn!("Discarding wallet record {}: {}", self.path.display(), e);
            self.clear()?;
            return Ok(None);
        }
        debug!("Loaded wallet record from {}", self.path.display());
        Ok(Some(record))
    }

    fn save(&self, record: &WalletRecord) -> Result<(), ChainError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        // Write then rename so a crash never leaves half a record behind.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(record)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), ChainError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Keeps the record in memory; used for headless runs and tests.
#[derive(Debug, Default)]
pub struct MemoryWalletStore {
    record: Mutex<Option<WalletRecord>>,
}

impl MemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WalletStore for MemoryWalletStore {
    fn load(&self) -> Result<Option<WalletRecord>, ChainError> {
        let guard = self
            .record
            .lock()
            .map_err(|_| ChainError::WalletError("Mutex poisoned".to_string()))?;
        Ok(guard.clone())
    }

    fn save(&self, record: &WalletRecord) -> Result<(), ChainError> {
        let mut guard = self
            .record
            .lock()
            .map_err(|_| ChainError::WalletError("Mutex poisoned".to_string()))?;
        *guard = Some(record.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), ChainError> {
        let mut guard = self
            .record
            .lock()
            .map_err(|_| ChainError::WalletError("Mutex poisoned".to_string()))?;
        *guard = None;
        Ok(())
    }
}
