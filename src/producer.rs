//! Block production: pick a validator, seal the selected transactions into a
//! signed block on top of the current tip.

use crate::blockchain::{Block, Validator};
use crate::consensus::{UniformSelection, ValidatorSelection};
use crate::crypto::{Address, KeyPair};
use crate::error::ChainError;
use crate::mempool::MAX_BLOCK_TRANSACTIONS;
use crate::transaction::Transaction;
use rand::RngCore;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Signing keys of the validators this process produces blocks for.
#[derive(Debug, Clone, Default)]
pub struct ValidatorKeyring {
    keys: HashMap<Address, KeyPair>,
}

impl ValidatorKeyring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `keypair` and returns its public key.
    pub fn insert(&mut self, keypair: KeyPair) -> Address {
        let address = keypair.public_key_hex();
        self.keys.insert(address.clone(), keypair);
        address
    }

    pub fn get(&self, address: &str) -> Option<&KeyPair> {
        self.keys.get(address)
    }
}

pub struct BlockProducer {
    max_transactions: usize,
    selection: Box<dyn ValidatorSelection>,
    keyring: ValidatorKeyring,
}

impl BlockProducer {
    pub fn new(keyring: ValidatorKeyring) -> Self {
        BlockProducer {
            max_transactions: MAX_BLOCK_TRANSACTIONS,
            selection: Box::new(UniformSelection),
            keyring,
        }
    }

    pub fn with_max_transactions(mut self, max_transactions: usize) -> Self {
        self.max_transactions = max_transactions.max(1);
        self
    }

    pub fn with_selection(mut self, selection: Box<dyn ValidatorSelection>) -> Self {
        self.selection = selection;
        self
    }

    pub fn max_transactions(&self) -> usize {
        self.max_transactions
    }

    /// Builds the next block from `transactions` (already selected, oldest
    /// first, at most `max_transactions`).
    ///
    /// Returns `Ok(None)` for an idle cycle: nothing to include, no validator,
    /// or no key for the chosen validator.
    pub fn produce(
        &self,
        tip: &Block,
        transactions: Vec<Transaction>,
        validators: &[Validator],
        timestamp: u64,
        rng: &mut dyn RngCore,
    ) -> Result<Option<Block>, ChainError> {
        if transactions.is_empty() {
            debug!("No eligible transactions; skipping block");
            return Ok(None);
        }

        let Some(validator) = self.selection.select(validators, rng) else {
            debug!("Validator set is empty; skipping block");
            return Ok(None);
        };

        let Some(keypair) = self.keyring.get(&validator.public_key) else {
            warn!("No signing key for validator {}; skipping block", validator.name);
            return Ok(None);
        };

        let mut transactions = transactions;
        transactions.truncate(self.max_transactions);

        Block::new(tip, timestamp, transactions, keypair).map(Some)
    }
}
