//! The ledger simulation
//!
//! One value owns everything that changes over time: the ledger, the account
//! state, the mempool, the validator keys and the active wallet. Callers drive
//! it through the submit operations and the two ticks ([`Simulation::produce_block`]
//! and [`Simulation::accrue_rewards`]); nothing here runs on its own.

use crate::blockchain::{Account, AccountState, Block, Blockchain, Validator};
use crate::config::{Config, SimulationConfig};
use crate::crypto::{Address, KeyPair};
use crate::economics::{from_units, is_valid_amount, to_units};
use crate::error::{ChainError, SubmitError};
use crate::mempool::Mempool;
use crate::persistence::WalletRecord;
use crate::producer::{BlockProducer, ValidatorKeyring};
use crate::transaction::{Transaction, UnsignedTransaction};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::VecDeque;
use tracing::{debug, info};

/// Live network figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStats {
    pub block_height: u64,
    /// Transactions in the last block divided by the block interval.
    pub tps: f64,
    pub active_validators: usize,
    pub mempool_size: usize,
}

pub struct Simulation {
    config: SimulationConfig,
    chain: Blockchain,
    state: AccountState,
    mempool: Mempool,
    producer: BlockProducer,
    wallet: Option<KeyPair>,
    /// Newest first.
    confirmed: VecDeque<Transaction>,
    last_tps: f64,
    rng: StdRng,
    last_timestamp: u64,
}

impl Simulation {
    /// Builds a fresh simulation: genesis only, empty mempool, no wallet.
    ///
    /// Validator keys are drawn from the simulation RNG, so a configured seed
    /// reproduces the same validator set.
    pub fn new(config: &Config) -> Result<Self, ChainError> {
        config.validate()?;
        let settings = config.simulation.clone();

        let mut rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut keyring = ValidatorKeyring::new();
        let validators: Vec<Validator> = config
            .validators
            .iter()
            .map(|v| Validator {
                public_key: keyring.insert(KeyPair::from_rng(&mut rng)),
                name: v.name.clone(),
                total_stake: v.total_stake,
                apr: v.apr,
            })
            .collect();

        let producer = BlockProducer::new(keyring)
            .with_max_transactions(settings.max_block_transactions)
            .with_selection(settings.selection.selector());

        info!(
            "Simulation ready with {} validators ({:?} selection)",
            validators.len(),
            settings.selection
        );

        Ok(Simulation {
            chain: Blockchain::with_retention(settings.retained_blocks),
            state: AccountState::new(validators),
            mempool: Mempool::new(),
            producer,
            wallet: None,
            confirmed: VecDeque::with_capacity(settings.retained_confirmed),
            last_tps: 0.0,
            rng,
            last_timestamp: 0,
            config: settings,
        })
    }

    /// Wall-clock milliseconds, forced strictly past the last issued stamp.
    fn stamp(&mut self, now: u64) -> u64 {
        let timestamp = now.max(self.last_timestamp + 1);
        self.last_timestamp = timestamp;
        timestamp
    }

    fn now_millis() -> u64 {
        u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
    }

    // ========================================================================
    // Wallet
    // ========================================================================

    /// Replaces the active wallet with a fresh key pair holding the initial
    /// grant. The previous wallet's account stays on the books.
    pub fn create_wallet(&mut self) -> Address {
        let keypair = KeyPair::generate();
        let address = keypair.public_key_hex();
        self.state
            .open_account(Account::new(address.clone(), self.config.initial_balance));
        self.wallet = Some(keypair);
        info!("Created wallet {}", address);
        address
    }

    /// Re-activates a stored wallet, balance and stake positions included.
    pub fn restore_wallet(&mut self, record: &WalletRecord) -> Result<Address, ChainError> {
        let keypair = record.keypair()?;
        let address = keypair.public_key_hex();
        self.state.open_account(Account {
            public_key: address.clone(),
            balance: record.balance,
            stakes: record.stakes.clone(),
        });
        self.wallet = Some(keypair);
        info!("Restored wallet {}", address);
        Ok(address)
    }

    /// The stored form of the active wallet.
    pub fn wallet_record(&self) -> Option<WalletRecord> {
        let keypair = self.wallet.as_ref()?;
        let account = self.state.account(&keypair.public_key_hex())?;
        Some(WalletRecord {
            public_key: account.public_key.clone(),
            secret_key: keypair.secret_key_hex(),
            balance: account.balance,
            stakes: account.stakes.clone(),
        })
    }

    pub fn wallet_address(&self) -> Option<Address> {
        self.wallet.as_ref().map(KeyPair::public_key_hex)
    }

    /// The active wallet's account.
    pub fn wallet(&self) -> Option<&Account> {
        let keypair = self.wallet.as_ref()?;
        self.state.account(&keypair.public_key_hex())
    }

    /// Balance minus everything the wallet already has pending.
    pub fn available_balance(&self) -> Option<f64> {
        let account = self.wallet()?;
        Some(from_units(self.available_units(&account.public_key)))
    }

    pub fn pending_spend(&self) -> f64 {
        self.wallet_address()
            .map(|address| self.mempool.pending_spend(&address))
            .unwrap_or(0.0)
    }

    // ========================================================================
    // Submissions
    // ========================================================================

    fn check_amount(amount: f64) -> Result<(), SubmitError> {
        if !is_valid_amount(amount) {
            return Err(SubmitError::InvalidAmount);
        }
        Ok(())
    }

    /// Confirmed balance net of pending spends, in base units. Block-time
    /// screening debits in the same units, so a spend accepted here stays funded.
    fn available_units(&self, address: &str) -> i128 {
        let balance = self.state.balance(address).unwrap_or(0.0);
        to_units(balance) - self.mempool.pending_units(address)
    }

    fn check_funds(&self, address: &str, amount: f64) -> Result<(), SubmitError> {
        let available = self.available_units(address);
        if available < to_units(amount) {
            return Err(SubmitError::InsufficientBalance {
                available: from_units(available),
                requested: amount,
            });
        }
        Ok(())
    }

    fn enqueue(&mut self, unsigned: UnsignedTransaction) -> Result<Transaction, SubmitError> {
        let keypair = self.wallet.as_ref().ok_or(SubmitError::NoWallet)?;
        let tx = self
            .mempool
            .submit(unsigned, keypair)
            .map_err(|e| SubmitError::Rejected(e.to_string()))?;
        debug!("Queued {} {} for {}", tx.tag(), tx.hash, tx.amount());
        Ok(tx)
    }

    /// Signs a transfer from the active wallet and queues it.
    ///
    /// Checks run in order: amount, funds net of pending spends, recipient.
    pub fn submit_transfer(
        &mut self,
        recipient: &str,
        amount: f64,
    ) -> Result<Transaction, SubmitError> {
        let from = self.wallet_address().ok_or(SubmitError::NoWallet)?;
        Self::check_amount(amount)?;
        self.check_funds(&from, amount)?;
        if recipient.len() < self.config.min_recipient_length {
            return Err(SubmitError::InvalidRecipient);
        }

        let timestamp = self.stamp(Self::now_millis());
        self.enqueue(UnsignedTransaction::transfer(
            from,
            recipient.to_string(),
            amount,
            timestamp,
        ))
    }

    /// Signs a stake from the active wallet and queues it.
    ///
    /// The position and the validator total only move once the block confirms.
    pub fn submit_stake(
        &mut self,
        validator: &str,
        amount: f64,
    ) -> Result<Transaction, SubmitError> {
        let from = self.wallet_address().ok_or(SubmitError::NoWallet)?;
        Self::check_amount(amount)?;
        self.check_funds(&from, amount)?;
        if self.state.validator(validator).is_none() {
            return Err(SubmitError::ValidatorNotFound);
        }

        let timestamp = self.stamp(Self::now_millis());
        self.enqueue(UnsignedTransaction::stake(
            from,
            validator.to_string(),
            amount,
            timestamp,
        ))
    }

    /// Moves all accrued rewards of the active wallet into its balance.
    pub fn claim_rewards(&mut self) -> Result<f64, SubmitError> {
        let address = self.wallet_address().ok_or(SubmitError::NoWallet)?;
        let claimed = self.state.claim_rewards(&address);
        if claimed > 0.0 {
            info!("Claimed {} in rewards for {}", claimed, address);
        }
        Ok(claimed)
    }

    // ========================================================================
    // Ticks
    // ========================================================================

    /// Block production tick at the current wall-clock time.
    pub fn produce_block(&mut self) -> Result<Option<Block>, ChainError> {
        self.produce_block_at(Self::now_millis())
    }

    /// Block production tick at `now` (milliseconds).
    ///
    /// Returns the appended block, or `None` for an idle cycle. Ledger, state
    /// and mempool change together or not at all.
    pub fn produce_block_at(&mut self, now: u64) -> Result<Option<Block>, ChainError> {
        if self.mempool.is_empty() {
            debug!("Mempool empty; idle cycle");
            return Ok(None);
        }

        self.mempool.prune_invalid();
        let candidates = self.mempool.eligible(self.producer.max_transactions());
        let (accepted, discarded) = self.state.screen(candidates);
        if !discarded.is_empty() {
            self.mempool.remove(discarded.iter().map(|tx| tx.hash.as_str()));
        }
        if accepted.is_empty() {
            return Ok(None);
        }

        let timestamp = self.stamp(now);
        let Some(block) = self.producer.produce(
            self.chain.tip(),
            accepted,
            self.state.validators(),
            timestamp,
            &mut self.rng,
        )?
        else {
            return Ok(None);
        };

        let next_state = self.state.with_block(&block)?;
        self.chain.append(block.clone())?;
        self.state = next_state;

        self.mempool
            .remove(block.transactions.iter().map(|tx| tx.hash.as_str()));
        for tx in block.transactions.iter().rev() {
            self.confirmed.push_front(tx.clone());
        }
        self.confirmed.truncate(self.config.retained_confirmed);
        self.last_tps = block.transactions.len() as f64 / self.config.block_interval_secs as f64;

        let validator = self
            .state
            .validator(&block.header.validator)
            .map(|v| v.name.as_str())
            .unwrap_or("unknown");
        info!(
            "Block #{} sealed by {} with {} transactions",
            block.index(),
            validator,
            block.transactions.len()
        );
        Ok(Some(block))
    }

    /// Reward accrual tick: one reward interval for every stake position.
    pub fn accrue_rewards(&mut self) -> usize {
        let accrued = self
            .state
            .accrue_rewards(self.config.reward_interval_secs as f64);
        if accrued > 0 {
            debug!("Accrued rewards on {} stake positions", accrued);
        }
        accrued
    }

    // ========================================================================
    // Read projections
    // ========================================================================

    pub fn network_stats(&self) -> NetworkStats {
        NetworkStats {
            block_height: self.chain.height(),
            tps: self.last_tps,
            active_validators: self.state.validators().len(),
            mempool_size: self.mempool.len(),
        }
    }

    /// Retained blocks, newest first.
    pub fn recent_blocks(&self) -> impl Iterator<Item = &Block> {
        self.chain.recent_blocks()
    }

    /// Recently confirmed transactions, newest first.
    pub fn confirmed_transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.confirmed.iter()
    }

    /// Confirmed transactions sent or received by the active wallet, newest
    /// first. Empty without a wallet.
    pub fn wallet_transactions(&self) -> impl Iterator<Item = &Transaction> {
        let address = self.wallet_address();
        self.confirmed
            .iter()
            .filter(move |tx| address.as_deref().is_some_and(|a| tx.involves(a)))
    }

    /// Pending transactions, oldest first.
    pub fn mempool_transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.mempool.transactions()
    }

    pub fn validators(&self) -> &[Validator] {
        self.state.validators()
    }

    pub fn chain(&self) -> &Blockchain {
        &self.chain
    }

    pub fn state(&self) -> &AccountState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECIPIENT: &str = "external-recipient-wallet";

    fn simulation() -> Simulation {
        let mut config = Config::default();
        config.simulation.seed = Some(7);
        Simulation::new(&config).unwrap()
    }

    #[test]
    fn test_new_simulation() {
        let sim = simulation();
        let stats = sim.network_stats();
        assert_eq!(stats.block_height, 0);
        assert_eq!(stats.tps, 0.0);
        assert_eq!(stats.active_validators, 6);
        assert_eq!(stats.mempool_size, 0);
        assert!(sim.recent_blocks().next().unwrap().is_genesis());
        assert!(sim.wallet().is_none());
    }

    #[test]
    fn test_seed_reproduces_validators() {
        let a = simulation();
        let b = simulation();
        assert_eq!(a.validators(), b.validators());
    }

    #[test]
    fn test_create_wallet_grants_initial_balance() {
        let mut sim = simulation();
        let address = sim.create_wallet();
        let account = sim.wallet().unwrap();
        assert_eq!(account.public_key, address);
        assert_eq!(account.balance, 1000.0);
        assert!(account.stakes.is_empty());

        let replacement = sim.create_wallet();
        assert_ne!(replacement, address);
        assert_eq!(sim.wallet_address(), Some(replacement));
    }

    #[test]
    fn test_submissions_need_a_wallet() {
        let mut sim = simulation();
        assert_eq!(sim.submit_transfer(RECIPIENT, 1.0), Err(SubmitError::NoWallet));
        let validator = sim.validators()[0].public_key.clone();
        assert_eq!(sim.submit_stake(&validator, 1.0), Err(SubmitError::NoWallet));
        assert_eq!(sim.claim_rewards(), Err(SubmitError::NoWallet));
    }

    #[test]
    fn test_pending_spends_guard_double_spend() {
        let mut sim = simulation();
        sim.create_wallet();

        assert!(sim.submit_transfer(RECIPIENT, 600.0).is_ok());
        assert_eq!(
            sim.submit_transfer(RECIPIENT, 600.0),
            Err(SubmitError::InsufficientBalance {
                available: 400.0,
                requested: 600.0
            })
        );
        assert_eq!(sim.available_balance(), Some(400.0));
        assert_eq!(sim.network_stats().mempool_size, 1);
    }

    #[test]
    fn test_check_order() {
        let mut sim = simulation();
        sim.create_wallet();

        assert_eq!(sim.submit_transfer(RECIPIENT, 0.0), Err(SubmitError::InvalidAmount));
        assert_eq!(sim.submit_transfer(RECIPIENT, f64::NAN), Err(SubmitError::InvalidAmount));
        // Funds are checked before the recipient.
        assert!(matches!(
            sim.submit_transfer("short", 5000.0),
            Err(SubmitError::InsufficientBalance { .. })
        ));
        assert_eq!(sim.submit_transfer("short", 5.0), Err(SubmitError::InvalidRecipient));
        assert_eq!(sim.submit_transfer("", 5.0), Err(SubmitError::InvalidRecipient));
        assert!(sim.submit_transfer("0123456789", 5.0).is_ok());

        assert!(matches!(
            sim.submit_stake("ghost", 5000.0),
            Err(SubmitError::InsufficientBalance { .. })
        ));
        assert_eq!(sim.submit_stake("ghost", 5.0), Err(SubmitError::ValidatorNotFound));
        assert_eq!(sim.network_stats().mempool_size, 1);
    }

    #[test]
    fn test_idle_tick() {
        let mut sim = simulation();
        assert!(sim.produce_block().unwrap().is_none());
        assert_eq!(sim.network_stats().block_height, 0);
    }

    #[test]
    fn test_transfer_confirms_in_next_block() {
        let mut sim = simulation();
        sim.create_wallet();
        let tx = sim.submit_transfer(RECIPIENT, 250.0).unwrap();

        let block = sim.produce_block().unwrap().unwrap();
        assert_eq!(block.index(), 1);
        assert_eq!(block.transactions, vec![tx.clone()]);

        assert_eq!(sim.wallet().unwrap().balance, 750.0);
        assert_eq!(sim.available_balance(), Some(750.0));
        assert_eq!(sim.mempool_transactions().count(), 0);
        assert_eq!(sim.confirmed_transactions().next(), Some(&tx));

        let stats = sim.network_stats();
        assert_eq!(stats.block_height, 1);
        assert_eq!(stats.tps, 1.0 / 3.0);
        assert!(sim.chain().validate_chain().is_ok());
    }

    #[test]
    fn test_stake_applies_on_confirmation() {
        let mut sim = simulation();
        sim.create_wallet();
        let validator = sim.validators()[2].clone();

        sim.submit_stake(&validator.public_key, 100.0).unwrap();
        assert!(sim.wallet().unwrap().stakes.is_empty());
        assert_eq!(sim.available_balance(), Some(900.0));

        sim.produce_block().unwrap().unwrap();
        let account = sim.wallet().unwrap();
        assert_eq!(account.balance, 900.0);
        assert_eq!(account.stake_for(&validator.public_key).unwrap().amount, 100.0);
        assert_eq!(
            sim.state().validator(&validator.public_key).unwrap().total_stake,
            validator.total_stake + 100.0
        );
    }

    #[test]
    fn test_rewards_accrue_and_claim() {
        let mut sim = simulation();
        sim.create_wallet();
        let validator = sim.validators()[0].public_key.clone();
        sim.submit_stake(&validator, 500.0).unwrap();

        // Nothing accrues while the stake is pending.
        assert_eq!(sim.accrue_rewards(), 0);
        sim.produce_block().unwrap().unwrap();
        assert_eq!(sim.accrue_rewards(), 1);
        assert_eq!(sim.accrue_rewards(), 1);

        let owed = sim.wallet().unwrap().total_rewards();
        assert!(owed > 0.0);
        assert_eq!(sim.claim_rewards(), Ok(owed));
        assert_eq!(sim.wallet().unwrap().balance, 500.0 + owed);
        assert_eq!(sim.claim_rewards(), Ok(0.0));
    }

    #[test]
    fn test_block_takes_at_most_twenty_oldest_first() {
        let mut sim = simulation();
        sim.create_wallet();
        let submitted: Vec<String> = (0..25)
            .map(|_| sim.submit_transfer(RECIPIENT, 1.0).unwrap().hash)
            .collect();

        let first = sim.produce_block().unwrap().unwrap();
        let hashes: Vec<String> = first.transactions.iter().map(|tx| tx.hash.clone()).collect();
        assert_eq!(hashes, submitted[..20].to_vec());
        assert_eq!(sim.network_stats().mempool_size, 5);

        let second = sim.produce_block().unwrap().unwrap();
        assert_eq!(second.transactions.len(), 5);
        assert_eq!(sim.network_stats().mempool_size, 0);
        assert_eq!(sim.wallet().unwrap().balance, 975.0);
    }

    #[test]
    fn test_confirmed_window_is_newest_first_and_capped() {
        let mut sim = simulation();
        sim.create_wallet();
        let mut last = String::new();
        for _ in 0..3 {
            for _ in 0..20 {
                last = sim.submit_transfer(RECIPIENT, 1.0).unwrap().hash;
            }
            sim.produce_block().unwrap().unwrap();
        }

        assert_eq!(sim.confirmed_transactions().count(), 50);
        // Within a block, transactions keep their block order at the front.
        let newest_block = sim.recent_blocks().next().unwrap();
        let front: Vec<&Transaction> = sim.confirmed_transactions().take(20).collect();
        assert_eq!(front, newest_block.transactions.iter().collect::<Vec<_>>());
        assert_eq!(newest_block.transactions.last().unwrap().hash, last);
    }

    #[test]
    fn test_ledger_window_and_monotonic_timestamps() {
        let mut sim = simulation();
        sim.create_wallet();
        for _ in 0..12 {
            sim.submit_transfer(RECIPIENT, 1.0).unwrap();
            // A fixed clock still yields increasing block timestamps.
            sim.produce_block_at(1_700_000_000_000).unwrap().unwrap();
        }

        assert_eq!(sim.chain().len(), 10);
        assert_eq!(sim.network_stats().block_height, 12);
        assert!(sim.chain().validate_chain().is_ok());
        let timestamps: Vec<u64> = sim.chain().blocks().map(|b| b.header.timestamp).collect();
        assert!(timestamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_restore_wallet() {
        let mut sim = simulation();
        sim.create_wallet();
        sim.submit_transfer(RECIPIENT, 100.0).unwrap();
        sim.produce_block().unwrap().unwrap();
        let record = sim.wallet_record().unwrap();
        assert_eq!(record.balance, 900.0);

        let mut fresh = simulation();
        let address = fresh.restore_wallet(&record).unwrap();
        assert_eq!(address, record.public_key);
        assert_eq!(fresh.wallet().unwrap().balance, 900.0);
        assert!(fresh.submit_transfer(RECIPIENT, 900.0).is_ok());
    }

    #[test]
    fn test_transfer_between_tracked_wallets() {
        let mut sim = simulation();
        let first = sim.create_wallet();
        sim.create_wallet();

        sim.submit_transfer(&first, 300.0).unwrap();
        sim.produce_block().unwrap().unwrap();
        assert_eq!(sim.state().balance(&first), Some(1300.0));
        assert_eq!(sim.wallet().unwrap().balance, 700.0);
    }

    #[test]
    fn test_accepted_fractional_spends_all_confirm() {
        let mut config = Config::default();
        config.simulation.seed = Some(7);
        config.simulation.initial_balance = 1.0;
        let mut sim = Simulation::new(&config).unwrap();
        sim.create_wallet();

        for amount in [0.3, 0.2, 0.5] {
            sim.submit_transfer(RECIPIENT, amount).unwrap();
        }
        assert_eq!(sim.available_balance(), Some(0.0));
        assert!(matches!(
            sim.submit_transfer(RECIPIENT, 0.000001),
            Err(SubmitError::InsufficientBalance { .. })
        ));

        let block = sim.produce_block().unwrap().unwrap();
        assert_eq!(block.transactions.len(), 3);
        assert_eq!(sim.network_stats().mempool_size, 0);
        assert_eq!(sim.wallet().unwrap().balance, 0.0);
    }

    #[test]
    fn test_dust_amounts_rejected() {
        let mut sim = simulation();
        sim.create_wallet();
        assert_eq!(sim.submit_transfer(RECIPIENT, 1e-7), Err(SubmitError::InvalidAmount));
        assert!(sim.submit_transfer(RECIPIENT, 0.000001).is_ok());
    }

    #[test]
    fn test_wallet_transactions_filter_confirmed() {
        let mut sim = simulation();
        assert_eq!(sim.wallet_transactions().count(), 0);

        let first = sim.create_wallet();
        let outgoing = sim.submit_transfer(RECIPIENT, 10.0).unwrap();
        sim.produce_block().unwrap().unwrap();
        let first_record = sim.wallet_record().unwrap();

        sim.create_wallet();
        let unrelated = sim.submit_transfer(RECIPIENT, 5.0).unwrap();
        let incoming = sim.submit_transfer(&first, 20.0).unwrap();
        // Pending transactions are not history yet.
        assert_eq!(sim.wallet_transactions().count(), 0);
        sim.produce_block().unwrap().unwrap();

        let mine: Vec<&Transaction> = sim.wallet_transactions().collect();
        assert_eq!(mine, vec![&unrelated, &incoming]);
        assert_eq!(sim.confirmed_transactions().count(), 3);

        sim.restore_wallet(&first_record).unwrap();
        let theirs: Vec<&Transaction> = sim.wallet_transactions().collect();
        assert_eq!(theirs, vec![&incoming, &outgoing]);
    }
}
