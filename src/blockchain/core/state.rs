use crate::crypto::Address;
use crate::economics::{credit, debit, reward_for_cycle, to_units};
use crate::error::ChainError;
use crate::transaction::{Transaction, TxAction};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use super::chain::Block;

/// A wallet's delegation to one validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakePosition {
    pub validator_address: Address,
    pub amount: f64,
    pub rewards: f64,
}

/// Public side of a wallet. Signing keys live elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub public_key: Address,
    pub balance: f64,
    pub stakes: Vec<StakePosition>,
}

impl Account {
    pub fn new(public_key: Address, balance: f64) -> Self {
        Account {
            public_key,
            balance,
            stakes: Vec::new(),
        }
    }

    pub fn stake_for(&self, validator: &str) -> Option<&StakePosition> {
        self.stakes.iter().find(|s| s.validator_address == validator)
    }

    pub fn total_staked(&self) -> f64 {
        self.stakes.iter().map(|s| s.amount).sum()
    }

    pub fn total_rewards(&self) -> f64 {
        self.stakes.iter().map(|s| s.rewards).sum()
    }

    fn add_stake(&mut self, validator: &str, amount: f64) {
        match self
            .stakes
            .iter_mut()
            .find(|s| s.validator_address == validator)
        {
            Some(position) => position.amount = credit(position.amount, amount),
            None => self.stakes.push(StakePosition {
                validator_address: validator.to_string(),
                amount,
                rewards: 0.0,
            }),
        }
    }
}

/// Public side of a validator. Its signing key is held by the block producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validator {
    pub public_key: Address,
    pub name: String,
    pub total_stake: f64,
    pub apr: f64,
}

/// Balances, stake positions and the validator set.
///
/// Only accounts registered here are tracked; anything else is an opaque
/// external wallet whose balance the simulation does not model.
#[derive(Debug, Clone, Default)]
pub struct AccountState {
    accounts: HashMap<Address, Account>,
    validators: Vec<Validator>,
}

impl AccountState {
    pub fn new(validators: Vec<Validator>) -> Self {
        AccountState {
            accounts: HashMap::new(),
            validators,
        }
    }

    pub fn open_account(&mut self, account: Account) {
        self.accounts.insert(account.public_key.clone(), account);
    }

    pub fn account(&self, address: &str) -> Option<&Account> {
        self.accounts.get(address)
    }

    pub fn balance(&self, address: &str) -> Option<f64> {
        self.accounts.get(address).map(|a| a.balance)
    }

    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    pub fn validator(&self, address: &str) -> Option<&Validator> {
        self.validators.iter().find(|v| v.public_key == address)
    }

    /// Whether `tx` can still be confirmed on top of this state.
    ///
    /// Spends from tracked accounts need the funds, compared in base units the
    /// same way the submission check nets out pending spends. Stakes need a
    /// known validator.
    pub fn can_apply(&self, tx: &Transaction) -> Result<(), ChainError> {
        if let TxAction::Stake { validator, .. } = &tx.action {
            if self.validator(validator).is_none() {
                return Err(ChainError::InvalidTransaction(format!(
                    "Unknown validator {}",
                    validator
                )));
            }
        }
        if tx.action.is_spend() {
            if let Some(sender) = self.accounts.get(&tx.from) {
                if to_units(sender.balance) < to_units(tx.amount()) {
                    return Err(ChainError::InvalidTransaction(format!(
                        "Insufficient balance: {} has {} but spends {}",
                        tx.from,
                        sender.balance,
                        tx.amount()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Applies one confirmed transaction.
    pub fn apply_transaction(&mut self, tx: &Transaction) -> Result<(), ChainError> {
        self.can_apply(tx)?;

        match &tx.action {
            TxAction::Transfer { to, amount } => {
                if let Some(sender) = self.accounts.get_mut(&tx.from) {
                    sender.balance = debit(sender.balance, *amount);
                }
                if let Some(recipient) = self.accounts.get_mut(to) {
                    recipient.balance = credit(recipient.balance, *amount);
                }
            }
            TxAction::Stake { validator, amount } => {
                if let Some(sender) = self.accounts.get_mut(&tx.from) {
                    sender.balance = debit(sender.balance, *amount);
                    sender.add_stake(validator, *amount);
                }
                let target = self
                    .validators
                    .iter_mut()
                    .find(|v| &v.public_key == validator);
                if let Some(target) = target {
                    target.total_stake = credit(target.total_stake, *amount);
                }
            }
            TxAction::ContractCall { .. } => {}
        }
        Ok(())
    }

    /// The state after confirming every transaction of `block`, or an error
    /// with `self` untouched.
    pub fn with_block(&self, block: &Block) -> Result<AccountState, ChainError> {
        let mut next = self.clone();
        for tx in &block.transactions {
            next.apply_transaction(tx)?;
        }
        Ok(next)
    }

    /// Splits candidates into those that confirm in order on top of this state
    /// and those that must be discarded.
    pub fn screen(&self, candidates: Vec<Transaction>) -> (Vec<Transaction>, Vec<Transaction>) {
        let mut scratch = self.clone();
        let mut accepted = Vec::with_capacity(candidates.len());
        let mut discarded = Vec::new();
        for tx in candidates {
            match scratch.apply_transaction(&tx) {
                Ok(()) => accepted.push(tx),
                Err(e) => {
                    warn!("Discarding transaction {}: {}", tx.hash, e);
                    discarded.push(tx);
                }
            }
        }
        (accepted, discarded)
    }

    /// Grows every stake position by one cycle of rewards. Returns how many
    /// positions accrued.
    pub fn accrue_rewards(&mut self, cycle_secs: f64) -> usize {
        let validators = &self.validators;
        let mut accrued = 0;
        for account in self.accounts.values_mut() {
            for position in &mut account.stakes {
                let Some(validator) = validators
                    .iter()
                    .find(|v| v.public_key == position.validator_address)
                else {
                    continue;
                };
                position.rewards +=
                    reward_for_cycle(position.amount, validator.apr, cycle_secs);
                accrued += 1;
            }
        }
        accrued
    }

    /// Moves all accrued rewards of `address` into its balance.
    ///
    /// Returns the amount claimed; zero means nothing changed.
    pub fn claim_rewards(&mut self, address: &str) -> f64 {
        let Some(account) = self.accounts.get_mut(address) else {
            return 0.0;
        };
        let total = account.total_rewards();
        if total == 0.0 {
            return 0.0;
        }
        for position in &mut account.stakes {
            position.rewards = 0.0;
        }
        account.balance += total;
        total
    }
}
