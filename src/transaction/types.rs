/// Transaction types for Aetherium Nova
use crate::crypto::{Address, KeyPair};
use crate::error::ChainError;
use crate::hashing::transaction_hash;
use serde::{Deserialize, Serialize};

/// What a transaction does. Each variant carries only its own target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxAction {
    /// Moves `amount` to another account.
    Transfer { to: Address, amount: f64 },
    /// Delegates `amount` to a validator.
    Stake {
        #[serde(rename = "to")]
        validator: Address,
        amount: f64,
    },
    /// Invokes a contract; confirms without any accounting effect.
    ContractCall {
        #[serde(rename = "to")]
        contract: Address,
        amount: f64,
    },
}

impl TxAction {
    /// Type tag hashed into the transaction.
    pub fn tag(&self) -> &'static str {
        match self {
            TxAction::Transfer { .. } => "TRANSFER",
            TxAction::Stake { .. } => "STAKE",
            TxAction::ContractCall { .. } => "CONTRACT_CALL",
        }
    }

    /// The `to` field: recipient, validator or contract.
    pub fn target(&self) -> &str {
        match self {
            TxAction::Transfer { to, .. } => to,
            TxAction::Stake { validator, .. } => validator,
            TxAction::ContractCall { contract, .. } => contract,
        }
    }

    pub fn amount(&self) -> f64 {
        match self {
            TxAction::Transfer { amount, .. }
            | TxAction::Stake { amount, .. }
            | TxAction::ContractCall { amount, .. } => *amount,
        }
    }

    /// Whether confirming this action debits the sender.
    pub fn is_spend(&self) -> bool {
        matches!(self, TxAction::Transfer { .. } | TxAction::Stake { .. })
    }
}

/// Transaction fields before hashing and signing.
#[derive(Debug, Clone, PartialEq)]
pub struct UnsignedTransaction {
    pub from: Address,
    pub timestamp: u64,
    pub action: TxAction,
}

impl UnsignedTransaction {
    pub fn transfer(from: Address, to: Address, amount: f64, timestamp: u64) -> Self {
        UnsignedTransaction {
            from,
            timestamp,
            action: TxAction::Transfer { to, amount },
        }
    }

    pub fn stake(from: Address, validator: Address, amount: f64, timestamp: u64) -> Self {
        UnsignedTransaction {
            from,
            timestamp,
            action: TxAction::Stake { validator, amount },
        }
    }

    pub fn contract_call(from: Address, contract: Address, amount: f64, timestamp: u64) -> Self {
        UnsignedTransaction {
            from,
            timestamp,
            action: TxAction::ContractCall { contract, amount },
        }
    }

    pub fn hash(&self) -> String {
        transaction_hash(
            &self.from,
            self.action.target(),
            self.action.amount(),
            self.timestamp,
            self.action.tag(),
        )
    }

    /// Hashes the fields and signs the hash, producing an immutable transaction.
    pub fn sign(self, keypair: &KeyPair) -> Result<Transaction, ChainError> {
        let hash = self.hash();
        let signature = keypair.sign_hash(&hash)?;
        Ok(Transaction {
            hash,
            from: self.from,
            timestamp: self.timestamp,
            action: self.action,
            signature,
        })
    }
}

/// A signed transaction. Never mutated after signing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: String,
    pub from: Address,
    pub timestamp: u64,
    #[serde(flatten)]
    pub action: TxAction,
    pub signature: String,
}

impl Transaction {
    /// Recomputes the hash from the signed fields, ignoring the stored one.
    pub fn compute_hash(&self) -> String {
        transaction_hash(
            &self.from,
            self.action.target(),
            self.action.amount(),
            self.timestamp,
            self.action.tag(),
        )
    }

    pub fn to(&self) -> &str {
        self.action.target()
    }

    pub fn amount(&self) -> f64 {
        self.action.amount()
    }

    pub fn tag(&self) -> &'static str {
        self.action.tag()
    }

    /// True when `address` is the sender or the target.
    pub fn involves(&self, address: &str) -> bool {
        self.from == address || self.to() == address
    }
}
