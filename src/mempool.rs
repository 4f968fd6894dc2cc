//! Transaction mempool
//!
//! Pending transactions wait here in submission order until a block picks
//! them up. Nothing enters the eligible set without passing admission: the
//! hash is recomputed from the signed fields and the signature re-verified,
//! whoever signed it.

use crate::crypto::{verify, KeyPair};
use crate::economics::{from_units, is_valid_amount, to_units};
use crate::error::ChainError;
use crate::transaction::{Transaction, UnsignedTransaction};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use tracing::{debug, warn};

/// Maximum number of transactions drawn into one block.
pub const MAX_BLOCK_TRANSACTIONS: usize = 20;

/// Why admission turned a transaction away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The stored hash does not match the signed fields.
    HashMismatch,
    /// The signature does not verify against the sender.
    BadSignature,
    /// Amount not finite or outside the accepted range.
    InvalidAmount,
    /// A transaction with the same hash is already pending.
    Duplicate,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Rejection::HashMismatch => write!(f, "hash does not match transaction fields"),
            Rejection::BadSignature => write!(f, "signature verification failed"),
            Rejection::InvalidAmount => write!(f, "amount out of range"),
            Rejection::Duplicate => write!(f, "transaction already pending"),
        }
    }
}

/// Result of the admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    Rejected(Rejection),
}

impl Admission {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Admission::Accepted)
    }

    pub fn reason(&self) -> Option<&Rejection> {
        match self {
            Admission::Accepted => None,
            Admission::Rejected(reason) => Some(reason),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Mempool {
    /// Oldest first.
    pending: VecDeque<Transaction>,
    hashes: HashSet<String>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.hashes.contains(hash)
    }

    /// Pending transactions, oldest first.
    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.pending.iter()
    }

    /// Independent re-verification of a transaction, without touching the pool.
    pub fn admit(tx: &Transaction) -> Admission {
        if tx.from.is_empty() || !is_valid_amount(tx.amount()) {
            return Admission::Rejected(Rejection::InvalidAmount);
        }
        if tx.compute_hash() != tx.hash {
            return Admission::Rejected(Rejection::HashMismatch);
        }
        if !verify(&tx.hash, &tx.signature, &tx.from) {
            return Admission::Rejected(Rejection::BadSignature);
        }
        Admission::Accepted
    }

    /// Hashes and signs `unsigned`, then queues it.
    ///
    /// Balance is the caller's concern (see [`Mempool::pending_spend`]).
    pub fn submit(
        &mut self,
        unsigned: UnsignedTransaction,
        keypair: &KeyPair,
    ) -> Result<Transaction, ChainError> {
        let tx = unsigned.sign(keypair)?;
        if self.contains(&tx.hash) {
            return Err(ChainError::InvalidTransaction(format!(
                "Transaction {} already pending",
                tx.hash
            )));
        }
        self.push(tx.clone());
        Ok(tx)
    }

    /// Queues a transaction signed elsewhere, after admission.
    pub fn insert(&mut self, tx: Transaction) -> Admission {
        if self.contains(&tx.hash) {
            return Admission::Rejected(Rejection::Duplicate);
        }
        let admission = Self::admit(&tx);
        match admission.reason() {
            None => self.push(tx),
            Some(reason) => debug!("Mempool rejected {}: {}", tx.hash, reason),
        }
        admission
    }

    fn push(&mut self, tx: Transaction) {
        self.hashes.insert(tx.hash.clone());
        self.pending.push_back(tx);
    }

    /// Sum of pending TRANSFER and STAKE amounts from `sender`, in base units.
    pub fn pending_units(&self, sender: &str) -> i128 {
        self.pending
            .iter()
            .filter(|tx| tx.from == sender && tx.action.is_spend())
            .map(|tx| to_units(tx.amount()))
            .sum()
    }

    /// Sum of pending TRANSFER and STAKE amounts from `sender`.
    pub fn pending_spend(&self, sender: &str) -> f64 {
        from_units(self.pending_units(sender))
    }

    /// Drops every pending transaction that fails admission. Returns the count.
    pub fn prune_invalid(&mut self) -> usize {
        let before = self.pending.len();
        let hashes = &mut self.hashes;
        self.pending.retain(|tx| {
            let admission = Self::admit(tx);
            if let Some(reason) = admission.reason() {
                warn!("Dropping pending transaction {}: {}", tx.hash, reason);
                hashes.remove(&tx.hash);
                false
            } else {
                true
            }
        });
        before - self.pending.len()
    }

    /// Up to `max` admitted transactions, oldest first. Does not remove them.
    pub fn eligible(&self, max: usize) -> Vec<Transaction> {
        self.pending
            .iter()
            .filter(|tx| Self::admit(tx).is_accepted())
            .take(max)
            .cloned()
            .collect()
    }

    /// Removes the given transactions; unknown hashes are ignored.
    pub fn remove<'a, I>(&mut self, hashes: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let doomed: HashSet<&str> = hashes.into_iter().collect();
        if doomed.is_empty() {
            return;
        }
        self.pending.retain(|tx| !doomed.contains(tx.hash.as_str()));
        self.hashes.retain(|h| !doomed.contains(h.as_str()));
    }
}
