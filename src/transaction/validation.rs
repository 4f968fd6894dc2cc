/// Validation logic for transactions separated from type definitions
use crate::crypto::verify;
use crate::economics::{is_valid_amount, MAX_AMOUNT, MIN_AMOUNT};
use crate::error::ChainError;
use crate::transaction::types::Transaction;

impl Transaction {
    /// Recomputes the hash from the signed fields and checks the signature
    /// against the sender's public key. Never trusts the stored hash.
    pub fn verify_signature(&self) -> Result<(), ChainError> {
        let recomputed = self.compute_hash();
        if recomputed != self.hash {
            return Err(ChainError::InvalidTransaction(format!(
                "Hash mismatch: claimed {} but fields hash to {}",
                self.hash, recomputed
            )));
        }

        if !verify(&recomputed, &self.signature, &self.from) {
            return Err(ChainError::CryptoError(
                "Signature verification failed".to_string(),
            ));
        }

        Ok(())
    }

    /// Stateless validation: amount bounds, sender present, signature.
    pub fn validate(&self) -> Result<(), ChainError> {
        if self.from.is_empty() {
            return Err(ChainError::InvalidTransaction(
                "Sender address cannot be empty".to_string(),
            ));
        }

        let amount = self.amount();
        if !is_valid_amount(amount) {
            return Err(ChainError::InvalidTransaction(format!(
                "Amount must be between {} and {}, got {}",
                MIN_AMOUNT, MAX_AMOUNT, amount
            )));
        }

        self.verify_signature()
    }
}
