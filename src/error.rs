//! Error types for Aetherium Nova

use std::fmt;

/// Faults raised inside the ledger engine.
///
/// Verification failures are not faults: [`crate::crypto::verify`] reports
/// them as `false` and the mempool drops the offending transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainError {
    InvalidBlockLinkage,
    InvalidMerkleRoot,
    InvalidBlock(String),
    InvalidTransaction(String),
    CryptoError(String),
    WalletError(String),
    ConfigError(String),
    IoError(String),
    SerializationError(String),
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChainError::InvalidBlockLinkage => write!(f, "Invalid block linkage"),
            ChainError::InvalidMerkleRoot => write!(f, "Invalid Merkle root"),
            ChainError::InvalidBlock(msg) => write!(f, "Invalid block: {}", msg),
            ChainError::InvalidTransaction(msg) => write!(f, "Invalid transaction: {}", msg),
            ChainError::CryptoError(msg) => write!(f, "Cryptographic error: {}", msg),
            ChainError::WalletError(msg) => write!(f, "Wallet error: {}", msg),
            ChainError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            ChainError::IoError(msg) => write!(f, "IO error: {}", msg),
            ChainError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for ChainError {}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::SerializationError(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::ConfigError(err.to_string())
    }
}

/// Validation failures returned to whoever submitted a transfer or stake.
///
/// These never abort a tick; they are surfaced as an [`Outcome`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SubmitError {
    #[error("No active wallet.")]
    NoWallet,
    #[error("Please enter a valid amount.")]
    InvalidAmount,
    #[error("Insufficient balance (including pending transactions).")]
    InsufficientBalance { available: f64, requested: f64 },
    #[error("Invalid recipient address.")]
    InvalidRecipient,
    #[error("Validator not found.")]
    ValidatorNotFound,
    #[error("Transaction rejected by mempool: {0}")]
    Rejected(String),
}

/// The boolean-plus-message shape handed to display collaborators.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Outcome {
    pub success: bool,
    pub message: String,
}

impl Outcome {
    pub const SUBMITTED: &'static str = "Transaction submitted to mempool.";

    pub fn ok(message: impl Into<String>) -> Self {
        Outcome {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Outcome {
            success: false,
            message: message.into(),
        }
    }
}

impl<T> From<Result<T, SubmitError>> for Outcome {
    fn from(result: Result<T, SubmitError>) -> Self {
        match result {
            Ok(_) => Outcome::ok(Outcome::SUBMITTED),
            Err(e) => Outcome::failed(format!("Error: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_result() {
        let ok: Result<(), SubmitError> = Ok(());
        let outcome = Outcome::from(ok);
        assert!(outcome.success);
        assert_eq!(outcome.message, "Transaction submitted to mempool.");

        let err: Result<(), SubmitError> = Err(SubmitError::InsufficientBalance {
            available: 40.0,
            requested: 60.0,
        });
        let outcome = Outcome::from(err);
        assert!(!outcome.success);
        assert_eq!(
            outcome.message,
            "Error: Insufficient balance (including pending transactions)."
        );
    }

    #[test]
    fn test_chain_error_display() {
        assert_eq!(
            ChainError::InvalidBlock("bad index".to_string()).to_string(),
            "Invalid block: bad index"
        );
        assert_eq!(ChainError::InvalidMerkleRoot.to_string(), "Invalid Merkle root");
    }
}
