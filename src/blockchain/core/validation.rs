use crate::crypto::verify;
use crate::error::ChainError;
use crate::mempool::Mempool;
use std::collections::HashSet;

use super::chain::Block;

/// Checks that `block` is a well-formed successor of `previous`: index and
/// hash linkage, Merkle root, header hash, validator signature, and that every
/// transaction passes admission exactly once.
pub fn validate_block(previous: &Block, block: &Block) -> Result<(), ChainError> {
    if block.index() != previous.index() + 1 {
        return Err(ChainError::InvalidBlock(format!(
            "Invalid block index. Expected {}, but got {}.",
            previous.index() + 1,
            block.index()
        )));
    }

    if block.header.previous_hash != previous.hash {
        return Err(ChainError::InvalidBlockLinkage);
    }

    if Block::calculate_merkle_root(&block.transactions) != block.header.merkle_root {
        return Err(ChainError::InvalidMerkleRoot);
    }

    let expected_hash = block.header.hash();
    if expected_hash != block.hash {
        return Err(ChainError::InvalidBlock(format!(
            "Header hash mismatch. Expected {}, but got {}.",
            expected_hash, block.hash
        )));
    }

    if !verify(&block.hash, &block.validator_signature, &block.header.validator) {
        return Err(ChainError::InvalidBlock(
            "Validator signature does not verify".to_string(),
        ));
    }

    validate_transactions(block)
}

fn validate_transactions(block: &Block) -> Result<(), ChainError> {
    let mut seen = HashSet::new();
    for tx in &block.transactions {
        if !seen.insert(tx.hash.as_str()) {
            return Err(ChainError::InvalidBlock(format!(
                "Transaction {} included twice",
                tx.hash
            )));
        }
        if let Some(reason) = Mempool::admit(tx).reason() {
            return Err(ChainError::InvalidTransaction(format!(
                "{} in block {}: {}",
                tx.hash,
                block.index(),
                reason
            )));
        }
    }
    Ok(())
}
