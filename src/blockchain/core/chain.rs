use crate::crypto::{zero_signature, Address, KeyPair};
use crate::error::ChainError;
use crate::hashing::{block_hash, merkle_root, ZERO_HASH};
use crate::transaction::Transaction;
use once_cell::sync::Lazy;
use std::collections::VecDeque;

use super::validation::validate_block;

/// Number of blocks the ledger keeps by default.
pub const RETAINED_BLOCKS: usize = 10;

/// Genesis timestamp: 2023-01-01T00:00:00Z in milliseconds.
pub const GENESIS_TIMESTAMP: u64 = 1_672_531_200_000;

/// Header fields covered by the block hash.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    pub index: u64,
    pub timestamp: u64,
    pub previous_hash: String,
    pub merkle_root: String,
    pub validator: Address,
}

impl BlockHeader {
    pub fn hash(&self) -> String {
        block_hash(
            self.index,
            &self.previous_hash,
            self.timestamp,
            &self.merkle_root,
            &self.validator,
        )
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    #[serde(flatten)]
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
    pub hash: String,
    pub validator_signature: String,
}

static GENESIS: Lazy<Block> = Lazy::new(|| {
    let header = BlockHeader {
        index: 0,
        timestamp: GENESIS_TIMESTAMP,
        previous_hash: ZERO_HASH.to_string(),
        merkle_root: ZERO_HASH.to_string(),
        validator: ZERO_HASH.to_string(),
    };
    let hash = header.hash();
    Block {
        header,
        transactions: Vec::new(),
        hash,
        validator_signature: zero_signature(),
    }
});

impl Block {
    /// The fixed genesis sentinel. Computed once per process.
    pub fn genesis() -> Block {
        GENESIS.clone()
    }

    /// Assembles and signs the block that follows `previous`.
    ///
    /// Nothing is returned until every field, signature included, is computed.
    pub fn new(
        previous: &Block,
        timestamp: u64,
        transactions: Vec<Transaction>,
        validator: &KeyPair,
    ) -> Result<Self, ChainError> {
        let header = BlockHeader {
            index: previous.index() + 1,
            timestamp,
            previous_hash: previous.hash.clone(),
            merkle_root: Block::calculate_merkle_root(&transactions),
            validator: validator.public_key_hex(),
        };
        let hash = header.hash();
        let validator_signature = validator.sign_hash(&hash)?;

        Ok(Block {
            header,
            transactions,
            hash,
            validator_signature,
        })
    }

    pub fn index(&self) -> u64 {
        self.header.index
    }

    pub fn is_genesis(&self) -> bool {
        self.header.index == 0
    }

    pub fn calculate_merkle_root(transactions: &[Transaction]) -> String {
        let hashes: Vec<&str> = transactions.iter().map(|tx| tx.hash.as_str()).collect();
        merkle_root(&hashes)
    }
}

/// The ledger: a bounded window of the most recent blocks, oldest first.
#[derive(Debug, Clone)]
pub struct Blockchain {
    blocks: VecDeque<Block>,
    retained: usize,
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

impl Blockchain {
    /// A ledger holding only genesis, retaining [`RETAINED_BLOCKS`] blocks.
    pub fn new() -> Self {
        Self::with_retention(RETAINED_BLOCKS)
    }

    pub fn with_retention(retained: usize) -> Self {
        let mut blocks = VecDeque::with_capacity(retained.max(1));
        blocks.push_back(Block::genesis());
        Blockchain {
            blocks,
            retained: retained.max(1),
        }
    }

    /// The most recently appended block.
    pub fn tip(&self) -> &Block {
        // The window is never empty: genesis seeds it and eviction keeps at least one block.
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn height(&self) -> u64 {
        self.tip().index()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Retained blocks, oldest first.
    pub fn blocks(&self) -> impl DoubleEndedIterator<Item = &Block> {
        self.blocks.iter()
    }

    /// Retained blocks, newest first.
    pub fn recent_blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().rev()
    }

    pub fn get(&self, index: u64) -> Option<&Block> {
        self.blocks.iter().find(|b| b.index() == index)
    }

    /// Validates `block` against the tip and appends it, evicting the oldest
    /// block once the window is full. On error the ledger is untouched.
    pub fn append(&mut self, block: Block) -> Result<(), ChainError> {
        validate_block(self.tip(), &block)?;

        self.blocks.push_back(block);
        while self.blocks.len() > self.retained {
            self.blocks.pop_front();
        }
        Ok(())
    }

    /// Re-checks every link inside the retained window.
    pub fn validate_chain(&self) -> Result<(), ChainError> {
        for (previous, block) in self.blocks.iter().zip(self.blocks.iter().skip(1)) {
            validate_block(previous, block)?;
        }
        Ok(())
    }
}
