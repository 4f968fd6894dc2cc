//! Deterministic hashing of transaction and block fields.
//!
//! Every digest is SHA-256 rendered as 64 lowercase hex characters. Inputs are
//! the textual field representations concatenated without separators, so the
//! same fields always produce the same hash on every platform.

use sha2::{Digest, Sha256};

/// Length of a rendered digest.
pub const HASH_HEX_LEN: usize = 64;

/// The all-zero digest used by the genesis sentinel and the empty Merkle root.
pub const ZERO_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// SHA-256 of `data`, hex encoded.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Hash of a transaction's signed fields: `from ‖ to ‖ amount ‖ timestamp ‖ type`.
pub fn transaction_hash(from: &str, to: &str, amount: f64, timestamp: u64, tag: &str) -> String {
    let data = format!("{}{}{}{}{}", from, to, amount, timestamp, tag);
    sha256_hex(data.as_bytes())
}

/// Hash of a block header: `index ‖ previousHash ‖ timestamp ‖ merkleRoot ‖ validator`.
pub fn block_hash(
    index: u64,
    previous_hash: &str,
    timestamp: u64,
    merkle_root: &str,
    validator: &str,
) -> String {
    let data = format!(
        "{}{}{}{}{}",
        index, previous_hash, timestamp, merkle_root, validator
    );
    sha256_hex(data.as_bytes())
}

/// Binary Merkle root over an ordered list of hex hashes.
///
/// Odd levels duplicate their last element. An empty list yields [`ZERO_HASH`].
pub fn merkle_root<S: AsRef<str>>(hashes: &[S]) -> String {
    if hashes.is_empty() {
        return ZERO_HASH.to_string();
    }

    let mut level: Vec<String> = hashes.iter().map(|h| h.as_ref().to_string()).collect();
    while level.len() > 1 {
        if level.len() % 2 != 0 {
            let last = level[level.len() - 1].clone();
            level.push(last);
        }
        level = level
            .chunks(2)
            .map(|pair| sha256_hex(format!("{}{}", pair[0], pair[1]).as_bytes()))
            .collect();
    }
    level.swap_remove(0)
}
