//! Aetherium Nova - a proof-of-stake ledger simulator
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Ledger
//! - [`blockchain`] - Blocks, the bounded ledger, validation and account state
//! - [`transaction`] - Transaction types, signing and validation
//! - [`mempool`] - Verifying transaction mempool
//!
//! ## Cryptography
//! - [`hashing`] - SHA-256 digests and Merkle roots
//! - [`crypto`] - Ed25519 keys, signatures and verification
//!
//! ## Consensus & Staking
//! - [`consensus`] - Validator selection
//! - [`producer`] - Block production and validator keys
//! - [`economics`] - Staking reward arithmetic
//!
//! ## Runtime
//! - [`simulation`] - The state-owning coordinator
//! - [`node`] - Periodic tasks around a shared simulation
//! - [`persistence`] - Wallet storage
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//! - [`cli`] - Console command interpreter

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;
pub mod mempool;
pub mod transaction;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;
pub mod hashing;

// ============================================================================
// Consensus & Staking
// ============================================================================
pub mod consensus;
pub mod economics;
pub mod producer;

// ============================================================================
// Runtime
// ============================================================================
pub mod node;
pub mod persistence;
pub mod simulation;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod cli;
pub mod config;
pub mod error;
