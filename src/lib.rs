//! ArgonChain - a single-node ledger secured by memory-hard proof of work
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Ledger
//! - [`blockchain`] - Blocks, the ledger, balances and chain verification
//! - [`transaction`] - Transaction types, hashing and validation
//! - [`mempool`] - Pending transaction pool
//!
//! ## Consensus
//! - [`miner`] - Cancelable proof-of-work search
//!
//! ## Cryptography
//! - [`crypto`] - Argon2id keyed hashing, ECDSA keys and signatures (secp256k1)
//! - [`mnemonic`] - Word-list mnemonics and seed derivation
//!
//! ## State Management
//! - [`wallet`] - Key pairs from mnemonics, import/export, transaction authoring
//! - [`node`] - Shared ledger for concurrent callers
//! - [`persistence`] - JSON snapshots of the ledger
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//! - [`cli`] - CLI utilities

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;
pub mod mempool;
pub mod transaction;

// ============================================================================
// Consensus & Mining
// ============================================================================
pub mod miner;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;
pub mod mnemonic;

// ============================================================================
// State Management
// ============================================================================
pub mod node;
pub mod persistence;
pub mod wallet;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod cli;
pub mod config;
pub mod error;
