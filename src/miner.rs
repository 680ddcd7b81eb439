//! Proof-of-work mining
//!
//! A block is mined by bumping its nonce until the hex digest starts with
//! `difficulty` `'0'` characters. Expected work grows as `16^difficulty`, so the
//! search takes a [`MiningControl`] that can cancel it or cap the attempts.

use crate::blockchain::Block;
use crate::crypto::KeyedHasher;
use crate::error::ChainError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How many attempts pass between two looks at the cancel flag.
pub const CANCEL_CHECK_INTERVAL: u64 = 64;

/// Cancellation and bounding for a mining run. Clones share the cancel flag, so
/// one clone can be handed to the worker and another kept to stop it.
#[derive(Debug, Clone, Default)]
pub struct MiningControl {
    cancelled: Arc<AtomicBool>,
    max_attempts: Option<u64>,
}

impl MiningControl {
    /// No cap; runs until a hash is found or [`MiningControl::cancel`] is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gives up with [`ChainError::MiningExhausted`] after `max_attempts` hashes.
    pub fn bounded(max_attempts: u64) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            max_attempts: Some(max_attempts),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn max_attempts(&self) -> Option<u64> {
        self.max_attempts
    }
}

/// Outcome of a successful mining run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MiningStats {
    pub attempts: u64,
    pub elapsed: Duration,
}

impl MiningStats {
    pub fn hash_rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.attempts as f64 / secs
        } else {
            0.0
        }
    }
}

/// True if `hash` starts with at least `difficulty` `'0'` characters.
pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    let difficulty = difficulty as usize;
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
}

/// Searches for a nonce that satisfies `difficulty`, updating `block.nonce` and
/// `block.hash` in place. The transaction digests are computed once up front,
/// since nothing but the nonce changes between attempts.
pub fn mine_block(
    block: &mut Block,
    difficulty: u32,
    hasher: &KeyedHasher,
    control: &MiningControl,
) -> Result<MiningStats, ChainError> {
    let started = Instant::now();
    let tx_digest = block.transactions_digest(hasher)?;
    let mut attempts: u64 = 0;

    loop {
        if attempts % CANCEL_CHECK_INTERVAL == 0 && control.is_cancelled() {
            tracing::warn!(index = block.index, attempts, "mining cancelled");
            return Err(ChainError::MiningCancelled);
        }
        if let Some(max) = control.max_attempts() {
            if attempts >= max {
                tracing::warn!(index = block.index, attempts, "mining attempt budget exhausted");
                return Err(ChainError::MiningExhausted { attempts });
            }
        }

        block.nonce = block.nonce.wrapping_add(1);
        block.hash = block.compute_hash_with_digest(hasher, &tx_digest)?;
        attempts += 1;

        if meets_difficulty(&block.hash, difficulty) {
            let stats = MiningStats {
                attempts,
                elapsed: started.elapsed(),
            };
            tracing::debug!(
                index = block.index,
                nonce = block.nonce,
                attempts,
                "proof of work found"
            );
            return Ok(stats);
        }
    }
}
