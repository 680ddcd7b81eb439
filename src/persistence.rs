//! Snapshot persistence for ArgonChain
//!
//! The ledger itself lives in memory. A [`Persistence`] backend can store a
//! [`ChainSnapshot`] after each committed block and hand it back on start-up,
//! where it is verified before use. The snapshot records the Argon2 cost
//! parameters its hashes were made with, so it restores the same way whatever
//! the current configuration says. Wallet mnemonics are never part of it.

use crate::blockchain::{Block, Blockchain};
use crate::crypto::{HashParams, KeyedHasher};
use crate::error::ChainError;
use crate::transaction::{Amount, Transaction};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Bumped whenever the snapshot layout changes incompatibly.
pub const SNAPSHOT_VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub version: u32,
    pub difficulty: u32,
    pub mining_reward: Amount,
    pub hash_params: HashParams,
    pub blocks: Vec<Block>,
    pub pending: Vec<Transaction>,
}

impl ChainSnapshot {
    pub fn capture(chain: &Blockchain) -> Self {
        ChainSnapshot {
            version: SNAPSHOT_VERSION,
            difficulty: chain.difficulty(),
            mining_reward: chain.mining_reward(),
            hash_params: chain.hasher().params(),
            blocks: chain.chain().to_vec(),
            pending: chain.get_pending_transactions().to_vec(),
        }
    }

    /// Rebuilds and verifies the ledger with the hash parameters it was saved
    /// with. A snapshot that fails verification is an error.
    pub fn restore(self) -> Result<Blockchain, ChainError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(ChainError::SerializationError(format!(
                "Unsupported snapshot version {} (expected {})",
                self.version, SNAPSHOT_VERSION
            )));
        }
        let hasher = KeyedHasher::new(self.hash_params)?;
        Blockchain::from_parts(
            self.blocks,
            self.pending,
            self.difficulty,
            self.mining_reward,
            hasher,
        )
    }
}

/// Abstraction for persistence backends.
pub trait Persistence: Send + Sync {
    fn save_snapshot(&self, snapshot: &ChainSnapshot) -> Result<(), ChainError>;

    /// `Ok(None)` when nothing has been saved yet.
    fn load_snapshot(&self) -> Result<Option<ChainSnapshot>, ChainError>;

    fn save_blockchain(&self, chain: &Blockchain) -> Result<(), ChainError> {
        self.save_snapshot(&ChainSnapshot::capture(chain))
    }

    fn load_blockchain(&self) -> Result<Option<Blockchain>, ChainError> {
        match self.load_snapshot()? {
            Some(snapshot) => snapshot.restore().map(Some),
            None => Ok(None),
        }
    }
}

/// Stores the snapshot as pretty-printed JSON, replacing the file atomically.
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Persistence for JsonFilePersistence {
    fn save_snapshot(&self, snapshot: &ChainSnapshot) -> Result<(), ChainError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(snapshot)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        tracing::debug!(path = %self.path.display(), blocks = snapshot.blocks.len(), "snapshot saved");
        Ok(())
    }

    fn load_snapshot(&self) -> Result<Option<ChainSnapshot>, ChainError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }
}

/// Keeps the last snapshot in memory. Useful for tests.
#[derive(Debug, Default)]
pub struct InMemoryPersistence {
    snapshot: Mutex<Option<ChainSnapshot>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Persistence for InMemoryPersistence {
    fn save_snapshot(&self, snapshot: &ChainSnapshot) -> Result<(), ChainError> {
        *self.snapshot.lock() = Some(snapshot.clone());
        Ok(())
    }

    fn load_snapshot(&self) -> Result<Option<ChainSnapshot>, ChainError> {
        Ok(self.snapshot.lock().clone())
    }
}
