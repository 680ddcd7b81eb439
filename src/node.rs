//! Shared ledger handle for concurrent callers.
//!
//! [`Node`] wraps the [`Blockchain`] in a reader/writer lock. Admission and
//! commits take the write lock; queries take the read lock. Proof-of-work and
//! block verification run on a blocking worker with no lock held, so admission
//! keeps flowing while a block is being mined, and only one mining run is in
//! flight at a time.

use crate::blockchain::{Block, Blockchain};
use crate::error::{AdmissionError, ChainError};
use crate::miner::{mine_block, MiningControl, MiningStats};
use crate::persistence::{ChainSnapshot, Persistence};
use crate::transaction::{Amount, Transaction};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct Node {
    blockchain: Arc<RwLock<Blockchain>>,
    mining: Arc<tokio::sync::Mutex<()>>,
    persistence: Option<Arc<dyn Persistence>>,
}

impl Node {
    pub fn new(blockchain: Blockchain) -> Self {
        Self {
            blockchain: Arc::new(RwLock::new(blockchain)),
            mining: Arc::new(tokio::sync::Mutex::new(())),
            persistence: None,
        }
    }

    /// Saves a snapshot after every committed block.
    pub fn with_persistence(mut self, persistence: Arc<dyn Persistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Check-and-append is atomic: two concurrent spends of the same funds
    /// cannot both be admitted.
    pub fn add_transaction(&self, tx: Transaction) -> Result<(), AdmissionError> {
        self.blockchain.write().add_transaction(tx)
    }

    pub fn get_balance(&self, address: &str) -> Amount {
        self.blockchain.read().get_balance(address)
    }

    pub fn get_pending_transactions(&self) -> Vec<Transaction> {
        self.blockchain.read().get_pending_transactions().to_vec()
    }

    pub fn latest_block(&self) -> Block {
        self.blockchain.read().get_latest().clone()
    }

    pub fn chain_len(&self) -> usize {
        self.blockchain.read().len()
    }

    pub fn chain_snapshot(&self) -> ChainSnapshot {
        ChainSnapshot::capture(&self.blockchain.read())
    }

    /// Verifies a copy of the chain so writers are not held up by the check.
    pub fn is_valid_chain(&self) -> bool {
        let (blocks, hasher) = {
            let chain = self.blockchain.read();
            (chain.chain().to_vec(), chain.hasher().clone())
        };
        match crate::blockchain::verify_blocks(&blocks, &hasher) {
            Ok(()) => true,
            Err(e) => {
                warn!("chain verification failed: {}", e);
                false
            }
        }
    }

    /// Runs `f` with read access to the ledger.
    pub fn with_chain<R>(&self, f: impl FnOnce(&Blockchain) -> R) -> R {
        f(&self.blockchain.read())
    }

    /// Mines the current pool into a new block and appends it.
    ///
    /// Transactions admitted while the search runs stay pending for the next
    /// block. If another writer moved the chain tip meanwhile the result is
    /// [`ChainError::StaleTemplate`] and nothing is appended.
    pub async fn mine_pending(
        &self,
        miner_address: &str,
        control: MiningControl,
    ) -> Result<(Block, MiningStats), ChainError> {
        let _mining = self.mining.lock().await;

        let (mut template, hasher) = {
            let chain = self.blockchain.read();
            (chain.prepare_block(miner_address)?, chain.hasher().clone())
        };
        let difficulty = template.difficulty();
        info!(
            index = template.block.index,
            transactions = template.block.transactions.len(),
            difficulty,
            "mining started"
        );

        let (verified, stats) = tokio::task::spawn_blocking(move || {
            let stats = mine_block(&mut template.block, difficulty, &hasher, &control)?;
            let verified = template.verify(&hasher)?;
            Ok::<_, ChainError>((verified, stats))
        })
        .await
        .map_err(|e| ChainError::WorkerFailed(e.to_string()))??;

        let (block, snapshot) = {
            let mut chain = self.blockchain.write();
            let block = chain.commit_verified(verified)?.clone();
            let snapshot = self
                .persistence
                .as_ref()
                .map(|_| ChainSnapshot::capture(&chain));
            (block, snapshot)
        };
        info!(
            index = block.index,
            attempts = stats.attempts,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "mining finished"
        );

        if let (Some(persistence), Some(snapshot)) = (&self.persistence, snapshot) {
            if let Err(e) = persistence.save_snapshot(&snapshot) {
                warn!("failed to persist snapshot after block {}: {}", block.index, e);
            }
        }
        Ok((block, stats))
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("chain_len", &self.chain_len())
            .field("persistent", &self.persistence.is_some())
            .finish()
    }
}
