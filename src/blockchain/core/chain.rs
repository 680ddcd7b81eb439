use crate::crypto::KeyedHasher;
use crate::error::{AdmissionError, ChainError};
use crate::mempool::Mempool;
use crate::miner::{meets_difficulty, mine_block, MiningControl, MiningStats};
use crate::transaction::{Amount, Transaction};
use chrono::{DateTime, SecondsFormat, Utc};

use super::state::BalanceState;
use super::validation::validate_block_link;

/// Sentinel hash and previous-hash of the genesis block.
pub const GENESIS_HASH: &str = "0";
pub const DEFAULT_DIFFICULTY: u32 = 4;
/// Longest achievable prefix: every digest is 64 hex characters.
pub const MAX_DIFFICULTY: u32 = 64;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: DateTime<Utc>,
    pub transactions: Vec<Transaction>,
    pub previous_hash: String,
    pub hash: String,
    pub nonce: u64,
}

impl Block {
    /// An unmined block stamped with the current time.
    pub fn new(index: u64, previous_hash: String, transactions: Vec<Transaction>) -> Self {
        Block {
            index,
            timestamp: Utc::now(),
            transactions,
            previous_hash,
            hash: String::new(),
            nonce: 0,
        }
    }

    pub fn genesis() -> Self {
        Block {
            index: 0,
            timestamp: Utc::now(),
            transactions: Vec::new(),
            previous_hash: GENESIS_HASH.to_string(),
            hash: GENESIS_HASH.to_string(),
            nonce: 0,
        }
    }

    /// ISO-8601 UTC timestamp with nanosecond precision, as it enters the hash.
    pub fn timestamp_iso(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
    }

    /// Concatenation of every contained transaction's hash, in block order.
    pub fn transactions_digest(&self, hasher: &KeyedHasher) -> Result<String, ChainError> {
        let mut digest = String::with_capacity(self.transactions.len() * 64);
        for tx in &self.transactions {
            digest.push_str(&tx.compute_hash(hasher)?);
        }
        Ok(digest)
    }

    pub fn compute_hash_with_digest(
        &self,
        hasher: &KeyedHasher,
        tx_digest: &str,
    ) -> Result<String, ChainError> {
        let raw = format!(
            "{}-{}-{}-{}-{}",
            self.index,
            self.timestamp_iso(),
            tx_digest,
            self.previous_hash,
            self.nonce
        );
        hasher.keyed_hash(&raw, &self.previous_hash)
    }

    /// Recomputes this block's hash over index, timestamp, transaction hashes,
    /// previous hash and nonce, keyed by the previous hash.
    pub fn compute_hash(&self, hasher: &KeyedHasher) -> Result<String, ChainError> {
        let tx_digest = self.transactions_digest(hasher)?;
        self.compute_hash_with_digest(hasher, &tx_digest)
    }

    /// Unbounded proof-of-work; returns only once a hash with `difficulty`
    /// leading zeros is found. Use [`mine_block`] for a cancelable search.
    pub fn mine(&mut self, difficulty: u32, hasher: &KeyedHasher) -> Result<MiningStats, ChainError> {
        mine_block(self, difficulty, hasher, &MiningControl::new())
    }
}

/// An unmined block assembled from the pool, plus how many of its leading
/// transactions came from the pool (the rest is the reward). It remembers the
/// tip and rules it was prepared under so it can be verified without the ledger.
#[derive(Debug, Clone)]
pub struct BlockTemplate {
    pub block: Block,
    pub from_pool: usize,
    previous: Block,
    difficulty: u32,
    mining_reward: Amount,
}

impl BlockTemplate {
    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Runs every check that needs hashing or signature work: the reward, the
    /// proof of work, the recomputed hash, the link to the tip it was prepared
    /// on, and every transaction's validity.
    pub fn verify(self, hasher: &KeyedHasher) -> Result<VerifiedBlock, ChainError> {
        let BlockTemplate {
            block,
            from_pool,
            previous,
            difficulty,
            mining_reward,
        } = self;

        if from_pool + 1 != block.transactions.len() {
            return Err(ChainError::InvalidBlock(format!(
                "Block {} has {} transactions for {} pooled entries",
                block.index,
                block.transactions.len(),
                from_pool
            )));
        }
        match block.transactions.last() {
            Some(reward) if reward.is_reward() && reward.amount == mining_reward => {}
            _ => {
                return Err(ChainError::InvalidBlock(
                    "Block must end with the mining reward".to_string(),
                ))
            }
        }
        if !meets_difficulty(&block.hash, difficulty) {
            return Err(ChainError::InvalidBlock(format!(
                "Hash {} does not meet difficulty {}",
                block.hash, difficulty
            )));
        }
        validate_block_link(&block, &previous, hasher)?;

        Ok(VerifiedBlock {
            block,
            from_pool,
            difficulty,
            mining_reward,
        })
    }
}

/// A mined block that passed [`BlockTemplate::verify`]. Committing it only
/// needs cheap comparisons against the current tip and pool.
#[derive(Debug, Clone)]
pub struct VerifiedBlock {
    block: Block,
    from_pool: usize,
    difficulty: u32,
    mining_reward: Amount,
}

impl VerifiedBlock {
    pub fn block(&self) -> &Block {
        &self.block
    }
}

/// The ledger: the committed chain plus the pool of admitted transactions.
///
/// Invariants after every public call: the chain starts with the genesis
/// block, every later block links to its predecessor and carries a correct
/// hash, and every committed transaction is valid.
#[derive(Debug, Clone)]
pub struct Blockchain {
    blocks: Vec<Block>,
    mempool: Mempool,
    difficulty: u32,
    mining_reward: Amount,
    hasher: KeyedHasher,
    balances: BalanceState,
}

impl Blockchain {
    pub fn new(difficulty: u32, mining_reward: Amount, hasher: KeyedHasher) -> Self {
        tracing::info!(difficulty, %mining_reward, "creating ledger with genesis block");
        Blockchain {
            blocks: vec![Block::genesis()],
            mempool: Mempool::new(),
            difficulty,
            mining_reward,
            hasher,
            balances: BalanceState::new(),
        }
    }

    /// Reassembles a ledger from previously committed parts, rejecting anything
    /// that does not verify.
    pub fn from_parts(
        blocks: Vec<Block>,
        pending: Vec<Transaction>,
        difficulty: u32,
        mining_reward: Amount,
        hasher: KeyedHasher,
    ) -> Result<Self, ChainError> {
        let genesis = blocks
            .first()
            .ok_or_else(|| ChainError::InvalidChain("Chain has no genesis block".to_string()))?;
        if genesis.index != 0
            || genesis.hash != GENESIS_HASH
            || genesis.previous_hash != GENESIS_HASH
            || !genesis.transactions.is_empty()
        {
            return Err(ChainError::InvalidChain(
                "First block is not a genesis block".to_string(),
            ));
        }
        for (position, block) in blocks.iter().enumerate() {
            if block.index != position as u64 {
                return Err(ChainError::InvalidChain(format!(
                    "Block at position {} has index {}",
                    position, block.index
                )));
            }
        }

        let mut blockchain = Blockchain {
            blocks,
            mempool: Mempool::new(),
            difficulty,
            mining_reward,
            hasher,
            balances: BalanceState::new(),
        };
        blockchain.verify_chain()?;
        blockchain.balances = BalanceState::from_blocks(&blockchain.blocks)?;

        // Pending entries go through admission again, in their original order.
        for (position, tx) in pending.into_iter().enumerate() {
            blockchain.admit(&tx).map_err(|e| {
                ChainError::InvalidChain(format!(
                    "Pending transaction {} rejected: {}",
                    position, e
                ))
            })?;
            blockchain.mempool.add_transaction(tx);
        }
        Ok(blockchain)
    }

    pub fn get_latest(&self) -> &Block {
        // The chain always holds at least the genesis block.
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn chain(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false: the genesis block is created with the ledger.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn mining_reward(&self) -> Amount {
        self.mining_reward
    }

    pub fn hasher(&self) -> &KeyedHasher {
        &self.hasher
    }

    /// Balance over committed blocks only; pending transactions do not count.
    pub fn get_balance(&self, address: &str) -> Amount {
        self.balances.get_balance(address)
    }

    /// Snapshot of the pool in admission order.
    pub fn get_pending_transactions(&self) -> &[Transaction] {
        self.mempool.transactions()
    }

    /// Admission control. Rules run in order and the first failure wins:
    /// reward-shaped transactions only need to be valid; transfers need both
    /// addresses, a positive amount, a good signature and enough funds once
    /// the sender's other pending debits are subtracted. Nothing is admitted
    /// that would push a balance out of range once the pool is mined.
    ///
    /// Anything shaped like a reward is accepted, so this must not be exposed
    /// to untrusted callers as is.
    pub fn add_transaction(&mut self, tx: Transaction) -> Result<(), AdmissionError> {
        let result = self.admit(&tx);
        match &result {
            Ok(()) => {
                tracing::debug!(to = %tx.to, amount = %tx.amount, reward = tx.is_reward(), "transaction admitted");
                self.mempool.add_transaction(tx);
            }
            Err(e) => tracing::warn!("transaction rejected: {}", e),
        }
        result
    }

    fn admit(&self, tx: &Transaction) -> Result<(), AdmissionError> {
        if tx.is_reward() {
            if !tx.is_valid(&self.hasher) {
                return Err(AdmissionError::Validation(
                    "Reward transaction is not valid".to_string(),
                ));
            }
        } else {
            self.check_transfer(tx)?;
        }

        let pool = self.mempool.transactions().iter();
        self.balances
            .settle(pool.chain(std::iter::once(tx)))
            .map_err(|e| AdmissionError::Validation(e.to_string()))?;
        Ok(())
    }

    fn check_transfer(&self, tx: &Transaction) -> Result<(), AdmissionError> {
        tx.validate_fields()?;

        tx.validate_signature(&self.hasher)
            .map_err(|e| AdmissionError::Authentication(e.to_string()))?;

        let sender = tx.from_str_or_empty();
        let balance = self.get_balance(sender);
        let pending = self.mempool.pending_outgoing(sender).ok_or_else(|| {
            AdmissionError::Validation(format!("Pending debits of {} overflow", sender))
        })?;
        let available = balance.saturating_sub(pending);
        if tx.amount > available {
            return Err(AdmissionError::InsufficientFunds {
                requested: tx.amount,
                available,
                balance,
                pending,
            });
        }
        Ok(())
    }

    /// Assembles the next block from the whole pool plus the miner's reward.
    pub fn prepare_block(&self, miner_address: &str) -> Result<BlockTemplate, ChainError> {
        if miner_address.trim().is_empty() {
            return Err(ChainError::InvalidTransaction(
                "Miner address cannot be empty".to_string(),
            ));
        }
        let mut transactions = self.mempool.transactions().to_vec();
        let from_pool = transactions.len();
        transactions.push(Transaction::reward(
            miner_address.to_string(),
            self.mining_reward,
        ));
        // Refuse before any work is spent on a block that could never commit.
        self.balances.settle(&transactions)?;

        let previous = self.get_latest().clone();
        let block = Block::new(self.blocks.len() as u64, previous.hash.clone(), transactions);
        Ok(BlockTemplate {
            block,
            from_pool,
            previous,
            difficulty: self.difficulty,
            mining_reward: self.mining_reward,
        })
    }

    /// Appends a block mined from a [`BlockTemplate`] and removes the pooled
    /// transactions it included. Anything admitted after the template was
    /// taken stays pending.
    pub fn commit_block(&mut self, template: BlockTemplate) -> Result<&Block, ChainError> {
        if self.is_stale(&template.block) {
            return Err(ChainError::StaleTemplate);
        }
        let verified = template.verify(&self.hasher)?;
        self.commit_verified(verified)
    }

    /// Appends a block that was already verified against the tip it extends.
    /// Only cheap checks run here: the tip, the rules and the pool prefix must
    /// be unchanged, and the balances must stay in range.
    pub fn commit_verified(&mut self, verified: VerifiedBlock) -> Result<&Block, ChainError> {
        let VerifiedBlock {
            block,
            from_pool,
            difficulty,
            mining_reward,
        } = verified;

        if self.is_stale(&block)
            || difficulty != self.difficulty
            || mining_reward != self.mining_reward
            || !self.mempool.starts_with(&block.transactions[..from_pool])
        {
            return Err(ChainError::StaleTemplate);
        }
        self.balances
            .apply_block(&block)
            .map_err(|e| ChainError::InvalidBlock(e.to_string()))?;

        self.mempool.drain_committed(from_pool);
        tracing::info!(
            index = block.index,
            hash = %block.hash,
            transactions = block.transactions.len(),
            "block committed"
        );
        self.blocks.push(block);
        Ok(self.get_latest())
    }

    fn is_stale(&self, block: &Block) -> bool {
        block.index != self.blocks.len() as u64 || block.previous_hash != self.get_latest().hash
    }

    /// Mines every pending transaction plus a reward to `miner_address` into a
    /// new block, appends it and empties the pool.
    pub fn mine_pending(&mut self, miner_address: &str) -> Result<&Block, ChainError> {
        self.mine_pending_with(miner_address, &MiningControl::new())
    }

    pub fn mine_pending_with(
        &mut self,
        miner_address: &str,
        control: &MiningControl,
    ) -> Result<&Block, ChainError> {
        let mut template = self.prepare_block(miner_address)?;
        mine_block(&mut template.block, self.difficulty, &self.hasher, control)?;
        self.commit_block(template)
    }

    /// Direct mutable access for tests that need to corrupt committed state.
    #[cfg(test)]
    pub(crate) fn blocks_mut(&mut self) -> &mut Vec<Block> {
        &mut self.blocks
    }
}
