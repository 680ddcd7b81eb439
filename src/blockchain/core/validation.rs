use crate::crypto::KeyedHasher;
use crate::error::ChainError;
use crate::transaction::{Amount, Transaction};

use super::chain::{Block, Blockchain};

/// Checks one non-genesis block against its predecessor: stored hash equals the
/// recomputation, the previous-hash link holds, and every transaction is valid.
pub fn validate_block_link(
    block: &Block,
    previous: &Block,
    hasher: &KeyedHasher,
) -> Result<(), ChainError> {
    let recomputed = block.compute_hash(hasher)?;
    if block.hash != recomputed {
        return Err(ChainError::InvalidBlock(format!(
            "Block {} hash mismatch. Stored {}, recomputed {}.",
            block.index, block.hash, recomputed
        )));
    }

    if block.previous_hash != previous.hash {
        return Err(ChainError::InvalidBlock(format!(
            "Block {} has invalid previous hash. Expected {}, but got {}.",
            block.index, previous.hash, block.previous_hash
        )));
    }

    if let Some(position) = block
        .transactions
        .iter()
        .position(|tx| !tx.is_valid(hasher))
    {
        return Err(ChainError::InvalidBlock(format!(
            "Block {} contains an invalid transaction at position {}",
            block.index, position
        )));
    }
    Ok(())
}

/// Walks the chain from index 1 and reports the first integrity violation.
pub fn verify_blocks(blocks: &[Block], hasher: &KeyedHasher) -> Result<(), ChainError> {
    for pair in blocks.windows(2) {
        validate_block_link(&pair[1], &pair[0], hasher)?;
    }
    Ok(())
}

/// Balance of `address` by folding over every committed transaction.
pub fn fold_balance(blocks: &[Block], address: &str) -> Result<Amount, ChainError> {
    blocks
        .iter()
        .flat_map(|block| block.transactions.iter())
        .try_fold(Amount::ZERO, |balance, tx: &Transaction| {
            let mut balance = balance;
            if tx.from.as_deref() == Some(address) {
                balance = balance.checked_sub(tx.amount).ok_or_else(|| overflow(address))?;
            }
            if tx.to == address {
                balance = balance.checked_add(tx.amount).ok_or_else(|| overflow(address))?;
            }
            Ok(balance)
        })
}

fn overflow(address: &str) -> ChainError {
    ChainError::InvalidChain(format!("Balance of {} overflows", address))
}

impl Blockchain {
    /// Like [`Blockchain::is_valid_chain`], but says what is wrong.
    pub fn verify_chain(&self) -> Result<(), ChainError> {
        verify_blocks(self.chain(), self.hasher())
    }

    /// Read-only integrity check. Detected corruption is reported, never repaired.
    pub fn is_valid_chain(&self) -> bool {
        match self.verify_chain() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("chain verification failed: {}", e);
                false
            }
        }
    }
}
