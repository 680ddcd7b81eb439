use crate::crypto::Address;
use crate::error::ChainError;
use crate::transaction::{Amount, Transaction};
use std::collections::HashMap;

use super::chain::Block;

/// Per-address balances over the committed chain, kept up to date as blocks are
/// appended so balance queries do not rescan the whole chain.
#[derive(Debug, Clone, Default)]
pub struct BalanceState {
    balances: HashMap<Address, Amount>,
}

impl BalanceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the index from scratch.
    pub fn from_blocks(blocks: &[Block]) -> Result<Self, ChainError> {
        let mut state = Self::new();
        for block in blocks {
            state.apply_block(block)?;
        }
        Ok(state)
    }

    pub fn get_balance(&self, address: &str) -> Amount {
        self.balances.get(address).copied().unwrap_or(Amount::ZERO)
    }

    /// Balances of every address `txs` touches after applying them in order,
    /// without modifying the index. Fails if any intermediate value leaves the
    /// representable range.
    pub fn settle<'a, I>(&self, txs: I) -> Result<HashMap<&'a str, Amount>, ChainError>
    where
        I: IntoIterator<Item = &'a Transaction>,
    {
        let mut touched: HashMap<&'a str, Amount> = HashMap::new();
        for tx in txs {
            if let Some(from) = tx.from.as_deref() {
                let current = touched
                    .get(from)
                    .copied()
                    .unwrap_or_else(|| self.get_balance(from));
                let next = current
                    .checked_sub(tx.amount)
                    .ok_or_else(|| overflow(from))?;
                touched.insert(from, next);
            }
            let to = tx.to.as_str();
            let current = touched
                .get(to)
                .copied()
                .unwrap_or_else(|| self.get_balance(to));
            let next = current.checked_add(tx.amount).ok_or_else(|| overflow(to))?;
            touched.insert(to, next);
        }
        Ok(touched)
    }

    /// Applies every transaction of `block`, or none of them.
    pub fn apply_block(&mut self, block: &Block) -> Result<(), ChainError> {
        self.apply_all(&block.transactions)
    }

    pub fn apply_transaction(&mut self, tx: &Transaction) -> Result<(), ChainError> {
        self.apply_all(std::slice::from_ref(tx))
    }

    fn apply_all(&mut self, txs: &[Transaction]) -> Result<(), ChainError> {
        let settled = self.settle(txs)?;
        for (address, balance) in settled {
            self.balances.insert(address.to_string(), balance);
        }
        Ok(())
    }

    /// Number of addresses that ever appeared in a committed transaction.
    pub fn accounts(&self) -> usize {
        self.balances.len()
    }
}

fn overflow(address: &str) -> ChainError {
    ChainError::InvalidTransaction(format!("Balance of {} would overflow", address))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_transaction_moves_funds() {
        let mut state = BalanceState::new();
        state
            .apply_transaction(&Transaction::reward("alice".into(), Amount::from_num(2.5)))
            .unwrap();
        state
            .apply_transaction(&Transaction::new(
                "alice".into(),
                "bob".into(),
                Amount::from_num(1),
            ))
            .unwrap();

        assert_eq!(state.get_balance("alice"), Amount::from_num(1.5));
        assert_eq!(state.get_balance("bob"), Amount::from_num(1));
        assert_eq!(state.get_balance("carol"), Amount::ZERO);
        assert_eq!(state.accounts(), 2);
    }

    #[test]
    fn test_self_transfer_is_neutral() {
        let mut state = BalanceState::new();
        state
            .apply_transaction(&Transaction::reward("alice".into(), Amount::from_num(3)))
            .unwrap();
        state
            .apply_transaction(&Transaction::new(
                "alice".into(),
                "alice".into(),
                Amount::from_num(2),
            ))
            .unwrap();
        assert_eq!(state.get_balance("alice"), Amount::from_num(3));
    }

    #[test]
    fn test_overflowing_block_leaves_state_untouched() {
        let mut state = BalanceState::new();
        state
            .apply_transaction(&Transaction::reward("whale".into(), Amount::MAX))
            .unwrap();

        let mut block = Block::genesis();
        block.transactions = vec![
            Transaction::reward("minnow".into(), Amount::from_num(1)),
            Transaction::reward("whale".into(), Amount::from_num(1)),
        ];
        let err = state.apply_block(&block).unwrap_err();
        assert!(err.to_string().contains("overflow"));
        assert_eq!(state.get_balance("whale"), Amount::MAX);
        assert_eq!(state.get_balance("minnow"), Amount::ZERO);
    }

    #[test]
    fn test_settle_does_not_modify_index() {
        let state = BalanceState::new();
        let txs = [
            Transaction::reward("alice".into(), Amount::from_num(4)),
            Transaction::new("alice".into(), "bob".into(), Amount::from_num(1)),
        ];
        let settled = state.settle(&txs).unwrap();
        assert_eq!(settled["alice"], Amount::from_num(3));
        assert_eq!(settled["bob"], Amount::from_num(1));
        assert_eq!(state.accounts(), 0);
    }
}
