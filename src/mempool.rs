//! Pending-transaction pool
//!
//! Append-only between blocks. Entries leave only when a mined block that
//! contains them is committed, always as a prefix of the pool.

use crate::transaction::{Amount, Transaction};

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Mempool {
    transactions: Vec<Transaction>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_transaction(&mut self, tx: Transaction) {
        self.transactions.push(tx);
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Read-only view, in admission order.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Sum of the amounts `address` is already spending in pending transfers,
    /// or `None` if that sum is not representable.
    pub fn pending_outgoing(&self, address: &str) -> Option<Amount> {
        self.transactions
            .iter()
            .filter(|tx| tx.from.as_deref() == Some(address))
            .try_fold(Amount::ZERO, |total, tx| total.checked_add(tx.amount))
    }

    /// Removes the first `count` entries, which a committed block has just included.
    pub fn drain_committed(&mut self, count: usize) -> Vec<Transaction> {
        let count = count.min(self.transactions.len());
        self.transactions.drain(..count).collect()
    }

    /// True when the pool starts with exactly `txs`.
    pub fn starts_with(&self, txs: &[Transaction]) -> bool {
        self.transactions.starts_with(txs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(from: &str, to: &str, amount: f64) -> Transaction {
        Transaction::new(from.to_string(), to.to_string(), Amount::from_num(amount))
    }

    #[test]
    fn test_pending_outgoing_sums_only_sender() {
        let mut pool = Mempool::new();
        pool.add_transaction(tx("alice", "bob", 1.0));
        pool.add_transaction(tx("carol", "alice", 5.0));
        pool.add_transaction(tx("alice", "dave", 0.5));
        pool.add_transaction(Transaction::reward("alice".into(), Amount::from_num(50)));

        assert_eq!(pool.pending_outgoing("alice"), Some(Amount::from_num(1.5)));
        assert_eq!(pool.pending_outgoing("carol"), Some(Amount::from_num(5)));
        assert_eq!(pool.pending_outgoing("nobody"), Some(Amount::ZERO));
    }

    #[test]
    fn test_pending_outgoing_overflow_is_none() {
        let mut pool = Mempool::new();
        pool.add_transaction(Transaction::new("alice".into(), "bob".into(), Amount::MAX));
        pool.add_transaction(tx("alice", "carol", 1.0));
        assert_eq!(pool.pending_outgoing("alice"), None);
        assert_eq!(pool.pending_outgoing("bob"), Some(Amount::ZERO));
    }

    #[test]
    fn test_drain_committed_keeps_later_entries() {
        let mut pool = Mempool::new();
        let first = tx("alice", "bob", 1.0);
        let second = tx("alice", "carol", 2.0);
        pool.add_transaction(first.clone());
        pool.add_transaction(second.clone());

        assert!(pool.starts_with(&[first.clone()]));
        let drained = pool.drain_committed(1);
        assert_eq!(drained, vec![first]);
        assert_eq!(pool.transactions(), &[second]);

        assert_eq!(pool.drain_committed(10).len(), 1);
        assert!(pool.is_empty());
    }
}
