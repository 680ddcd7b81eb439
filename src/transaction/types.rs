/// Transaction types for ArgonChain
use crate::crypto::{Address, KeyedHasher};
use crate::error::ChainError;
use fixed::types::I64F64;

/// Ledger amounts: exact fixed-point decimals, so balances never drift.
pub type Amount = I64F64;

/// A transfer of `amount` from `from` to `to`.
///
/// `from == None` marks a block reward, which carries no signature. Once signed,
/// the signature commits to `from`, `to` and `amount`; changing any of them
/// invalidates the transaction.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Transaction {
    pub from: Option<Address>,
    pub to: Address,
    pub amount: Amount,
    /// Base64 compact ECDSA signature over [`Transaction::compute_hash`].
    #[serde(default)]
    pub signature: Option<String>,
}

impl Transaction {
    /// An unsigned transfer between two accounts.
    pub fn new(from: Address, to: Address, amount: Amount) -> Self {
        Transaction {
            from: Some(from),
            to,
            amount,
            signature: None,
        }
    }

    /// A block reward paid to `to`. Has no sender and needs no signature.
    pub fn reward(to: Address, amount: Amount) -> Self {
        Transaction {
            from: None,
            to,
            amount,
            signature: None,
        }
    }

    pub fn is_reward(&self) -> bool {
        self.from.is_none()
    }

    /// Sender address, or `""` for rewards. Also the hash key of the transaction.
    pub fn from_str_or_empty(&self) -> &str {
        self.from.as_deref().unwrap_or("")
    }

    /// The exact text that gets hashed: sender, recipient and amount only.
    pub fn signable_message(&self) -> String {
        format!("{}-{}-{}", self.from_str_or_empty(), self.to, self.amount)
    }

    /// Content hash keyed by the sender address. Timestamps and nonces are not
    /// part of it, so identical transfers share a hash.
    pub fn compute_hash(&self, hasher: &KeyedHasher) -> Result<String, ChainError> {
        hasher.keyed_hash(&self.signable_message(), self.from_str_or_empty())
    }

    pub fn with_signature(mut self, signature: String) -> Self {
        self.signature = Some(signature);
        self
    }
}
