//! Error types for ArgonChain
//!
//! Two channels are kept apart: [`AdmissionError`] is the expected, business-level
//! rejection of a transaction by the pending pool, while [`ChainError`] covers
//! faults (broken keys, malformed encodings, corrupted chains, I/O).

use crate::transaction::Amount;
use std::fmt;

/// Why the ledger refused to admit a transaction into the pending pool.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdmissionError {
    /// Missing or malformed fields, non-positive amount.
    #[error("Validation error: {0}")]
    Validation(String),
    /// Signature missing or not produced by the claimed sender.
    #[error("Authentication error: {0}")]
    Authentication(String),
    /// The sender cannot cover `requested` once its other pending debits are counted.
    #[error(
        "Insufficient funds: requested {requested}, available {available} \
         (chain balance {balance}, pending outgoing {pending})"
    )]
    InsufficientFunds {
        requested: Amount,
        available: Amount,
        balance: Amount,
        pending: Amount,
    },
}

impl AdmissionError {
    /// Amount missing to make the rejected transfer admissible, if funds were the reason.
    pub fn shortfall(&self) -> Option<Amount> {
        match self {
            AdmissionError::InsufficientFunds {
                requested,
                available,
                ..
            } => Some(*requested - *available),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ChainError {
    InvalidTransaction(String),
    AuthenticationError(String),
    CryptoError(String),
    FormatError(String),
    MnemonicError(String),
    WalletError(String),
    InvalidBlock(String),
    InvalidChain(String),
    MiningCancelled,
    MiningExhausted { attempts: u64 },
    StaleTemplate,
    WorkerFailed(String),
    ConfigError(String),
    IoError(String),
    SerializationError(String),
    Rejected(AdmissionError),
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChainError::InvalidTransaction(msg) => write!(f, "Invalid transaction: {}", msg),
            ChainError::AuthenticationError(msg) => write!(f, "Authentication error: {}", msg),
            ChainError::CryptoError(msg) => write!(f, "Cryptographic error: {}", msg),
            ChainError::FormatError(msg) => write!(f, "Format error: {}", msg),
            ChainError::MnemonicError(msg) => write!(f, "Mnemonic error: {}", msg),
            ChainError::WalletError(msg) => write!(f, "Wallet error: {}", msg),
            ChainError::InvalidBlock(msg) => write!(f, "Invalid block: {}", msg),
            ChainError::InvalidChain(msg) => write!(f, "Invalid chain: {}", msg),
            ChainError::MiningCancelled => write!(f, "Mining cancelled"),
            ChainError::MiningExhausted { attempts } => {
                write!(f, "Mining gave up after {} attempts", attempts)
            }
            ChainError::StaleTemplate => {
                write!(f, "Block template is stale: the chain or pool changed underneath it")
            }
            ChainError::WorkerFailed(msg) => write!(f, "Mining worker failed: {}", msg),
            ChainError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            ChainError::IoError(msg) => write!(f, "IO error: {}", msg),
            ChainError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            ChainError::Rejected(err) => write!(f, "Transaction rejected: {}", err),
        }
    }
}

impl std::error::Error for ChainError {}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::SerializationError(err.to_string())
    }
}

impl From<AdmissionError> for ChainError {
    fn from(err: AdmissionError) -> Self {
        ChainError::Rejected(err)
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_funds_reports_all_figures() {
        let err = AdmissionError::InsufficientFunds {
            requested: Amount::from_num(2),
            available: Amount::from_num(1.5),
            balance: Amount::from_num(2.5),
            pending: Amount::from_num(1),
        };
        let msg = err.to_string();
        assert!(msg.contains("requested 2"));
        assert!(msg.contains("available 1.5"));
        assert!(msg.contains("chain balance 2.5"));
        assert!(msg.contains("pending outgoing 1"));
        assert_eq!(err.shortfall(), Some(Amount::from_num(0.5)));
    }

    #[test]
    fn test_rejection_wraps_into_chain_error() {
        let err: ChainError = AdmissionError::Validation("missing to".to_string()).into();
        assert_eq!(
            err.to_string(),
            "Transaction rejected: Validation error: missing to"
        );
        assert!(AdmissionError::Authentication("bad".into()).shortfall().is_none());
    }
}
