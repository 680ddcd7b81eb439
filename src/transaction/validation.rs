/// Validation logic for transactions separated from type definitions
use crate::crypto::{verify_signature_strict, KeyedHasher};
use crate::error::{AdmissionError, ChainError};
use crate::transaction::types::{Amount, Transaction};

impl Transaction {
    /// Checks the signature of a transfer against its sender address.
    ///
    /// Rewards pass unconditionally: nothing proves they came from an actual
    /// mining event, so the ledger must never admit them from untrusted input.
    pub fn validate_signature(&self, hasher: &KeyedHasher) -> Result<(), ChainError> {
        let from = match self.from.as_deref() {
            None => return Ok(()),
            Some("") => {
                return Err(ChainError::InvalidTransaction(
                    "Sender address cannot be empty".to_string(),
                ))
            }
            Some(from) => from,
        };

        let signature = match self.signature.as_deref() {
            Some(sig) if !sig.is_empty() => sig,
            _ => {
                return Err(ChainError::AuthenticationError(
                    "No signature on transaction".to_string(),
                ))
            }
        };

        let hash = self.compute_hash(hasher)?;
        verify_signature_strict(&hash, signature, from)
    }

    /// Validity predicate used by admission and chain verification. Any
    /// encoding or cryptographic failure simply makes the transaction invalid.
    pub fn is_valid(&self, hasher: &KeyedHasher) -> bool {
        match self.validate_signature(hasher) {
            Ok(()) => true,
            Err(e) => {
                tracing::trace!("transaction failed validation: {}", e);
                false
            }
        }
    }

    /// Stateless field checks for ordinary transfers: both parties named and a
    /// strictly positive amount.
    pub fn validate_fields(&self) -> Result<(), AdmissionError> {
        if self.from_str_or_empty().is_empty() || self.to.is_empty() {
            return Err(AdmissionError::Validation(
                "Transaction must include both from and to addresses".to_string(),
            ));
        }
        if self.amount <= Amount::ZERO {
            return Err(AdmissionError::Validation(format!(
                "Transaction amount must be positive, got {}",
                self.amount
            )));
        }
        Ok(())
    }
}
