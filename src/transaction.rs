//! Transaction module split into types and validation for better modularity

pub mod types;
pub mod validation;

pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{sign_transaction, HashParams, KeyPair, KeyedHasher};
    use crate::error::AdmissionError;

    fn hasher() -> KeyedHasher {
        KeyedHasher::new(HashParams::light()).unwrap()
    }

    fn signed_transfer(keypair: &KeyPair, to: &str, amount: f64) -> Transaction {
        let hasher = hasher();
        let mut tx = Transaction::new(keypair.address(), to.to_string(), Amount::from_num(amount));
        sign_transaction(&mut tx, keypair, &hasher).unwrap();
        tx
    }

    #[test]
    fn test_hash_covers_from_to_amount_only() {
        let hasher = hasher();
        let a = Transaction::new("alice".into(), "bob".into(), Amount::from_num(1));
        let b = a.clone().with_signature("ignored".into());
        assert_eq!(a.compute_hash(&hasher).unwrap(), b.compute_hash(&hasher).unwrap());

        let c = Transaction::new("alice".into(), "bob".into(), Amount::from_num(2));
        assert_ne!(a.compute_hash(&hasher).unwrap(), c.compute_hash(&hasher).unwrap());
    }

    #[test]
    fn test_reward_is_valid_without_signature() {
        let reward = Transaction::reward("miner".into(), Amount::from_num(50));
        assert!(reward.is_reward());
        assert!(reward.is_valid(&hasher()));
    }

    #[test]
    fn test_signed_transfer_is_valid() {
        let keypair = KeyPair::generate().unwrap();
        let tx = signed_transfer(&keypair, "bob", 1.5);
        assert!(tx.is_valid(&hasher()));
    }

    #[test]
    fn test_unsigned_transaction_fails() {
        let keypair = KeyPair::generate().unwrap();
        let tx = Transaction::new(keypair.address(), "bob".into(), Amount::from_num(1));
        let err = tx.validate_signature(&hasher()).unwrap_err();
        assert!(err.to_string().contains("No signature"));
        assert!(!tx.is_valid(&hasher()));
    }

    #[test]
    fn test_tampered_fields_invalidate_signature() {
        let hasher = hasher();
        let keypair = KeyPair::generate().unwrap();
        let tx = signed_transfer(&keypair, "bob", 1.0);

        let mut more = tx.clone();
        more.amount = Amount::from_num(100);
        assert!(!more.is_valid(&hasher));

        let mut redirected = tx.clone();
        redirected.to = "mallory".into();
        assert!(!redirected.is_valid(&hasher));

        let mut garbage = tx;
        garbage.signature = Some("not-base64".into());
        assert!(!garbage.is_valid(&hasher));
    }

    #[test]
    fn test_signature_from_other_key_fails() {
        let alice = KeyPair::generate().unwrap();
        let mallory = KeyPair::generate().unwrap();
        let forged = signed_transfer(&mallory, "bob", 1.0);
        let mut tx = Transaction::new(alice.address(), "bob".into(), Amount::from_num(1));
        tx.signature = forged.signature;
        assert!(!tx.is_valid(&hasher()));
    }

    #[test]
    fn test_non_key_sender_is_invalid_not_panic() {
        let tx = Transaction::new("minerA".into(), "bob".into(), Amount::from_num(1))
            .with_signature("AAAA".into());
        assert!(!tx.is_valid(&hasher()));
    }

    #[test]
    fn test_field_validation() {
        let missing_to = Transaction::new("alice".into(), String::new(), Amount::from_num(1));
        assert!(matches!(
            missing_to.validate_fields(),
            Err(AdmissionError::Validation(_))
        ));

        let zero = Transaction::new("alice".into(), "bob".into(), Amount::ZERO);
        assert!(matches!(zero.validate_fields(), Err(AdmissionError::Validation(_))));

        let negative = Transaction::new("alice".into(), "bob".into(), Amount::from_num(-1));
        assert!(negative.validate_fields().is_err());

        let ok = Transaction::new("alice".into(), "bob".into(), Amount::from_num(0.5));
        assert!(ok.validate_fields().is_ok());
    }
}
