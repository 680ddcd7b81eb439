//! Wallet: a signing identity, optionally backed by a recovery mnemonic.

use crate::crypto::{import_private_key, sign_transaction, Address, KeyPair, KeyedHasher, Signer};
use crate::error::ChainError;
use crate::mnemonic::{MnemonicCodec, DEFAULT_ENTROPY_BITS};
use crate::transaction::{Amount, Transaction};
use serde::Serialize;

/// Owns exactly one key pair. Immutable after construction.
///
/// The mnemonic is a recovery artifact for the wallet owner; the ledger never
/// stores it.
#[derive(Debug, Clone)]
pub struct Wallet {
    keypair: KeyPair,
    mnemonic: Option<String>,
}

/// What a wallet hands back to its owner on creation or recovery.
#[derive(Clone, Serialize)]
pub struct WalletExport {
    pub address: Address,
    /// PKCS#8 DER, base64.
    pub private_key: String,
    pub mnemonic: Option<String>,
}

impl std::fmt::Debug for WalletExport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletExport")
            .field("address", &self.address)
            .field("private_key", &"[REDACTED]")
            .field("mnemonic", &self.mnemonic.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Wallet {
    /// Generates a fresh 12-word mnemonic and derives the key pair from it.
    pub fn new(codec: &MnemonicCodec) -> Result<Self, ChainError> {
        Self::with_entropy(codec, DEFAULT_ENTROPY_BITS)
    }

    pub fn with_entropy(codec: &MnemonicCodec, entropy_bits: usize) -> Result<Self, ChainError> {
        let mnemonic = codec.generate_mnemonic(entropy_bits)?;
        Self::derive(mnemonic)
    }

    /// Rebuilds the wallet behind `mnemonic`. The same phrase always gives the
    /// same address; unknown words or a bad checksum are rejected.
    pub fn restore(codec: &MnemonicCodec, mnemonic: &str) -> Result<Self, ChainError> {
        if mnemonic.trim().is_empty() {
            return Err(ChainError::WalletError("Mnemonic is required".to_string()));
        }
        codec.validate(mnemonic)?;
        let canonical = mnemonic.split_whitespace().collect::<Vec<_>>().join(" ");
        Self::derive(canonical)
    }

    /// Wraps an already existing key. Such a wallet has no mnemonic.
    pub fn from_keypair(keypair: KeyPair) -> Self {
        Wallet {
            keypair,
            mnemonic: None,
        }
    }

    /// Imports a base64 PKCS#8 private key.
    pub fn import(base64_pkcs8: &str) -> Result<Self, ChainError> {
        Ok(Self::from_keypair(import_private_key(base64_pkcs8)?))
    }

    fn derive(mnemonic: String) -> Result<Self, ChainError> {
        let seed = MnemonicCodec::mnemonic_to_seed(&mnemonic);
        let keypair = KeyPair::from_seed(&seed)?;
        Ok(Wallet {
            keypair,
            mnemonic: Some(mnemonic),
        })
    }

    pub fn address(&self) -> Address {
        self.keypair.address()
    }

    pub fn keypair(&self) -> &KeyPair {
        &self.keypair
    }

    pub fn mnemonic(&self) -> Option<&str> {
        self.mnemonic.as_deref()
    }

    pub fn export(&self) -> Result<WalletExport, ChainError> {
        Ok(WalletExport {
            address: self.address(),
            private_key: self.keypair.export_pkcs8_base64()?,
            mnemonic: self.mnemonic.clone(),
        })
    }

    /// Creates a transfer from this wallet to `to`, signed and ready for submission.
    pub fn create_transaction(
        &self,
        to: &str,
        amount: Amount,
        hasher: &KeyedHasher,
    ) -> Result<Transaction, ChainError> {
        let mut tx = Transaction::new(self.address(), to.to_string(), amount);
        sign_transaction(&mut tx, &self.keypair, hasher)?;
        Ok(tx)
    }
}

impl Signer for Wallet {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, ChainError> {
        self.keypair.sign(data)
    }

    fn public_key_bytes(&self) -> Vec<u8> {
        self.keypair.public_key_bytes()
    }
}
