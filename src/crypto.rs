//! Cryptographic primitives for ArgonChain
//!
//! - [`KeyedHasher`]: Argon2id keyed hashing used for block and transaction digests
//! - [`KeyPair`]: secp256k1 signing identity, addressed by its base64 SPKI encoding
//! - [`Signer`]: the minimal capability the ledger needs from a signing backend

use crate::error::ChainError;
use crate::transaction::Transaction;
use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::{
    constants::{COMPACT_SIGNATURE_SIZE, SECRET_KEY_SIZE},
    ecdsa::Signature,
    All, Message, PublicKey, Secp256k1, SecretKey,
};
use sha2::{Digest, Sha256};
use std::fmt;

/// A thread-safe, lazily initialized Secp256k1 context.
static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// An account address: the base64 encoding of a SubjectPublicKeyInfo DER blob.
pub type Address = String;

/// Length in bytes of every keyed digest.
pub const HASH_OUTPUT_LEN: usize = 32;

// ============================================================================
// Keyed hashing
// ============================================================================

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HashParams {
    /// Lanes (degree of parallelism).
    pub parallelism: u32,
    /// Passes over memory.
    pub iterations: u32,
    /// Memory cost in KiB.
    pub memory_kib: u32,
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            parallelism: 4,
            iterations: 3,
            memory_kib: 1024,
        }
    }
}

impl HashParams {
    /// The cheapest parameters Argon2 accepts. Meant for tests and local demos,
    /// where thousands of proof-of-work attempts must stay fast.
    pub fn light() -> Self {
        Self {
            parallelism: 1,
            iterations: 1,
            memory_kib: 8,
        }
    }
}

/// Memory-hard keyed hash function. Cheap to clone; parameters are validated once
/// at construction.
#[derive(Clone)]
pub struct KeyedHasher {
    params: HashParams,
    argon2: Argon2<'static>,
}

impl fmt::Debug for KeyedHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedHasher")
            .field("params", &self.params)
            .finish()
    }
}

impl KeyedHasher {
    pub fn new(params: HashParams) -> Result<Self, ChainError> {
        let argon_params = Params::new(
            params.memory_kib,
            params.iterations,
            params.parallelism,
            Some(HASH_OUTPUT_LEN),
        )
        .map_err(|e| ChainError::CryptoError(format!("Invalid Argon2 parameters: {}", e)))?;

        tracing::debug!(?params, "keyed hasher initialised");
        Ok(Self {
            params,
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params),
        })
    }

    pub fn params(&self) -> HashParams {
        self.params
    }

    /// Hashes `data` keyed by `salt_text` and returns a 64-character lowercase hex digest.
    ///
    /// Argon2 requires salts of at least 8 bytes while keys here can be empty (genesis,
    /// reward transactions) or as short as `"0"`, so the salt actually fed to Argon2 is
    /// the SHA-256 of `salt_text`.
    pub fn keyed_hash(&self, data: &str, salt_text: &str) -> Result<String, ChainError> {
        let salt = Sha256::digest(salt_text.as_bytes());
        let mut output = [0u8; HASH_OUTPUT_LEN];
        self.argon2
            .hash_password_into(data.as_bytes(), &salt, &mut output)
            .map_err(|e| ChainError::CryptoError(format!("Argon2 hashing failed: {}", e)))?;
        Ok(hex::encode(output))
    }
}

// ============================================================================
// Signing capability
// ============================================================================

/// What the ledger needs from a signing backend: produce a signature and name
/// the public key it verifies under.
pub trait Signer {
    /// Signs `data` and returns the raw signature bytes.
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, ChainError>;

    /// The public key in SubjectPublicKeyInfo DER form.
    fn public_key_bytes(&self) -> Vec<u8>;

    /// The address this signer speaks for.
    fn address(&self) -> Address {
        BASE64.encode(self.public_key_bytes())
    }
}

#[derive(Clone)]
pub struct KeyPair {
    secret_key: SecretKey,
    public_key: PublicKey,
    /// SubjectPublicKeyInfo DER, encoded once at construction.
    spki: Vec<u8>,
}

// Never print the private scalar.
impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &Signer::address(self))
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

impl PartialEq for KeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.public_key == other.public_key
            && self.secret_key.secret_bytes() == other.secret_key.secret_bytes()
    }
}

impl Eq for KeyPair {}

impl KeyPair {
    /// Generates a fresh random KeyPair using the OS random number generator.
    pub fn generate() -> Result<Self, ChainError> {
        let secret_key = SecretKey::new(&mut OsRng);
        Self::from_secret_key(secret_key)
    }

    pub fn from_secret_key(secret_key: SecretKey) -> Result<Self, ChainError> {
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        let spki = encode_spki(&public_key)?;
        Ok(KeyPair {
            secret_key,
            public_key,
            spki,
        })
    }

    /// Derives the private scalar from the first 32 bytes of `seed`.
    pub fn from_seed(seed: &[u8]) -> Result<Self, ChainError> {
        if seed.len() < SECRET_KEY_SIZE {
            return Err(ChainError::CryptoError(format!(
                "Seed must be at least {} bytes, got {}",
                SECRET_KEY_SIZE,
                seed.len()
            )));
        }
        let secret_key = SecretKey::from_slice(&seed[..SECRET_KEY_SIZE])
            .map_err(|e| ChainError::CryptoError(format!("Seed is not a usable scalar: {}", e)))?;
        Self::from_secret_key(secret_key)
    }

    /// The account address: base64 of the SPKI DER public key.
    pub fn address(&self) -> Address {
        Signer::address(self)
    }

    pub fn spki_der(&self) -> &[u8] {
        &self.spki
    }

    /// PKCS#8 DER of the private key.
    pub fn to_pkcs8_der(&self) -> Result<k256::pkcs8::SecretDocument, ChainError> {
        let secret = k256::SecretKey::from_slice(&self.secret_key.secret_bytes())
            .map_err(|e| ChainError::CryptoError(format!("Invalid private key: {}", e)))?;
        secret
            .to_pkcs8_der()
            .map_err(|e| ChainError::FormatError(format!("PKCS#8 encoding failed: {}", e)))
    }

    /// PKCS#8 DER of the private key, base64 encoded.
    pub fn export_pkcs8_base64(&self) -> Result<String, ChainError> {
        Ok(BASE64.encode(self.to_pkcs8_der()?.as_bytes()))
    }
}

impl Signer for KeyPair {
    /// ECDSA over the SHA-256 digest of `data`, compact (r || s) encoding.
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, ChainError> {
        let digest = Sha256::digest(data);
        let message = Message::from_digest_slice(&digest)
            .map_err(|e| ChainError::CryptoError(format!("Failed to create message: {}", e)))?;
        let signature = SECP256K1_CONTEXT.sign_ecdsa(&message, &self.secret_key);
        Ok(signature.serialize_compact().to_vec())
    }

    fn public_key_bytes(&self) -> Vec<u8> {
        self.spki.clone()
    }
}

// ============================================================================
// Key encodings
// ============================================================================

fn encode_spki(public_key: &PublicKey) -> Result<Vec<u8>, ChainError> {
    let point = k256::PublicKey::from_sec1_bytes(&public_key.serialize_uncompressed())
        .map_err(|e| ChainError::CryptoError(format!("Invalid public key: {}", e)))?;
    let document = point
        .to_public_key_der()
        .map_err(|e| ChainError::FormatError(format!("SPKI encoding failed: {}", e)))?;
    Ok(document.as_bytes().to_vec())
}

fn decode_spki(der: &[u8]) -> Result<PublicKey, ChainError> {
    let point = k256::PublicKey::from_public_key_der(der).map_err(|e| {
        ChainError::FormatError(format!("Not a secp256k1 SubjectPublicKeyInfo: {}", e))
    })?;
    PublicKey::from_slice(point.to_encoded_point(false).as_bytes())
        .map_err(|e| ChainError::CryptoError(format!("Invalid public key: {}", e)))
}

/// Parses an address back into a public key.
pub fn public_key_from_address(address: &str) -> Result<PublicKey, ChainError> {
    let der = BASE64
        .decode(address)
        .map_err(|e| ChainError::FormatError(format!("Address is not valid base64: {}", e)))?;
    decode_spki(&der)
}

/// Imports a base64 PKCS#8 secp256k1 private key. Both the minimal form written
/// by [`KeyPair::export_pkcs8_base64`] and the form OpenSSL emits, with the
/// embedded public key, are accepted.
pub fn import_private_key(base64_pkcs8: &str) -> Result<KeyPair, ChainError> {
    let der = BASE64
        .decode(base64_pkcs8.trim())
        .map_err(|e| ChainError::FormatError(format!("Private key is not valid base64: {}", e)))?;
    let secret = k256::SecretKey::from_pkcs8_der(&der)
        .map_err(|e| ChainError::FormatError(format!("Not a secp256k1 PKCS#8 private key: {}", e)))?;
    let secret_key = SecretKey::from_slice(&secret.to_bytes())
        .map_err(|e| ChainError::CryptoError(format!("Invalid private key: {}", e)))?;
    KeyPair::from_secret_key(secret_key)
}

// ============================================================================
// Signatures
// ============================================================================

/// Signs the UTF-8 bytes of `data`; returns the base64 signature.
pub fn sign_data<S: Signer + ?Sized>(data: &str, signer: &S) -> Result<String, ChainError> {
    let signature = signer.sign(data.as_bytes())?;
    Ok(BASE64.encode(signature))
}

/// Verifies a base64 signature over the UTF-8 bytes of `data` against a base64 SPKI
/// public key, reporting why it failed.
pub fn verify_signature_strict(
    data: &str,
    signature_base64: &str,
    public_key_base64: &str,
) -> Result<(), ChainError> {
    let signature_bytes = BASE64
        .decode(signature_base64)
        .map_err(|e| ChainError::FormatError(format!("Signature is not valid base64: {}", e)))?;
    if signature_bytes.len() != COMPACT_SIGNATURE_SIZE {
        return Err(ChainError::FormatError(format!(
            "Signature must be exactly {} bytes (compact), got {}",
            COMPACT_SIGNATURE_SIZE,
            signature_bytes.len()
        )));
    }
    let public_key = public_key_from_address(public_key_base64)?;

    let digest = Sha256::digest(data.as_bytes());
    let message = Message::from_digest_slice(&digest)
        .map_err(|e| ChainError::CryptoError(format!("Failed to create message: {}", e)))?;
    let signature = Signature::from_compact(&signature_bytes)
        .map_err(|e| ChainError::CryptoError(format!("Invalid signature: {}", e)))?;

    SECP256K1_CONTEXT
        .verify_ecdsa(&message, &signature, &public_key)
        .map_err(|_| ChainError::CryptoError("Signature verification failed".to_string()))
}

/// Boolean form of [`verify_signature_strict`]: every failure is just `false`.
pub fn verify_signature(data: &str, signature_base64: &str, public_key_base64: &str) -> bool {
    verify_signature_strict(data, signature_base64, public_key_base64).is_ok()
}

/// Signs `tx` in place after checking that `signer` really owns `tx.from`.
pub fn sign_transaction<S: Signer + ?Sized>(
    tx: &mut Transaction,
    signer: &S,
    hasher: &KeyedHasher,
) -> Result<(), ChainError> {
    let signer_address = signer.address();
    match tx.from.as_deref() {
        Some(from) if from == signer_address => {}
        _ => {
            return Err(ChainError::AuthenticationError(
                "Private key does not match the transaction sender".to_string(),
            ))
        }
    }
    let hash = tx.compute_hash(hasher)?;
    tx.signature = Some(sign_data(&hash, signer)?);
    Ok(())
}
