//! Mnemonic phrases: entropy ⇄ words ⇄ seed
//!
//! The 2048-entry word list is an explicit value handed to [`MnemonicCodec`];
//! nothing here reads global state. Bits are packed most-significant first and
//! the checksum is the leading `ENT / 32` bits of `SHA-256(entropy)`.

use crate::error::ChainError;
use pbkdf2::pbkdf2_hmac;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256, Sha512};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use unicode_normalization::UnicodeNormalization;

/// Number of entries a word list must have (one per 11-bit group).
pub const WORD_LIST_LEN: usize = 2048;
/// Entropy sizes the codec accepts.
pub const ALLOWED_ENTROPY_BITS: [usize; 5] = [128, 160, 192, 224, 256];
/// Entropy size used when a wallet is generated without an explicit size.
pub const DEFAULT_ENTROPY_BITS: usize = 128;
/// Length of the derived seed in bytes.
pub const SEED_LEN: usize = 64;

const SEED_SALT: &str = "mnemonic";
const SEED_ROUNDS: u32 = 2048;
const BITS_PER_WORD: usize = 11;

/// An immutable, ordered list of exactly 2048 distinct words.
#[derive(Debug, Clone)]
pub struct WordList {
    words: Vec<String>,
    positions: HashMap<String, u16>,
}

impl WordList {
    /// The BIP-39 English list shipped with the `bip39` crate.
    pub fn english() -> Self {
        let words: Vec<String> = bip39::Language::English
            .word_list()
            .iter()
            .map(|w| w.to_string())
            .collect();
        let positions = index_words(&words);
        WordList { words, positions }
    }

    /// Builds a list from newline-separated text, one word per line. Blank lines
    /// and surrounding whitespace are ignored.
    pub fn from_lines(text: &str) -> Result<Self, ChainError> {
        let words: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        if words.len() != WORD_LIST_LEN {
            return Err(ChainError::MnemonicError(format!(
                "Word list must contain exactly {} words, got {}",
                WORD_LIST_LEN,
                words.len()
            )));
        }

        let positions = index_words(&words);
        if positions.len() != WORD_LIST_LEN {
            return Err(ChainError::MnemonicError(
                "Word list contains duplicate entries".to_string(),
            ));
        }
        Ok(WordList { words, positions })
    }

    /// Loads a list from a file with one word per line.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ChainError> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ChainError::MnemonicError(format!(
                "Failed to read word list {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_lines(&text)
    }

    pub fn word(&self, index: u16) -> Option<&str> {
        self.words.get(index as usize).map(String::as_str)
    }

    pub fn position(&self, word: &str) -> Option<u16> {
        self.positions.get(word).copied()
    }
}

fn index_words(words: &[String]) -> HashMap<String, u16> {
    words
        .iter()
        .enumerate()
        .map(|(i, w)| (w.clone(), i as u16))
        .collect()
}

/// Encodes entropy as word phrases and derives seeds from them.
#[derive(Debug, Clone)]
pub struct MnemonicCodec {
    words: Arc<WordList>,
}

impl MnemonicCodec {
    pub fn new(words: WordList) -> Self {
        Self {
            words: Arc::new(words),
        }
    }

    pub fn word_list(&self) -> &WordList {
        &self.words
    }

    /// Draws `entropy_bits / 8` random bytes from the OS and encodes them.
    pub fn generate_mnemonic(&self, entropy_bits: usize) -> Result<String, ChainError> {
        check_entropy_bits(entropy_bits)?;
        let mut entropy = vec![0u8; entropy_bits / 8];
        OsRng.fill_bytes(&mut entropy);
        self.mnemonic_from_entropy(&entropy)
    }

    pub fn mnemonic_from_entropy(&self, entropy: &[u8]) -> Result<String, ChainError> {
        let entropy_bits = entropy.len() * 8;
        check_entropy_bits(entropy_bits)?;

        let checksum_bits = entropy_bits / 32;
        let checksum = Sha256::digest(entropy)[0] >> (8 - checksum_bits);

        let groups = entropy
            .iter()
            .map(|byte| (u32::from(*byte), 8))
            .chain(std::iter::once((u32::from(checksum), checksum_bits)));

        let mut indices = Vec::with_capacity((entropy_bits + checksum_bits) / BITS_PER_WORD);
        let mut acc: u32 = 0;
        let mut acc_bits = 0usize;
        for (value, bits) in groups {
            acc = (acc << bits) | value;
            acc_bits += bits;
            while acc_bits >= BITS_PER_WORD {
                acc_bits -= BITS_PER_WORD;
                indices.push(((acc >> acc_bits) & 0x7ff) as u16);
                acc &= (1 << acc_bits) - 1;
            }
        }

        let words = indices
            .into_iter()
            .map(|index| {
                self.words.word(index).ok_or_else(|| {
                    ChainError::MnemonicError(format!("Word index {} out of range", index))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(words.join(" "))
    }

    /// Recovers the entropy behind `mnemonic`, checking every word and the checksum.
    pub fn entropy_from_mnemonic(&self, mnemonic: &str) -> Result<Vec<u8>, ChainError> {
        let normalized: String = mnemonic.nfkd().collect();
        let tokens: Vec<&str> = normalized.split_whitespace().collect();

        let total_bits = tokens.len() * BITS_PER_WORD;
        let entropy_bits = total_bits * 32 / 33;
        if total_bits % 33 != 0 || check_entropy_bits(entropy_bits).is_err() {
            return Err(ChainError::MnemonicError(format!(
                "Mnemonic must have 12, 15, 18, 21 or 24 words, got {}",
                tokens.len()
            )));
        }
        let checksum_bits = entropy_bits / 32;
        let entropy_len = entropy_bits / 8;

        let mut entropy = Vec::with_capacity(entropy_len);
        let mut acc: u32 = 0;
        let mut acc_bits = 0usize;
        for token in &tokens {
            let index = self.words.position(token).ok_or_else(|| {
                ChainError::MnemonicError(format!("Unknown word in mnemonic: {}", token))
            })?;
            acc = (acc << BITS_PER_WORD) | u32::from(index);
            acc_bits += BITS_PER_WORD;
            while acc_bits >= 8 && entropy.len() < entropy_len {
                acc_bits -= 8;
                entropy.push(((acc >> acc_bits) & 0xff) as u8);
                acc &= (1 << acc_bits) - 1;
            }
        }

        debug_assert_eq!(acc_bits, checksum_bits);
        let expected = Sha256::digest(&entropy)[0] >> (8 - checksum_bits);
        if acc != u32::from(expected) {
            return Err(ChainError::MnemonicError(
                "Mnemonic checksum does not match".to_string(),
            ));
        }
        Ok(entropy)
    }

    pub fn validate(&self, mnemonic: &str) -> Result<(), ChainError> {
        self.entropy_from_mnemonic(mnemonic).map(|_| ())
    }

    /// PBKDF2-HMAC-SHA512 over the NFKD-normalized phrase, 2048 rounds, salt
    /// `"mnemonic"`. Accepts any phrase; it does not consult the word list.
    pub fn mnemonic_to_seed(mnemonic: &str) -> [u8; SEED_LEN] {
        let normalized: String = mnemonic.nfkd().collect();
        let mut seed = [0u8; SEED_LEN];
        pbkdf2_hmac::<Sha512>(
            normalized.as_bytes(),
            SEED_SALT.as_bytes(),
            SEED_ROUNDS,
            &mut seed,
        );
        seed
    }
}

fn check_entropy_bits(entropy_bits: usize) -> Result<(), ChainError> {
    if ALLOWED_ENTROPY_BITS.contains(&entropy_bits) {
        Ok(())
    } else {
        Err(ChainError::MnemonicError(format!(
            "Entropy must be 128-256 bits and divisible by 32, got {}",
            entropy_bits
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> MnemonicCodec {
        MnemonicCodec::new(WordList::english())
    }

    #[test]
    fn test_all_zero_entropy_vector() {
        let phrase = codec().mnemonic_from_entropy(&[0u8; 16]).unwrap();
        assert_eq!(
            phrase,
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about"
        );
    }

    #[test]
    fn test_matches_bip39_crate_for_every_size() {
        let codec = codec();
        for bits in ALLOWED_ENTROPY_BITS {
            let entropy: Vec<u8> = (0..bits / 8).map(|i| (i * 37 + 11) as u8).collect();
            let ours = codec.mnemonic_from_entropy(&entropy).unwrap();
            let reference = bip39::Mnemonic::from_entropy(&entropy).unwrap().to_string();
            assert_eq!(ours, reference, "mismatch for {} bits", bits);
            assert_eq!(codec.entropy_from_mnemonic(&ours).unwrap(), entropy);
        }
    }

    #[test]
    fn test_seed_matches_bip39_crate() {
        let phrase = codec().generate_mnemonic(128).unwrap();
        let reference = bip39::Mnemonic::parse_normalized(&phrase).unwrap().to_seed_normalized("");
        assert_eq!(MnemonicCodec::mnemonic_to_seed(&phrase), reference);
    }

    #[test]
    fn test_generated_word_counts() {
        let codec = codec();
        for (bits, words) in [(128, 12), (160, 15), (192, 18), (224, 21), (256, 24)] {
            let phrase = codec.generate_mnemonic(bits).unwrap();
            assert_eq!(phrase.split(' ').count(), words);
            assert!(codec.validate(&phrase).is_ok());
        }
    }

    #[test]
    fn test_rejects_unsupported_entropy() {
        let codec = codec();
        assert!(codec.generate_mnemonic(100).is_err());
        assert!(codec.generate_mnemonic(288).is_err());
        assert!(codec.mnemonic_from_entropy(&[0u8; 15]).is_err());
    }

    #[test]
    fn test_bad_checksum_and_unknown_words() {
        let codec = codec();
        let bad_checksum = "abandon ".repeat(12);
        let err = codec.validate(bad_checksum.trim()).unwrap_err();
        assert!(err.to_string().contains("checksum"));

        let unknown = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon zzzz";
        assert!(codec.validate(unknown).unwrap_err().to_string().contains("Unknown word"));

        assert!(codec.validate("abandon about").is_err());
        assert!(codec.validate("").is_err());
    }

    #[test]
    fn test_seed_is_deterministic() {
        let phrase = codec().generate_mnemonic(256).unwrap();
        assert_eq!(
            MnemonicCodec::mnemonic_to_seed(&phrase),
            MnemonicCodec::mnemonic_to_seed(&phrase)
        );
        assert_ne!(
            MnemonicCodec::mnemonic_to_seed(&phrase),
            MnemonicCodec::mnemonic_to_seed("something else")
        );
    }

    #[test]
    fn test_custom_word_list() {
        let text: String = (0..WORD_LIST_LEN).map(|i| format!("w{}\n", i)).collect();
        let list = WordList::from_lines(&text).unwrap();
        assert_eq!(list.word(5), Some("w5"));
        assert_eq!(list.position("w2047"), Some(2047));

        let codec = MnemonicCodec::new(list);
        let phrase = codec.mnemonic_from_entropy(&[0u8; 16]).unwrap();
        assert!(phrase.starts_with("w0 w0"));
        assert_eq!(codec.entropy_from_mnemonic(&phrase).unwrap(), vec![0u8; 16]);
    }

    #[test]
    fn test_word_list_size_and_duplicates() {
        assert!(WordList::from_lines("one\ntwo\n").is_err());
        let dupes: String = (0..WORD_LIST_LEN).map(|i| format!("w{}\n", i % 2047)).collect();
        let err = WordList::from_lines(&dupes).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }
}
