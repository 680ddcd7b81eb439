//! Configuration management for ArgonChain

use crate::crypto::{HashParams, KeyedHasher};
use crate::error::ChainError;
use crate::mnemonic::{MnemonicCodec, WordList, ALLOWED_ENTROPY_BITS, DEFAULT_ENTROPY_BITS};
use crate::transaction::Amount;
use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "argonchain.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub hashing: HashingConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    #[serde(default = "default_difficulty")]
    pub difficulty: u32,
    /// Written as a decimal string (`"0.1"`) or a TOML number. Strings are
    /// exact; numbers go through their shortest decimal form.
    #[serde(
        default = "default_mining_reward",
        deserialize_with = "deserialize_amount"
    )]
    pub mining_reward: Amount,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            mining_reward: default_mining_reward(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HashingConfig {
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    #[serde(default = "default_memory_kib")]
    pub memory_kib: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            parallelism: default_parallelism(),
            iterations: default_iterations(),
            memory_kib: default_memory_kib(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    #[serde(default = "default_entropy_bits")]
    pub entropy_bits: usize,
    /// 2048-line word list; the BIP-39 English list when unset.
    #[serde(default)]
    pub wordlist_path: Option<PathBuf>,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            entropy_bits: default_entropy_bits(),
            wordlist_path: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    /// No persistence when unset.
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

fn default_difficulty() -> u32 {
    crate::blockchain::DEFAULT_DIFFICULTY
}

fn default_mining_reward() -> Amount {
    Amount::from_num(50)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AmountRepr {
    Text(String),
    Integer(i64),
    Float(f64),
}

fn deserialize_amount<'de, D>(deserializer: D) -> Result<Amount, D::Error>
where
    D: Deserializer<'de>,
{
    let text = match AmountRepr::deserialize(deserializer)? {
        AmountRepr::Text(text) => text,
        AmountRepr::Integer(value) => value.to_string(),
        AmountRepr::Float(value) if value.is_finite() => value.to_string(),
        AmountRepr::Float(value) => {
            return Err(serde::de::Error::custom(format!("amount {} is not finite", value)))
        }
    };
    parse_amount(&text).map_err(serde::de::Error::custom)
}

/// Parses a decimal amount such as `"12.5"` exactly, without going through `f64`.
pub fn parse_amount(text: &str) -> Result<Amount, String> {
    let text = text.trim();
    text.parse::<Amount>()
        .map_err(|e| format!("invalid amount {:?}: {}", text, e))
}

fn default_parallelism() -> u32 {
    HashParams::default().parallelism
}

fn default_iterations() -> u32 {
    HashParams::default().iterations
}

fn default_memory_kib() -> u32 {
    HashParams::default().memory_kib
}

fn default_entropy_bits() -> usize {
    DEFAULT_ENTROPY_BITS
}

impl Config {
    pub fn hash_params(&self) -> HashParams {
        HashParams {
            parallelism: self.hashing.parallelism,
            iterations: self.hashing.iterations,
            memory_kib: self.hashing.memory_kib,
        }
    }

    pub fn build_hasher(&self) -> Result<KeyedHasher, ChainError> {
        KeyedHasher::new(self.hash_params())
    }

    pub fn mining_reward(&self) -> Amount {
        self.chain.mining_reward
    }

    pub fn build_codec(&self) -> Result<MnemonicCodec, ChainError> {
        let words = match &self.wallet.wordlist_path {
            Some(path) => WordList::load(path)?,
            None => WordList::english(),
        };
        Ok(MnemonicCodec::new(words))
    }

    pub fn validate(&self) -> Result<(), ChainError> {
        check_difficulty(self.chain.difficulty)
            .map_err(|e| ChainError::ConfigError(format!("chain.difficulty: {}", e)))?;
        let reward = self.chain.mining_reward;
        if reward <= Amount::ZERO {
            return Err(ChainError::ConfigError(format!(
                "chain.mining_reward must be positive, got {}",
                reward
            )));
        }
        if !ALLOWED_ENTROPY_BITS.contains(&self.wallet.entropy_bits) {
            return Err(ChainError::ConfigError(format!(
                "wallet.entropy_bits must be one of {:?}, got {}",
                ALLOWED_ENTROPY_BITS, self.wallet.entropy_bits
            )));
        }
        self.build_hasher()
            .map_err(|e| ChainError::ConfigError(format!("invalid [hashing] section: {}", e)))?;
        Ok(())
    }
}

/// Every digest is 64 hex characters, so no more leading zeros can be asked for.
pub fn check_difficulty(difficulty: u32) -> Result<(), ChainError> {
    if difficulty > crate::blockchain::MAX_DIFFICULTY {
        return Err(ChainError::ConfigError(format!(
            "difficulty must be at most {}, got {}",
            crate::blockchain::MAX_DIFFICULTY,
            difficulty
        )));
    }
    Ok(())
}

/// Reads `path` (or `argonchain.toml`), falling back to defaults when the file
/// does not exist, and validates the result.
pub fn load_config(path: Option<&Path>) -> Result<Config, ChainError> {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    let config = if path.exists() {
        let text = fs::read_to_string(path)?;
        parse_config(&text)?
    } else {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        Config::default()
    };
    config.validate()?;
    Ok(config)
}

pub fn parse_config(text: &str) -> Result<Config, ChainError> {
    toml::from_str(text).map_err(|e| ChainError::ConfigError(e.to_string()))
}
