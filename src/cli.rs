//! Helpers shared by the command-line binaries.

use crate::blockchain::Blockchain;
use crate::config::{check_difficulty, load_config, Config};
use crate::crypto::{HashParams, KeyedHasher};
use crate::error::ChainError;
use crate::persistence::{JsonFilePersistence, Persistence};
use crate::transaction::Amount;
use std::path::Path;
use std::sync::Arc;

/// A ledger built from configuration, with the backend it was loaded from.
pub struct LoadedLedger {
    pub config: Config,
    pub blockchain: Blockchain,
    pub persistence: Option<Arc<dyn Persistence>>,
}

/// Command-line replacements for the configured chain rules.
#[derive(Debug, Clone, Default)]
pub struct LedgerOverrides {
    pub difficulty: Option<u32>,
    pub mining_reward: Option<Amount>,
    /// Use [`HashParams::light`] instead of the configured hashing costs.
    pub light: bool,
}

impl LedgerOverrides {
    pub fn is_empty(&self) -> bool {
        self.difficulty.is_none() && self.mining_reward.is_none() && !self.light
    }
}

impl LoadedLedger {
    /// The ledger to run and the backend to save it to. With overrides a fresh
    /// ledger is built under the overridden rules and no backend is returned,
    /// so the saved snapshot is left as it was.
    pub fn with_overrides(
        self,
        overrides: &LedgerOverrides,
    ) -> Result<(Blockchain, Option<Arc<dyn Persistence>>), ChainError> {
        if overrides.is_empty() {
            return Ok((self.blockchain, self.persistence));
        }

        let difficulty = overrides.difficulty.unwrap_or(self.config.chain.difficulty);
        check_difficulty(difficulty)?;
        let reward = overrides
            .mining_reward
            .unwrap_or_else(|| self.config.mining_reward());
        if reward <= Amount::ZERO {
            return Err(ChainError::ConfigError(format!(
                "mining reward must be positive, got {}",
                reward
            )));
        }
        let params = if overrides.light {
            HashParams::light()
        } else {
            self.config.hash_params()
        };
        if self.persistence.is_some() {
            tracing::info!("overrides in effect, running without persistence");
        }
        Ok((
            Blockchain::new(difficulty, reward, KeyedHasher::new(params)?),
            None,
        ))
    }
}

/// Loads the configuration, then the ledger snapshot named by
/// `storage.snapshot_path`. A missing snapshot starts a fresh chain; a snapshot
/// that does not verify is an error and is left on disk untouched. A restored
/// ledger keeps the hash parameters it was saved with.
pub fn load_ledger_from_config(config_path: Option<&Path>) -> Result<LoadedLedger, ChainError> {
    let config = load_config(config_path)?;

    let persistence: Option<Arc<dyn Persistence>> = config
        .storage
        .snapshot_path
        .as_ref()
        .map(|path| Arc::new(JsonFilePersistence::new(path)) as Arc<dyn Persistence>);

    let loaded = match &persistence {
        Some(backend) => backend.load_blockchain().map_err(|e| {
            tracing::warn!("failed to load ledger snapshot: {}", e);
            e
        })?,
        None => None,
    };

    let blockchain = match loaded {
        Some(chain) => {
            if chain.hasher().params() != config.hash_params() {
                tracing::warn!(
                    saved = ?chain.hasher().params(),
                    configured = ?config.hash_params(),
                    "snapshot hash parameters differ from configuration, keeping the saved ones"
                );
            }
            tracing::info!(blocks = chain.len(), "ledger restored from snapshot");
            chain
        }
        None => Blockchain::new(
            config.chain.difficulty,
            config.mining_reward(),
            config.build_hasher()?,
        ),
    };

    Ok(LoadedLedger {
        config,
        blockchain,
        persistence,
    })
}

/// Shortens long base64 addresses for terminal output.
pub fn short_address(address: &str) -> String {
    const KEEP: usize = 12;
    if address.chars().count() <= KEEP * 2 + 3 {
        return address.to_string();
    }
    let head: String = address.chars().take(KEEP).collect();
    let tail: String = address
        .chars()
        .rev()
        .take(KEEP)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("{}...{}", head, tail)
}
