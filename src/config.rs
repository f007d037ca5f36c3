//! Configuration for blvm-covenant
//!
//! Tunable parameters for state digests, lazily-verified maps and rejection
//! logging. Settings can be deserialized from a config file, read from
//! environment variables, or built programmatically. Nothing here is global:
//! a [`CovenantConfig`] is a value handed to whatever needs it.

use crate::constants::{DEFAULT_MAP_DEPTH, DEFAULT_MAX_STATE_LEAVES, MAX_MAP_DEPTH, MAX_STATE_LEAVES};
use crate::crypto::DigestAlgorithm;
use crate::error::{CovenantError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// State digest configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDigestConfig {
    /// Hash used for leaves and the final digest
    /// Default: hash160 (20-byte digest)
    #[serde(default)]
    pub algorithm: DigestAlgorithm,

    /// Maximum flattened leaves per state
    /// Default: 64, hard ceiling 256
    #[serde(default = "default_max_leaves")]
    pub max_leaves: usize,
}

fn default_max_leaves() -> usize {
    DEFAULT_MAX_STATE_LEAVES
}

impl Default for StateDigestConfig {
    fn default() -> Self {
        Self {
            algorithm: DigestAlgorithm::default(),
            max_leaves: DEFAULT_MAX_STATE_LEAVES,
        }
    }
}

/// Lazily-verified map configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashedMapConfig {
    /// Sparse Merkle tree depth in bits
    /// Default: 64
    #[serde(default = "default_map_depth")]
    pub depth: usize,
}

fn default_map_depth() -> usize {
    DEFAULT_MAP_DEPTH
}

impl Default for HashedMapConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_MAP_DEPTH,
        }
    }
}

/// Debug configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DebugConfig {
    /// Emit a warning for every rejected verification
    /// Default: false
    #[serde(default)]
    pub log_rejections: bool,
}

/// Complete covenant configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CovenantConfig {
    #[serde(default)]
    pub state_digest: StateDigestConfig,

    #[serde(default)]
    pub hashed_map: HashedMapConfig,

    #[serde(default)]
    pub debug: DebugConfig,
}

impl CovenantConfig {
    /// Load configuration from environment variables
    ///
    /// Variables follow `BLVM_COVENANT_<SECTION>_<KEY>`. Unset or unparsable
    /// values keep their defaults; call [`CovenantConfig::validate`] on the
    /// result before use.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`CovenantConfig::from_env`] over an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(val) = lookup("BLVM_COVENANT_STATE_DIGEST_ALGORITHM") {
            if let Some(algorithm) = DigestAlgorithm::parse(&val) {
                config.state_digest.algorithm = algorithm;
            }
        }
        if let Some(val) = lookup("BLVM_COVENANT_STATE_DIGEST_MAX_LEAVES") {
            if let Ok(max) = val.parse::<usize>() {
                config.state_digest.max_leaves = max;
            }
        }

        if let Some(val) = lookup("BLVM_COVENANT_HASHED_MAP_DEPTH") {
            if let Ok(depth) = val.parse::<usize>() {
                config.hashed_map.depth = depth;
            }
        }

        if let Some(val) = lookup("BLVM_COVENANT_DEBUG_LOG_REJECTIONS") {
            if let Ok(enabled) = val.parse::<bool>() {
                config.debug.log_rejections = enabled;
            }
        }

        config
    }

    /// Parse a JSON config document; absent sections use defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CovenantError::InvalidConfig(Cow::Owned(e.to_string())))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values beyond the hard ceilings
    pub fn validate(&self) -> Result<()> {
        if self.state_digest.max_leaves == 0 || self.state_digest.max_leaves > MAX_STATE_LEAVES {
            return Err(CovenantError::InvalidConfig(Cow::Owned(format!(
                "state_digest.max_leaves must be in 1..={MAX_STATE_LEAVES}, got {}",
                self.state_digest.max_leaves
            ))));
        }
        if self.hashed_map.depth == 0 || self.hashed_map.depth > MAX_MAP_DEPTH {
            return Err(CovenantError::InvalidConfig(Cow::Owned(format!(
                "hashed_map.depth must be in 1..={MAX_MAP_DEPTH}, got {}",
                self.hashed_map.depth
            ))));
        }
        Ok(())
    }
}
