//! Hash primitives used by the covenant commitments
//!
//! The VM exposes exactly these functions (SHA-256, RIPEMD-160 and their
//! compositions), so every commitment here must be reproducible with them.

use crate::types::{Hash, ShortHash};
use ripemd::Ripemd160;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Single SHA-256
pub fn sha256(data: &[u8]) -> Hash {
    let hash = Sha256::digest(data);
    let mut result = [0u8; 32];
    result.copy_from_slice(&hash);
    result
}

/// Double SHA-256 (transaction ids and sighashes)
pub fn hash256(data: &[u8]) -> Hash {
    sha256(&sha256(data))
}

/// Single RIPEMD-160
pub fn ripemd160(data: &[u8]) -> ShortHash {
    let hash = Ripemd160::digest(data);
    let mut result = [0u8; 20];
    result.copy_from_slice(&hash);
    result
}

/// RIPEMD-160(SHA-256(data))
pub fn hash160(data: &[u8]) -> ShortHash {
    ripemd160(&sha256(data))
}

/// Hash function selected for state digests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// 20-byte digest, cheapest to compare in script
    #[default]
    Hash160,
    /// 32-byte digest
    Sha256,
}

impl DigestAlgorithm {
    pub fn output_len(&self) -> usize {
        match self {
            DigestAlgorithm::Hash160 => 20,
            DigestAlgorithm::Sha256 => 32,
        }
    }

    pub fn hash(&self, data: &[u8]) -> Vec<u8> {
        match self {
            DigestAlgorithm::Hash160 => hash160(data).to_vec(),
            DigestAlgorithm::Sha256 => sha256(data).to_vec(),
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "hash160" => Some(DigestAlgorithm::Hash160),
            "sha256" => Some(DigestAlgorithm::Sha256),
            _ => None,
        }
    }
}
