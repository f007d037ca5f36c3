//! Core transaction types for covenant verification

use serde::{Deserialize, Serialize};
use std::fmt;

/// Hash type: 256-bit hash
pub type Hash = [u8; 32];

/// Hash type: 160-bit hash
pub type ShortHash = [u8; 20];

/// Byte string type
pub type ByteString = Vec<u8>;

/// Network the covenant is deployed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
    Regtest,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Regtest => "regtest",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OutPoint: transaction id and output index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Outpoint {
    pub txid: Hash,
    pub index: u32,
}

impl Outpoint {
    pub fn new(txid: Hash, index: u32) -> Self {
        Self { txid, index }
    }

    /// 36-byte encoding: txid followed by the little-endian index
    pub fn to_bytes(&self) -> [u8; 36] {
        let mut out = [0u8; 36];
        out[..32].copy_from_slice(&self.txid);
        out[32..].copy_from_slice(&self.index.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8; 36]) -> Self {
        let mut txid = [0u8; 32];
        txid.copy_from_slice(&bytes[..32]);
        let index = u32::from_le_bytes([bytes[32], bytes[33], bytes[34], bytes[35]]);
        Self { txid, index }
    }
}

impl fmt::Display for Outpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", hex::encode(self.txid), self.index)
    }
}

/// Transaction input as it appears in the tx wire format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub prevout: Outpoint,
    /// Script hash of the output being spent
    pub spent_script_hash: Hash,
    pub sequence: u32,
}

/// Transaction output: amount, locking script hash and an optional state digest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub amount: u64,
    pub script_hash: Hash,
    /// Raw state digest bytes committed next to the value output
    pub state_digest: Option<ByteString>,
}

impl TxOutput {
    pub fn new(amount: u64, script_hash: Hash) -> Self {
        Self {
            amount,
            script_hash,
            state_digest: None,
        }
    }

    /// Stateful output; an empty `digest` means no state and gives a plain output
    pub fn with_state_digest(amount: u64, script_hash: Hash, digest: &[u8]) -> Self {
        Self {
            amount,
            script_hash,
            state_digest: (!digest.is_empty()).then(|| digest.to_vec()),
        }
    }

    /// Data hash committed for this output: SHA-256 of the state digest,
    /// or SHA-256 of the empty string when the output carries no state
    pub fn data_hash(&self) -> Hash {
        crate::crypto::sha256(self.state_digest.as_deref().unwrap_or(&[]))
    }
}

/// Output as committed in the tx wire format and in spent-output aggregates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedOutput {
    pub amount: u64,
    pub script_hash: Hash,
    pub data_hash: Hash,
}

impl From<&TxOutput> for CommittedOutput {
    fn from(output: &TxOutput) -> Self {
        Self {
            amount: output.amount,
            script_hash: output.script_hash,
            data_hash: output.data_hash(),
        }
    }
}

/// Transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outpoint_bytes() {
        let outpoint = Outpoint::new([7u8; 32], 0x0102_0304);
        let bytes = outpoint.to_bytes();
        assert_eq!(&bytes[32..], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(Outpoint::from_bytes(&bytes), outpoint);
    }

    #[test]
    fn test_data_hash_without_state() {
        let plain = TxOutput::new(1000, [1u8; 32]);
        assert_eq!(plain.data_hash(), crate::crypto::sha256(&[]));

        let stateful = TxOutput::with_state_digest(1000, [1u8; 32], &[9u8; 20]);
        assert_ne!(stateful.data_hash(), plain.data_hash());
    }
}
