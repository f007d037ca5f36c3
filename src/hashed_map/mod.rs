//! Lazily-Verified Map
//!
//! A key-value map kept off-chain whose contents are committed in the state
//! as a single 32-byte root. Each read or write inside a transition carries a
//! Merkle proof for the touched entry, so verification never needs the rest
//! of the map.
//!
//! Layout: a sparse Merkle tree of fixed depth.
//! - slot = first `depth` bits of SHA-256(serialize(key)), most significant first
//! - leaf = SHA-256(push(serialize(key)) ‖ push(serialize(value)))
//! - empty leaf = 32 zero bytes
//! - node = SHA-256(left ‖ right)
//!
//! Proof siblings are ordered from the leaf level up to the root.
//!
//! Two keys sharing a slot cannot both be stored. With caller-chosen keys a
//! colliding key for a given victim costs about 2^depth hashes to grind, and
//! any colliding pair about 2^(depth/2); the default depth of 64 keeps both
//! out of reach. Shallower maps trade that margin for shorter proofs.

pub mod store;

pub use store::HashedMapStore;

use crate::config::HashedMapConfig;
use crate::constants::{HASH_SIZE, MAX_MAP_DEPTH};
use crate::crypto::sha256;
use crate::error::{CovenantError, Result};
use crate::schema::FieldType;
use crate::serialization::push_data::write_push;
use crate::serialization::{serialize_value, PrimitiveValue, ValueKind};
use crate::types::Hash;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tracing::debug;

pub const EMPTY_LEAF: Hash = [0u8; HASH_SIZE];

/// Map slot: the leading `depth` bits of the key hash, rest zeroed
pub type Slot = [u8; HASH_SIZE];

/// Merkle proof for one key
///
/// `value` is the entry claimed to be stored under the key, `None` for an
/// absent key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapProof {
    pub value: Option<PrimitiveValue>,
    pub siblings: Vec<Hash>,
}

/// Verifier parameters for one map field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashedMap {
    depth: usize,
    key_kind: Option<ValueKind>,
    value_kind: Option<ValueKind>,
}

impl Default for HashedMap {
    fn default() -> Self {
        Self::from_config(&HashedMapConfig::default())
    }
}

impl HashedMap {
    pub fn new(depth: usize) -> Result<Self> {
        if depth == 0 || depth > MAX_MAP_DEPTH {
            return Err(CovenantError::InvalidConfig(Cow::Owned(format!(
                "map depth must be in 1..={MAX_MAP_DEPTH}, got {depth}"
            ))));
        }
        Ok(Self {
            depth,
            key_kind: None,
            value_kind: None,
        })
    }

    /// Depth is validated by [`crate::config::CovenantConfig::validate`];
    /// out-of-range values are clamped.
    pub fn from_config(config: &HashedMapConfig) -> Self {
        Self {
            depth: config.depth.clamp(1, MAX_MAP_DEPTH),
            key_kind: None,
            value_kind: None,
        }
    }

    /// Parameters for a `HashedMap<K, V>` schema field
    pub fn for_field(ty: &FieldType, depth: usize) -> Result<Self> {
        match ty {
            FieldType::HashedMap { key, value } => Ok(Self {
                key_kind: Some(*key),
                value_kind: Some(*value),
                ..Self::new(depth)?
            }),
            other => Err(CovenantError::StateShapeMismatch(Cow::Owned(format!(
                "{other} is not a map type"
            )))),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Root of the map with no entries
    pub fn empty_root(&self) -> Hash {
        (0..self.depth).fold(EMPTY_LEAF, |node, _| hash_node(&node, &node))
    }

    pub fn slot(&self, key: &PrimitiveValue) -> Slot {
        let mut slot = sha256(&serialize_value(key));
        let full_bytes = self.depth / 8;
        let rem_bits = self.depth % 8;
        if full_bytes < HASH_SIZE {
            slot[full_bytes] &= !(0xffu8 >> rem_bits);
            slot[full_bytes + 1..].fill(0);
        }
        slot
    }

    pub fn leaf_hash(&self, key: &PrimitiveValue, value: &PrimitiveValue) -> Hash {
        let key_bytes = serialize_value(key);
        let value_bytes = serialize_value(value);
        let mut buf = Vec::with_capacity(key_bytes.len() + value_bytes.len() + 10);
        write_push(&mut buf, &key_bytes);
        write_push(&mut buf, &value_bytes);
        sha256(&buf)
    }

    fn check_kinds(&self, key: &PrimitiveValue, value: Option<&PrimitiveValue>) -> Result<()> {
        if let Some(kind) = self.key_kind {
            if key.kind() != kind {
                return Err(CovenantError::StateShapeMismatch(Cow::Owned(format!(
                    "map key must be {kind:?}, got {:?}",
                    key.kind()
                ))));
            }
        }
        if let (Some(kind), Some(value)) = (self.value_kind, value) {
            if value.kind() != kind {
                return Err(CovenantError::StateShapeMismatch(Cow::Owned(format!(
                    "map value must be {kind:?}, got {:?}",
                    value.kind()
                ))));
            }
        }
        Ok(())
    }

    /// Root implied by placing `value` under `key` with the given siblings
    pub fn compute_root(
        &self,
        key: &PrimitiveValue,
        value: Option<&PrimitiveValue>,
        siblings: &[Hash],
    ) -> Result<Hash> {
        if siblings.len() != self.depth {
            return Err(CovenantError::ProofMismatch(Cow::Owned(format!(
                "proof has {} siblings, map depth is {}",
                siblings.len(),
                self.depth
            ))));
        }
        let slot = self.slot(key);
        let mut node = match value {
            Some(value) => self.leaf_hash(key, value),
            None => EMPTY_LEAF,
        };
        for (level, sibling) in (0..self.depth).rev().zip(siblings) {
            node = if slot_bit(&slot, level) {
                hash_node(sibling, &node)
            } else {
                hash_node(&node, sibling)
            };
        }
        Ok(node)
    }

    fn verify(&self, root: &Hash, key: &PrimitiveValue, proof: &MapProof) -> Result<()> {
        self.check_kinds(key, proof.value.as_ref())?;
        let computed = self.compute_root(key, proof.value.as_ref(), &proof.siblings)?;
        if computed != *root {
            debug!(
                key = %key,
                root = %hex::encode(root),
                computed = %hex::encode(computed),
                "map proof does not match root"
            );
            return Err(CovenantError::ProofMismatch(Cow::Borrowed(
                "proof does not reproduce the committed root",
            )));
        }
        Ok(())
    }

    /// Value stored under `key`
    pub fn get(&self, root: &Hash, key: &PrimitiveValue, proof: &MapProof) -> Result<PrimitiveValue> {
        self.verify(root, key, proof)?;
        proof.value.clone().ok_or(CovenantError::ProofMismatch(Cow::Borrowed(
            "key is absent from the map",
        )))
    }

    /// `key` has no entry
    pub fn verify_absent(&self, root: &Hash, key: &PrimitiveValue, proof: &MapProof) -> Result<()> {
        if proof.value.is_some() {
            return Err(CovenantError::ProofMismatch(Cow::Borrowed(
                "absence proof carries a value",
            )));
        }
        self.verify(root, key, proof)
    }

    /// Replace the entry under `key`; `None` deletes it
    ///
    /// `old_proof` must verify against `root`. The result is the new root.
    pub fn set(
        &self,
        root: &Hash,
        key: &PrimitiveValue,
        old_proof: &MapProof,
        new_value: Option<&PrimitiveValue>,
    ) -> Result<Hash> {
        self.verify(root, key, old_proof)?;
        self.check_kinds(key, new_value)?;
        self.compute_root(key, new_value, &old_proof.siblings)
    }
}

pub fn hash_node(left: &Hash, right: &Hash) -> Hash {
    let mut buf = [0u8; 2 * HASH_SIZE];
    buf[..HASH_SIZE].copy_from_slice(left);
    buf[HASH_SIZE..].copy_from_slice(right);
    sha256(&buf)
}

/// Bit `index` of a slot, most significant bit first; set means right child
pub fn slot_bit(slot: &Slot, index: usize) -> bool {
    (slot[index / 8] >> (7 - index % 8)) & 1 == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> HashedMap {
        HashedMap::new(8).unwrap()
    }

    #[test]
    fn test_depth_bounds() {
        assert!(HashedMap::new(0).is_err());
        assert!(HashedMap::new(MAX_MAP_DEPTH).is_ok());
        assert!(HashedMap::new(MAX_MAP_DEPTH + 1).is_err());
    }

    #[test]
    fn test_slot_is_truncated_key_hash() {
        let map = HashedMap::new(12).unwrap();
        let key = PrimitiveValue::from(7i64);
        let full = sha256(&serialize_value(&key));
        let slot = map.slot(&key);
        assert_eq!(slot[0], full[0]);
        assert_eq!(slot[1], full[1] & 0xf0);
        assert!(slot[2..].iter().all(|b| *b == 0));

        let full_depth = HashedMap::new(MAX_MAP_DEPTH).unwrap();
        assert_eq!(full_depth.slot(&key), full);
    }

    #[test]
    fn test_empty_map_absence() {
        let map = map();
        let root = map.empty_root();
        let mut siblings = Vec::new();
        let mut node = EMPTY_LEAF;
        for _ in 0..8 {
            siblings.push(node);
            node = hash_node(&node, &node);
        }
        let proof = MapProof {
            value: None,
            siblings,
        };
        let key = PrimitiveValue::from(1i64);
        map.verify_absent(&root, &key, &proof).unwrap();
        assert!(map.get(&root, &key, &proof).is_err());
    }

    #[test]
    fn test_kind_checks() {
        let ty = FieldType::HashedMap {
            key: ValueKind::Int,
            value: ValueKind::Bytes,
        };
        let map = HashedMap::for_field(&ty, 8).unwrap();
        let proof = MapProof {
            value: None,
            siblings: vec![EMPTY_LEAF; 8],
        };
        assert!(matches!(
            map.verify_absent(&map.empty_root(), &PrimitiveValue::from(true), &proof),
            Err(CovenantError::StateShapeMismatch(_))
        ));
        assert!(HashedMap::for_field(&FieldType::Int, 8).is_err());
    }

    #[test]
    fn test_wrong_sibling_count() {
        let map = map();
        let proof = MapProof {
            value: None,
            siblings: vec![EMPTY_LEAF; 7],
        };
        assert!(matches!(
            map.verify_absent(&map.empty_root(), &PrimitiveValue::from(1i64), &proof),
            Err(CovenantError::ProofMismatch(_))
        ));
    }
}
