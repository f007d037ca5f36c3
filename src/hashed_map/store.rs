//! Off-chain map contents
//!
//! Holds every entry of a lazily-verified map and produces the proofs a
//! transition needs. Entries are ordered by slot, so the subtree under any
//! slot prefix is a contiguous range.

use super::{hash_node, slot_bit, HashedMap, MapProof, Slot, EMPTY_LEAF};
use crate::error::{CovenantError, Result};
use crate::serialization::PrimitiveValue;
use crate::types::Hash;
use std::borrow::Cow;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    key: PrimitiveValue,
    value: PrimitiveValue,
    leaf: Hash,
}

#[derive(Debug, Clone)]
pub struct HashedMapStore {
    map: HashedMap,
    entries: BTreeMap<Slot, Entry>,
    /// `empty[h]` is the root of an empty subtree of height `h`
    empty: Vec<Hash>,
}

impl HashedMapStore {
    pub fn new(map: HashedMap) -> Self {
        let mut empty = Vec::with_capacity(map.depth() + 1);
        empty.push(EMPTY_LEAF);
        for h in 0..map.depth() {
            empty.push(hash_node(&empty[h], &empty[h]));
        }
        Self {
            map,
            entries: BTreeMap::new(),
            empty,
        }
    }

    pub fn params(&self) -> &HashedMap {
        &self.map
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &PrimitiveValue) -> Option<&PrimitiveValue> {
        self.entries
            .get(&self.map.slot(key))
            .filter(|e| e.key == *key)
            .map(|e| &e.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PrimitiveValue, &PrimitiveValue)> {
        self.entries.values().map(|e| (&e.key, &e.value))
    }

    fn occupied_by_other(&self, slot: &Slot, key: &PrimitiveValue) -> Result<()> {
        match self.entries.get(slot) {
            Some(entry) if entry.key != *key => Err(CovenantError::MapSlotCollision(Cow::Owned(
                format!("{key} and {} share a slot", entry.key),
            ))),
            _ => Ok(()),
        }
    }

    /// Insert or replace; returns the new root
    pub fn insert(&mut self, key: PrimitiveValue, value: PrimitiveValue) -> Result<Hash> {
        let slot = self.map.slot(&key);
        self.occupied_by_other(&slot, &key)?;
        let leaf = self.map.leaf_hash(&key, &value);
        self.entries.insert(slot, Entry { key, value, leaf });
        Ok(self.root())
    }

    pub fn remove(&mut self, key: &PrimitiveValue) -> Option<PrimitiveValue> {
        let slot = self.map.slot(key);
        match self.entries.get(&slot) {
            Some(entry) if entry.key == *key => self.entries.remove(&slot).map(|e| e.value),
            _ => None,
        }
    }

    pub fn root(&self) -> Hash {
        let leaves: Vec<(&Slot, &Hash)> = self.entries.iter().map(|(s, e)| (s, &e.leaf)).collect();
        self.subtree(&leaves, 0)
    }

    /// Proof for `key`, present or absent
    pub fn prove(&self, key: &PrimitiveValue) -> Result<MapProof> {
        let slot = self.map.slot(key);
        self.occupied_by_other(&slot, key)?;

        let all: Vec<(&Slot, &Hash)> = self.entries.iter().map(|(s, e)| (s, &e.leaf)).collect();
        let mut leaves = all.as_slice();
        let mut siblings = Vec::with_capacity(self.map.depth());
        for level in 0..self.map.depth() {
            let split = leaves.partition_point(|(s, _)| !slot_bit(s, level));
            let (left, right) = leaves.split_at(split);
            let (ours, theirs) = if slot_bit(&slot, level) {
                (right, left)
            } else {
                (left, right)
            };
            siblings.push(self.subtree(theirs, level + 1));
            leaves = ours;
        }
        siblings.reverse();

        Ok(MapProof {
            value: self.get(key).cloned(),
            siblings,
        })
    }

    /// Root of the subtree whose leaves share the first `level` slot bits
    fn subtree(&self, leaves: &[(&Slot, &Hash)], level: usize) -> Hash {
        let height = self.map.depth() - level;
        match leaves {
            [] => self.empty[height],
            [(_, leaf)] if height == 0 => **leaf,
            _ => {
                let split = leaves.partition_point(|(s, _)| !slot_bit(s, level));
                let (left, right) = leaves.split_at(split);
                hash_node(&self.subtree(left, level + 1), &self.subtree(right, level + 1))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> HashedMapStore {
        HashedMapStore::new(HashedMap::new(16).unwrap())
    }

    #[test]
    fn test_empty_store_root() {
        let store = store();
        assert_eq!(store.root(), store.params().empty_root());
        assert!(store.is_empty());
    }

    #[test]
    fn test_proofs_verify_for_present_and_absent_keys() {
        let mut store = store();
        for i in 0..20i64 {
            store
                .insert(PrimitiveValue::from(i), PrimitiveValue::from(i * 10))
                .unwrap();
        }
        let root = store.root();
        let map = *store.params();

        let key = PrimitiveValue::from(7i64);
        let proof = store.prove(&key).unwrap();
        assert_eq!(map.get(&root, &key, &proof).unwrap(), PrimitiveValue::from(70i64));

        let missing = PrimitiveValue::from(1000i64);
        let proof = store.prove(&missing).unwrap();
        map.verify_absent(&root, &missing, &proof).unwrap();
    }

    #[test]
    fn test_set_matches_store_update() {
        let mut store = store();
        store
            .insert(PrimitiveValue::from(1i64), PrimitiveValue::from(true))
            .unwrap();
        let root = store.root();
        let map = *store.params();

        let key = PrimitiveValue::from(2i64);
        let proof = store.prove(&key).unwrap();
        let new_root = map
            .set(&root, &key, &proof, Some(&PrimitiveValue::from(false)))
            .unwrap();
        assert_eq!(
            store.insert(key.clone(), PrimitiveValue::from(false)).unwrap(),
            new_root
        );

        let proof = store.prove(&key).unwrap();
        let deleted_root = map.set(&new_root, &key, &proof, None).unwrap();
        store.remove(&key);
        assert_eq!(store.root(), deleted_root);
        assert_eq!(deleted_root, root);
    }

    #[test]
    fn test_slot_collision() {
        let mut store = HashedMapStore::new(HashedMap::new(1).unwrap());
        let mut by_bit: [Option<i64>; 2] = [None, None];
        let mut collision = None;
        for i in 0..16i64 {
            let slot = store.params().slot(&PrimitiveValue::from(i));
            let bit = slot_bit(&slot, 0) as usize;
            match by_bit[bit] {
                Some(first) => {
                    collision = Some((first, i));
                    break;
                }
                None => by_bit[bit] = Some(i),
            }
        }
        let (a, b) = collision.unwrap();
        store
            .insert(PrimitiveValue::from(a), PrimitiveValue::from(1i64))
            .unwrap();
        assert!(matches!(
            store.insert(PrimitiveValue::from(b), PrimitiveValue::from(2i64)),
            Err(CovenantError::MapSlotCollision(_))
        ));
        assert!(matches!(
            store.prove(&PrimitiveValue::from(b)),
            Err(CovenantError::MapSlotCollision(_))
        ));
    }
}
