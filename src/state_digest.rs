//! State Digest Engine
//!
//! `digest = H(H(leaf_0) || H(leaf_1) || ... || H(leaf_n-1))`
//!
//! Leaves are the primitive values of the state in schema order, nested
//! structs and arrays flattened depth-first (array elements 0..n-1). Each leaf
//! is hashed over its canonical serialization. A lazily-verified map
//! contributes its root as exactly one leaf.
//!
//! The verifier in script keeps one leaf hash per stack slot, so the leaf
//! count is capped. The cap is checked against the schema alone when a
//! [`StateSchema`] is built, and again on every digest.

use crate::config::StateDigestConfig;
use crate::constants::{HASH_SIZE, SHORT_HASH_SIZE};
use crate::crypto::{sha256, DigestAlgorithm};
use crate::error::{CovenantError, Result};
use crate::schema::{FieldType, Schema, StructDef};
use crate::serialization::{serialize_value, PrimitiveValue};
use crate::state::{StateValue, StructuredState};
use crate::types::Hash;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use tracing::debug;

/// Fixed-length commitment to a structured state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StateDigest {
    Hash160([u8; SHORT_HASH_SIZE]),
    Sha256([u8; HASH_SIZE]),
}

impl StateDigest {
    pub fn from_slice(algorithm: DigestAlgorithm, bytes: &[u8]) -> Result<Self> {
        let wrong_len = || {
            CovenantError::MalformedEncoding(Cow::Owned(format!(
                "state digest must be {} bytes, got {}",
                algorithm.output_len(),
                bytes.len()
            )))
        };
        match algorithm {
            DigestAlgorithm::Hash160 => bytes
                .try_into()
                .map(StateDigest::Hash160)
                .map_err(|_| wrong_len()),
            DigestAlgorithm::Sha256 => bytes
                .try_into()
                .map(StateDigest::Sha256)
                .map_err(|_| wrong_len()),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            StateDigest::Hash160(b) => b,
            StateDigest::Sha256(b) => b,
        }
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        match self {
            StateDigest::Hash160(_) => DigestAlgorithm::Hash160,
            StateDigest::Sha256(_) => DigestAlgorithm::Sha256,
        }
    }

    /// Hash committed in an output's data-hash slot
    pub fn data_hash(&self) -> Hash {
        sha256(self.as_bytes())
    }
}

impl fmt::Display for StateDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.as_bytes()))
    }
}

/// A schema bound to its root state type, capacity-checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSchema {
    schema: Schema,
    root: StructDef,
    leaf_count: usize,
}

impl StateSchema {
    /// Validate the schema, resolve `state_type` and check its flattened
    /// size against `capacity`
    pub fn new(schema: Schema, state_type: &str, capacity: usize) -> Result<Self> {
        schema.validate()?;
        let leaf_count = schema.check_capacity(state_type, capacity)?;
        let root = schema.get_struct(state_type)?.clone();
        Ok(Self {
            schema,
            root,
            leaf_count,
        })
    }

    /// Use the schema's first declared state type
    pub fn from_declared(schema: Schema, capacity: usize) -> Result<Self> {
        let name = schema.state_type()?.name.clone();
        Self::new(schema, &name, capacity)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn state_type(&self) -> &str {
        &self.root.name
    }

    pub fn root(&self) -> &StructDef {
        &self.root
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }
}

/// Digest engine bound to an algorithm and a capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateDigestEngine {
    algorithm: DigestAlgorithm,
    max_leaves: usize,
}

impl Default for StateDigestEngine {
    fn default() -> Self {
        Self::from_config(&StateDigestConfig::default())
    }
}

impl StateDigestEngine {
    pub fn new(algorithm: DigestAlgorithm, max_leaves: usize) -> Self {
        Self {
            algorithm,
            max_leaves,
        }
    }

    pub fn from_config(config: &StateDigestConfig) -> Self {
        Self::new(config.algorithm, config.max_leaves)
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    pub fn max_leaves(&self) -> usize {
        self.max_leaves
    }

    /// Bind a schema to this engine's capacity
    pub fn bind_schema(&self, schema: Schema, state_type: &str) -> Result<StateSchema> {
        StateSchema::new(schema, state_type, self.max_leaves)
    }

    /// Per-leaf hashes in flattening order
    pub fn leaf_hashes(&self, schema: &StateSchema, state: &StructuredState) -> Result<Vec<Vec<u8>>> {
        let leaves = flatten(schema, state)?;
        if leaves.len() > self.max_leaves {
            return Err(CovenantError::TooManyFields {
                count: leaves.len(),
                capacity: self.max_leaves,
            });
        }
        Ok(leaves
            .iter()
            .map(|leaf| self.algorithm.hash(&serialize_value(leaf)))
            .collect())
    }

    pub fn digest(&self, schema: &StateSchema, state: &StructuredState) -> Result<StateDigest> {
        let leaf_hashes = self.leaf_hashes(schema, state)?;
        let digest = self.fold(&leaf_hashes)?;
        debug!(
            state_type = schema.state_type(),
            leaves = leaf_hashes.len(),
            %digest,
            "computed state digest"
        );
        Ok(digest)
    }

    /// Fold precomputed leaf hashes into the digest
    pub fn fold(&self, leaf_hashes: &[Vec<u8>]) -> Result<StateDigest> {
        let width = self.algorithm.output_len();
        let mut concat = Vec::with_capacity(leaf_hashes.len() * width);
        for leaf_hash in leaf_hashes {
            if leaf_hash.len() != width {
                return Err(CovenantError::MalformedEncoding(Cow::Owned(format!(
                    "leaf hash must be {width} bytes, got {}",
                    leaf_hash.len()
                ))));
            }
            concat.extend_from_slice(leaf_hash);
        }
        StateDigest::from_slice(self.algorithm, &self.algorithm.hash(&concat))
    }
}

/// Digest with the default engine (hash160, default capacity)
pub fn digest(schema: &StateSchema, state: &StructuredState) -> Result<StateDigest> {
    StateDigestEngine::default().digest(schema, state)
}

/// Flatten a state into its ordered leaves, validating it against the schema
pub fn flatten<'s>(schema: &StateSchema, state: &'s StructuredState) -> Result<Vec<&'s PrimitiveValue>> {
    let mut leaves = Vec::with_capacity(schema.leaf_count());
    flatten_struct(schema.schema(), schema.root(), state, &mut leaves, schema.state_type())?;
    Ok(leaves)
}

fn flatten_struct<'s>(
    schema: &Schema,
    def: &StructDef,
    state: &'s StructuredState,
    out: &mut Vec<&'s PrimitiveValue>,
    path: &str,
) -> Result<()> {
    if state.len() != def.fields.len() {
        let unknown: Vec<&str> = state
            .fields()
            .map(|(name, _)| name)
            .filter(|name| !def.fields.iter().any(|f| f.name == *name))
            .collect();
        if !unknown.is_empty() {
            return Err(shape(format!("{path}: unknown fields {unknown:?}")));
        }
        // Only known names but the wrong count: some name is repeated
        return Err(shape(format!(
            "{path}: {} fields for {} declared, duplicate names",
            state.len(),
            def.fields.len()
        )));
    }

    for field in &def.fields {
        let field_path = format!("{path}.{}", field.name);
        let value = state
            .get(&field.name)
            .ok_or_else(|| shape(format!("{field_path}: missing")))?;
        flatten_value(schema, &field.ty, value, out, &field_path)?;
    }
    Ok(())
}

fn flatten_value<'s>(
    schema: &Schema,
    ty: &FieldType,
    value: &'s StateValue,
    out: &mut Vec<&'s PrimitiveValue>,
    path: &str,
) -> Result<()> {
    match (ty, value) {
        (FieldType::Struct(name), StateValue::Struct(inner)) => {
            let def = schema.get_struct(name)?;
            flatten_struct(schema, def, inner, out, path)
        }
        (FieldType::Array(elem_ty, len), StateValue::Array(items)) => {
            if items.len() != *len {
                return Err(shape(format!(
                    "{path}: expected {len} elements, got {}",
                    items.len()
                )));
            }
            for (i, item) in items.iter().enumerate() {
                flatten_value(schema, elem_ty, item, out, &format!("{path}[{i}]"))?;
            }
            Ok(())
        }
        (FieldType::HashedMap { .. }, StateValue::Primitive(leaf @ PrimitiveValue::Bytes(root))) => {
            if root.len() != HASH_SIZE {
                return Err(shape(format!(
                    "{path}: map root must be {HASH_SIZE} bytes, got {}",
                    root.len()
                )));
            }
            out.push(leaf);
            Ok(())
        }
        (_, StateValue::Primitive(leaf)) if ty.primitive_kind() == Some(leaf.kind()) => {
            out.push(leaf);
            Ok(())
        }
        _ => Err(shape(format!("{path}: value does not match type {ty}"))),
    }
}

fn shape(reason: String) -> CovenantError {
    CovenantError::StateShapeMismatch(Cow::Owned(reason))
}
