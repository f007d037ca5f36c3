//! State schema descriptors
//!
//! A schema is an explicit, ordered list of `(name, type)` pairs per struct.
//! It is either built in code or loaded from a contract artifact:
//!
//! ```json
//! {
//!   "stateType": "CounterState",
//!   "structs": [{ "name": "CounterState", "params": [{ "name": "count", "type": "int" }] }],
//!   "library": [{ "name": "CounterStateLib", "stateType": "CounterState" }]
//! }
//! ```
//!
//! Schemas are plain values passed into the digest functions. There is no
//! registry.

use crate::error::{CovenantError, Result};
use crate::serialization::ValueKind;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Field type in a state schema
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Int,
    Bool,
    Bytes,
    /// Nested struct, by name
    Struct(String),
    /// Fixed-size array
    Array(Box<FieldType>, usize),
    /// Lazily-verified map; only its 32-byte root is part of the state
    HashedMap { key: ValueKind, value: ValueKind },
}

/// Byte-string aliases accepted in artifact type strings
const BYTES_ALIASES: &[&str] = &[
    "bytes",
    "ByteString",
    "PubKey",
    "Sig",
    "Ripemd160",
    "PubKeyHash",
    "Addr",
    "Sha1",
    "Sha256",
    "SigHashType",
    "SigHashPreimage",
    "OpCodeType",
];

impl FieldType {
    /// Parse an artifact type string: `int`, `bool`, byte-string aliases,
    /// struct names, arrays (`int[2][3]` is two arrays of three) and
    /// `HashedMap<K, V>`
    pub fn parse(type_str: &str) -> Result<Self> {
        let type_str = type_str.trim();

        if let Some(inner) = type_str
            .strip_prefix("HashedMap<")
            .and_then(|rest| rest.strip_suffix('>'))
        {
            let (key, value) = split_generic_pair(inner).ok_or_else(|| {
                CovenantError::MalformedEncoding(Cow::Owned(format!(
                    "invalid HashedMap type: {type_str}"
                )))
            })?;
            return Ok(FieldType::HashedMap {
                key: primitive_kind(key)?,
                value: primitive_kind(value)?,
            });
        }

        if let Some(open) = type_str.find('[') {
            let base = FieldType::parse(&type_str[..open])?;
            let dims = parse_dims(&type_str[open..])?;
            // The first dimension is the outermost array
            return Ok(dims
                .into_iter()
                .rev()
                .fold(base, |inner, len| FieldType::Array(Box::new(inner), len)));
        }

        match type_str {
            "int" | "bigint" => Ok(FieldType::Int),
            "bool" | "boolean" => Ok(FieldType::Bool),
            s if BYTES_ALIASES.contains(&s) => Ok(FieldType::Bytes),
            s if is_identifier(s) => Ok(FieldType::Struct(s.to_string())),
            s => Err(CovenantError::MalformedEncoding(Cow::Owned(format!(
                "invalid field type: {s:?}"
            )))),
        }
    }

    /// Kind of a primitive field, `None` for composite types
    pub fn primitive_kind(&self) -> Option<ValueKind> {
        match self {
            FieldType::Int => Some(ValueKind::Int),
            FieldType::Bool => Some(ValueKind::Bool),
            FieldType::Bytes | FieldType::HashedMap { .. } => Some(ValueKind::Bytes),
            FieldType::Struct(_) | FieldType::Array(..) => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Int => f.write_str("int"),
            FieldType::Bool => f.write_str("bool"),
            FieldType::Bytes => f.write_str("bytes"),
            FieldType::Struct(name) => f.write_str(name),
            FieldType::Array(inner, len) => {
                // Re-nest so that the outermost length prints first
                let mut dims = vec![*len];
                let mut base = inner.as_ref();
                while let FieldType::Array(next, n) = base {
                    dims.push(*n);
                    base = next.as_ref();
                }
                write!(f, "{base}")?;
                for d in dims {
                    write!(f, "[{d}]")?;
                }
                Ok(())
            }
            FieldType::HashedMap { key, value } => {
                write!(f, "HashedMap<{}, {}>", kind_name(*key), kind_name(*value))
            }
        }
    }
}

fn kind_name(kind: ValueKind) -> &'static str {
    match kind {
        ValueKind::Int => "int",
        ValueKind::Bool => "bool",
        ValueKind::Bytes => "bytes",
    }
}

fn primitive_kind(type_str: &str) -> Result<ValueKind> {
    FieldType::parse(type_str)?
        .primitive_kind()
        .filter(|_| !type_str.trim().starts_with("HashedMap"))
        .ok_or_else(|| {
            CovenantError::MalformedEncoding(Cow::Owned(format!(
                "HashedMap keys and values must be primitive, got {type_str}"
            )))
        })
}

fn split_generic_pair(inner: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    for (i, c) in inner.char_indices() {
        match c {
            '<' | '[' => depth += 1,
            '>' | ']' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => return Some((&inner[..i], &inner[i + 1..])),
            _ => {}
        }
    }
    None
}

fn parse_dims(mut s: &str) -> Result<Vec<usize>> {
    let mut dims = Vec::new();
    while !s.is_empty() {
        let close = s
            .strip_prefix('[')
            .and_then(|rest| rest.find(']').map(|i| (rest, i)))
            .ok_or_else(|| {
                CovenantError::MalformedEncoding(Cow::Owned(format!("invalid array suffix: {s}")))
            })?;
        let (rest, i) = close;
        let len = rest[..i].trim().parse::<usize>().map_err(|_| {
            CovenantError::MalformedEncoding(Cow::Owned(format!(
                "invalid array length: {}",
                &rest[..i]
            )))
        })?;
        if len == 0 {
            return Err(CovenantError::MalformedEncoding(Cow::Borrowed(
                "zero-length arrays are not allowed in state",
            )));
        }
        dims.push(len);
        s = &rest[i + 1..];
    }
    Ok(dims)
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// One named field of a struct
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub ty: FieldType,
}

/// Struct definition: ordered fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

impl StructDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            ty,
        });
        self
    }
}

/// A set of struct definitions, typically one contract artifact
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    structs: BTreeMap<String, StructDef>,
    state_types: Vec<String>,
}

#[derive(Deserialize)]
struct ArtifactJson {
    #[serde(default, rename = "stateType")]
    state_type: Option<String>,
    #[serde(default)]
    structs: Vec<ArtifactStruct>,
    #[serde(default)]
    library: Vec<ArtifactLibrary>,
}

#[derive(Deserialize)]
struct ArtifactStruct {
    name: String,
    #[serde(default)]
    params: Vec<ArtifactParam>,
}

#[derive(Deserialize)]
struct ArtifactParam {
    name: String,
    #[serde(rename = "type")]
    ty: String,
}

#[derive(Deserialize)]
struct ArtifactLibrary {
    #[serde(default, rename = "stateType")]
    state_type: Option<String>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_struct(mut self, def: StructDef) -> Self {
        self.structs.insert(def.name.clone(), def);
        self
    }

    /// Declare a struct as a state type (checked by [`Schema::validate`])
    pub fn with_state_type(mut self, name: impl Into<String>) -> Self {
        self.state_types.push(name.into());
        self
    }

    /// Load an artifact and fail fast on any unresolved struct reference
    pub fn from_artifact_json(json: &str) -> Result<Self> {
        let artifact: ArtifactJson = serde_json::from_str(json).map_err(|e| {
            CovenantError::MalformedEncoding(Cow::Owned(format!("artifact json: {e}")))
        })?;

        let mut schema = Schema::new();
        for s in artifact.structs {
            let mut def = StructDef::new(s.name);
            for p in s.params {
                def = def.field(p.name, FieldType::parse(&p.ty)?);
            }
            schema = schema.with_struct(def);
        }

        for state_type in artifact
            .state_type
            .into_iter()
            .chain(artifact.library.into_iter().filter_map(|l| l.state_type))
        {
            if !schema.state_types.contains(&state_type) {
                schema.state_types.push(state_type);
            }
        }

        schema.validate()?;
        Ok(schema)
    }

    /// Every declared state type and every struct reference must resolve
    pub fn validate(&self) -> Result<()> {
        for state_type in &self.state_types {
            self.get_struct(state_type)?;
        }
        for def in self.structs.values() {
            for field in &def.fields {
                self.check_resolves(&field.ty, &mut vec![def.name.as_str()])?;
            }
        }
        Ok(())
    }

    fn check_resolves<'a>(&'a self, ty: &'a FieldType, stack: &mut Vec<&'a str>) -> Result<()> {
        match ty {
            FieldType::Struct(name) => {
                if stack.contains(&name.as_str()) {
                    return Err(CovenantError::MalformedEncoding(Cow::Owned(format!(
                        "recursive struct {name}"
                    ))));
                }
                let def = self.get_struct(name)?;
                stack.push(name.as_str());
                for field in &def.fields {
                    self.check_resolves(&field.ty, stack)?;
                }
                stack.pop();
                Ok(())
            }
            FieldType::Array(inner, _) => self.check_resolves(inner, stack),
            _ => Ok(()),
        }
    }

    pub fn get_struct(&self, name: &str) -> Result<&StructDef> {
        self.structs
            .get(name)
            .ok_or_else(|| CovenantError::SchemaNotFound(Cow::Owned(name.to_string())))
    }

    /// First declared state type
    pub fn state_type(&self) -> Result<&StructDef> {
        let name = self.state_types.first().ok_or(CovenantError::SchemaNotFound(
            Cow::Borrowed("artifact declares no stateType"),
        ))?;
        self.get_struct(name)
    }

    pub fn state_types(&self) -> &[String] {
        &self.state_types
    }

    /// Number of leaves a value of `ty` flattens to
    pub fn leaf_count(&self, ty: &FieldType) -> Result<usize> {
        match ty {
            FieldType::Int | FieldType::Bool | FieldType::Bytes | FieldType::HashedMap { .. } => {
                Ok(1)
            }
            FieldType::Array(inner, len) => Ok(self.leaf_count(inner)?.saturating_mul(*len)),
            FieldType::Struct(name) => self.struct_leaf_count(name),
        }
    }

    pub fn struct_leaf_count(&self, name: &str) -> Result<usize> {
        let def = self.get_struct(name)?;
        def.fields.iter().try_fold(0usize, |acc, field| {
            Ok(acc.saturating_add(self.leaf_count(&field.ty)?))
        })
    }

    /// Static capacity check, run before any state value exists
    pub fn check_capacity(&self, name: &str, capacity: usize) -> Result<usize> {
        let count = self.struct_leaf_count(name)?;
        if count > capacity {
            return Err(CovenantError::TooManyFields { count, capacity });
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_primitives_and_aliases() {
        assert_eq!(FieldType::parse("int").unwrap(), FieldType::Int);
        assert_eq!(FieldType::parse("bool").unwrap(), FieldType::Bool);
        assert_eq!(FieldType::parse("PubKey").unwrap(), FieldType::Bytes);
        assert_eq!(FieldType::parse("Ripemd160").unwrap(), FieldType::Bytes);
        assert_eq!(
            FieldType::parse("Balance").unwrap(),
            FieldType::Struct("Balance".into())
        );
    }

    #[test]
    fn test_parse_nested_arrays() {
        let ty = FieldType::parse("int[2][3]").unwrap();
        assert_eq!(
            ty,
            FieldType::Array(Box::new(FieldType::Array(Box::new(FieldType::Int), 3)), 2)
        );
        assert_eq!(ty.to_string(), "int[2][3]");
        assert!(FieldType::parse("int[0]").is_err());
        assert!(FieldType::parse("int[x]").is_err());
        assert!(FieldType::parse("int[2").is_err());
    }

    #[test]
    fn test_parse_hashed_map() {
        assert_eq!(
            FieldType::parse("HashedMap<PubKey, int>").unwrap(),
            FieldType::HashedMap {
                key: ValueKind::Bytes,
                value: ValueKind::Int
            }
        );
        assert!(FieldType::parse("HashedMap<int>").is_err());
        assert!(FieldType::parse("HashedMap<int, Balance>").is_err());
    }

    #[test]
    fn test_leaf_count() {
        let schema = Schema::new()
            .with_struct(
                StructDef::new("Inner")
                    .field("a", FieldType::Int)
                    .field("b", FieldType::Bytes),
            )
            .with_struct(
                StructDef::new("Outer")
                    .field("x", FieldType::Bool)
                    .field("inner", FieldType::parse("Inner[3]").unwrap())
                    .field(
                        "map",
                        FieldType::HashedMap {
                            key: ValueKind::Bytes,
                            value: ValueKind::Int,
                        },
                    ),
            );
        assert_eq!(schema.struct_leaf_count("Outer").unwrap(), 1 + 6 + 1);
        assert_eq!(schema.check_capacity("Outer", 8).unwrap(), 8);
        assert_eq!(
            schema.check_capacity("Outer", 7),
            Err(CovenantError::TooManyFields {
                count: 8,
                capacity: 7
            })
        );
    }

    #[test]
    fn test_artifact_missing_struct_fails_fast() {
        let json = r#"{
            "structs": [{ "name": "A", "params": [{ "name": "b", "type": "B" }] }]
        }"#;
        let err = Schema::from_artifact_json(json).unwrap_err();
        assert_eq!(err, CovenantError::SchemaNotFound(Cow::Borrowed("B")));

        let json = r#"{ "structs": [], "library": [{ "stateType": "Missing" }] }"#;
        assert!(matches!(
            Schema::from_artifact_json(json),
            Err(CovenantError::SchemaNotFound(_))
        ));
    }

    #[test]
    fn test_recursive_struct_rejected() {
        let schema = Schema::new().with_struct(
            StructDef::new("Loop").field("next", FieldType::Struct("Loop".into())),
        );
        assert!(schema.validate().is_err());
    }
}
