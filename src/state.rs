//! Structured covenant state
//!
//! A [`StructuredState`] is an ordered list of named values. The names are
//! only used to look values up against a schema; the digest commits to
//! position and value alone.

use crate::schema::{Schema, StructDef};
use crate::serialization::PrimitiveValue;
use crate::types::Hash;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

/// Value of one state field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateValue {
    Primitive(PrimitiveValue),
    Struct(StructuredState),
    Array(Vec<StateValue>),
}

impl StateValue {
    /// Committed root of a lazily-verified map
    pub fn map_root(root: Hash) -> Self {
        StateValue::Primitive(PrimitiveValue::Bytes(root.to_vec()))
    }

    pub fn as_primitive(&self) -> Option<&PrimitiveValue> {
        match self {
            StateValue::Primitive(v) => Some(v),
            _ => None,
        }
    }
}

macro_rules! primitive_state_value {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for StateValue {
                fn from(value: $t) -> Self {
                    StateValue::Primitive(PrimitiveValue::from(value))
                }
            }
        )*
    };
}

primitive_state_value!(i64, bool, Vec<u8>, &[u8], BigInt);

impl<const N: usize> From<[u8; N]> for StateValue {
    fn from(value: [u8; N]) -> Self {
        StateValue::Primitive(PrimitiveValue::from(value))
    }
}

impl From<PrimitiveValue> for StateValue {
    fn from(value: PrimitiveValue) -> Self {
        StateValue::Primitive(value)
    }
}

impl From<StructuredState> for StateValue {
    fn from(value: StructuredState) -> Self {
        StateValue::Struct(value)
    }
}

/// Ordered mapping from field name to value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredState {
    fields: Vec<(String, StateValue)>,
}

impl StructuredState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: append a field (or replace an existing one in place)
    pub fn with(mut self, name: impl Into<String>, value: impl Into<StateValue>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
        self
    }

    /// Builder: append a fixed-size array field
    pub fn with_array<I, V>(self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<StateValue>,
    {
        let array = StateValue::Array(values.into_iter().map(Into::into).collect());
        self.with(name, array)
    }

    pub fn get(&self, name: &str) -> Option<&StateValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &StateValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Rust types that describe their own state layout
///
/// This replaces field annotations: the schema is derived from the type
/// definition, not discovered at runtime.
pub trait CovenantState {
    /// Name of the root struct in [`CovenantState::schema`]
    const STATE_TYPE: &'static str;

    /// Struct definitions needed to lay out the state, root included
    fn struct_defs() -> Vec<StructDef>;

    fn to_state(&self) -> StructuredState;

    fn schema() -> Schema {
        Self::struct_defs()
            .into_iter()
            .fold(Schema::new(), Schema::with_struct)
            .with_state_type(Self::STATE_TYPE)
    }
}
