//! Error types for covenant verification
//!
//! Every variant is fatal to the single verification pass it occurs in.
//! Off-chain transaction builders may catch them and rebuild, the core never retries.

use std::borrow::Cow;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum CovenantError {
    #[error("Malformed encoding: {0}")]
    MalformedEncoding(Cow<'static, str>),

    #[error("Too many state fields: {count} leaves exceed capacity {capacity}")]
    TooManyFields { count: usize, capacity: usize },

    #[error("Context mismatch: {0}")]
    ContextMismatch(Cow<'static, str>),

    #[error("Sighash mode violation: {0}")]
    SighashModeViolation(Cow<'static, str>),

    #[error("Backtrace failed: {0}")]
    BacktraceFailed(Cow<'static, str>),

    #[error("Map proof mismatch: {0}")]
    ProofMismatch(Cow<'static, str>),

    #[error("Schema not found: {0}")]
    SchemaNotFound(Cow<'static, str>),

    #[error("State does not match schema: {0}")]
    StateShapeMismatch(Cow<'static, str>),

    #[error("Covenant lifecycle violation: {0}")]
    LifecycleViolation(Cow<'static, str>),

    #[error("Map slot collision: {0}")]
    MapSlotCollision(Cow<'static, str>),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(Cow<'static, str>),
}

/// Discriminant of a [`CovenantError`], for callers that branch on the kind only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedEncoding,
    TooManyFields,
    ContextMismatch,
    SighashModeViolation,
    BacktraceFailed,
    ProofMismatch,
    SchemaNotFound,
    StateShapeMismatch,
    LifecycleViolation,
    MapSlotCollision,
    InvalidConfig,
}

impl CovenantError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CovenantError::MalformedEncoding(_) => ErrorKind::MalformedEncoding,
            CovenantError::TooManyFields { .. } => ErrorKind::TooManyFields,
            CovenantError::ContextMismatch(_) => ErrorKind::ContextMismatch,
            CovenantError::SighashModeViolation(_) => ErrorKind::SighashModeViolation,
            CovenantError::BacktraceFailed(_) => ErrorKind::BacktraceFailed,
            CovenantError::ProofMismatch(_) => ErrorKind::ProofMismatch,
            CovenantError::SchemaNotFound(_) => ErrorKind::SchemaNotFound,
            CovenantError::StateShapeMismatch(_) => ErrorKind::StateShapeMismatch,
            CovenantError::LifecycleViolation(_) => ErrorKind::LifecycleViolation,
            CovenantError::MapSlotCollision(_) => ErrorKind::MapSlotCollision,
            CovenantError::InvalidConfig(_) => ErrorKind::InvalidConfig,
        }
    }

    /// Human-readable reason without the kind prefix
    pub fn reason(&self) -> Cow<'_, str> {
        match self {
            CovenantError::MalformedEncoding(r)
            | CovenantError::ContextMismatch(r)
            | CovenantError::SighashModeViolation(r)
            | CovenantError::BacktraceFailed(r)
            | CovenantError::ProofMismatch(r)
            | CovenantError::SchemaNotFound(r)
            | CovenantError::StateShapeMismatch(r)
            | CovenantError::LifecycleViolation(r)
            | CovenantError::MapSlotCollision(r)
            | CovenantError::InvalidConfig(r) => Cow::Borrowed(r.as_ref()),
            CovenantError::TooManyFields { count, capacity } => {
                Cow::Owned(format!("{count} leaves exceed capacity {capacity}"))
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, CovenantError>;
