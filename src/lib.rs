//! # blvm-covenant
//!
//! Verification core for stateful covenants on a UTXO chain.
//!
//! A stateful covenant is a contract whose state travels from transaction to
//! transaction in a committed output. Spending it proves three things in one
//! flat pass: the transaction context is authentic, the spent output carries
//! the claimed prior state, and the transaction creates outputs carrying the
//! correct next state.
//!
//! ## Architecture
//!
//! - `serialization`: canonical byte encodings (integers, push-data, tx wire format)
//! - `state_digest`: schema-driven flattening and the fixed-length state commitment
//! - `context`: sighash preimage parsing with per-mode typed access
//! - `output`: output bytes and the `hash_outputs` check
//! - `covenant`: instance lifecycle and state transitions
//! - `backtrace`: lineage proofs back to a genesis
//! - `hashed_map`: Merkle-committed maps verified one entry at a time
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: verification is deterministic and side-effect-free
//! 2. **Fail Closed**: every check returns a typed error, nothing is retried
//! 3. **Exact Version Pinning**: hash crates are pinned to exact versions
//! 4. **No Global State**: schemas and configuration are values passed in
//!
//! ## Usage
//!
//! ```rust
//! use blvm_covenant::schema::{FieldType, Schema, StructDef};
//! use blvm_covenant::state::StructuredState;
//! use blvm_covenant::CovenantVerifier;
//!
//! let verifier = CovenantVerifier::default();
//! let schema = Schema::new()
//!     .with_struct(StructDef::new("Counter").field("count", FieldType::Int))
//!     .with_state_type("Counter");
//! let schema = verifier.bind_schema(schema, "Counter").unwrap();
//! let digest = verifier
//!     .state_digest(&schema, &StructuredState::new().with("count", 1i64))
//!     .unwrap();
//! assert_eq!(digest.as_bytes().len(), 20);
//! ```

pub mod backtrace;
pub mod config;
pub mod constants;
pub mod context;
pub mod covenant;
pub mod crypto;
pub mod error;
pub mod hashed_map;
pub mod output;
pub mod schema;
pub mod serialization;
pub mod state;
pub mod state_digest;
pub mod transaction_hash;
pub mod types;

pub use config::CovenantConfig;
pub use error::{CovenantError, Result};

use backtrace::{BacktraceOrigin, BacktraceProof};
use context::{
    CommitsInputSet, CommitsOutputs, Context, InputSelector, InputWitness, OutputSelector,
    VerifiedInputs,
};
use covenant::StateTransition;
use hashed_map::{HashedMap, MapProof};
use schema::Schema;
use serialization::PrimitiveValue;
use state::StructuredState;
use state_digest::{StateDigest, StateDigestEngine, StateSchema};
use tracing::warn;
use types::{Hash, Outpoint};

/// Covenant Verifier - configured entry point to the verification functions
///
/// Holds a validated [`CovenantConfig`]; every method delegates to the
/// corresponding module function. Rejections are logged at `warn` when
/// `debug.log_rejections` is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct CovenantVerifier {
    config: CovenantConfig,
}

impl CovenantVerifier {
    pub fn new(config: CovenantConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Verifier configured from `BLVM_COVENANT_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(CovenantConfig::from_env())
    }

    pub fn config(&self) -> &CovenantConfig {
        &self.config
    }

    pub fn digest_engine(&self) -> StateDigestEngine {
        StateDigestEngine::from_config(&self.config.state_digest)
    }

    pub fn hashed_map(&self) -> HashedMap {
        HashedMap::from_config(&self.config.hashed_map)
    }

    fn observe<T>(&self, operation: &'static str, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            if self.config.debug.log_rejections {
                warn!(operation, kind = ?err.kind(), %err, "covenant verification rejected");
            }
        }
        result
    }

    /// Resolve a state type and check it against the configured capacity
    pub fn bind_schema(&self, schema: Schema, state_type: &str) -> Result<StateSchema> {
        self.observe("bind_schema", self.digest_engine().bind_schema(schema, state_type))
    }

    pub fn state_digest(&self, schema: &StateSchema, state: &StructuredState) -> Result<StateDigest> {
        self.observe("state_digest", self.digest_engine().digest(schema, state))
    }

    pub fn parse_context<O: OutputSelector, I: InputSelector>(
        &self,
        preimage: &[u8],
        input_index: u32,
    ) -> Result<Context<O, I>> {
        self.observe("parse_context", Context::parse(preimage, input_index))
    }

    pub fn verify_inputs<O: OutputSelector, I: CommitsInputSet>(
        &self,
        ctx: &Context<O, I>,
        witness: &InputWitness,
    ) -> Result<VerifiedInputs> {
        self.observe("verify_inputs", context::verify_inputs(ctx, witness))
    }

    pub fn check_outputs<O: CommitsOutputs, I: InputSelector>(
        &self,
        ctx: &Context<O, I>,
        candidate: &[u8],
    ) -> Result<()> {
        self.observe("check_outputs", output::check_outputs(ctx, candidate))
    }

    pub fn verify_transition<O: CommitsOutputs, I: InputSelector>(
        &self,
        transition: &StateTransition,
        ctx: &Context<O, I>,
    ) -> Result<()> {
        self.observe("verify_transition", transition.verify(ctx))
    }

    pub fn verify_backtrace_from_outpoint(
        &self,
        proof: &BacktraceProof,
        genesis_outpoint: &Outpoint,
        inputs: &VerifiedInputs,
    ) -> Result<BacktraceOrigin> {
        self.observe(
            "verify_backtrace_from_outpoint",
            backtrace::verify_from_outpoint(proof, genesis_outpoint, inputs),
        )
    }

    pub fn verify_backtrace_from_script(
        &self,
        proof: &BacktraceProof,
        genesis_script_hash: &Hash,
        minter_script_hash: Option<&Hash>,
        inputs: &VerifiedInputs,
    ) -> Result<BacktraceOrigin> {
        self.observe(
            "verify_backtrace_from_script",
            backtrace::verify_from_script(proof, genesis_script_hash, minter_script_hash, inputs),
        )
    }

    pub fn map_get(&self, root: &Hash, key: &PrimitiveValue, proof: &MapProof) -> Result<PrimitiveValue> {
        self.observe("map_get", self.hashed_map().get(root, key, proof))
    }

    pub fn map_set(
        &self,
        root: &Hash,
        key: &PrimitiveValue,
        old_proof: &MapProof,
        new_value: Option<&PrimitiveValue>,
    ) -> Result<Hash> {
        self.observe("map_set", self.hashed_map().set(root, key, old_proof, new_value))
    }

    pub fn map_verify_absent(&self, root: &Hash, key: &PrimitiveValue, proof: &MapProof) -> Result<()> {
        self.observe(
            "map_verify_absent",
            self.hashed_map().verify_absent(root, key, proof),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verifier_rejects_invalid_config() {
        let mut config = CovenantConfig::default();
        config.hashed_map.depth = 0;
        assert!(matches!(
            CovenantVerifier::new(config),
            Err(CovenantError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_verifier_uses_configured_algorithm() {
        let mut config = CovenantConfig::default();
        config.state_digest.algorithm = crypto::DigestAlgorithm::Sha256;
        let verifier = CovenantVerifier::new(config).unwrap();
        assert_eq!(verifier.digest_engine().algorithm(), crypto::DigestAlgorithm::Sha256);
    }
}
