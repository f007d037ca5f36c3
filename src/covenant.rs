//! Covenant Lifecycle Manager
//!
//! A covenant instance moves through `Unbound → Bound → Spent`. An unbound
//! instance is a state waiting for its output to be mined; binding attaches
//! the outpoint; spending consumes the instance and leaves a record.
//!
//! Successors are fresh values sharing the template and schema through
//! `Arc`, so no instance ever observes another's state change.

use crate::context::{CommitsOutputs, Context, InputSelector, OutputSelector};
use crate::error::{CovenantError, Result};
use crate::output::{check_outputs, serialize_outputs};
use crate::state::StructuredState;
use crate::state_digest::{StateDigest, StateDigestEngine, StateSchema};
use crate::types::{Hash, Network, Outpoint, TxOutput};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, info};

/// Compiled contract a covenant runs under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractTemplate {
    pub name: String,
    /// Hash of the locking script every instance is locked with
    pub script_hash: Hash,
}

impl ContractTemplate {
    pub fn new(name: impl Into<String>, script_hash: Hash) -> Self {
        Self {
            name: name.into(),
            script_hash,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecyclePhase {
    Unbound,
    Bound,
    Spent,
}

/// UTXO an instance is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundUtxo {
    pub outpoint: Outpoint,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CovenantInstance {
    template: Arc<ContractTemplate>,
    schema: Arc<StateSchema>,
    engine: StateDigestEngine,
    network: Network,
    state: StructuredState,
    digest: StateDigest,
    utxo: Option<BoundUtxo>,
}

impl CovenantInstance {
    /// Create an unbound instance with the default digest engine
    ///
    /// Fails when `state` does not fit the schema or its capacity.
    pub fn new(
        template: Arc<ContractTemplate>,
        schema: Arc<StateSchema>,
        state: StructuredState,
        network: Network,
    ) -> Result<Self> {
        Self::with_engine(template, schema, state, network, StateDigestEngine::default())
    }

    pub fn with_engine(
        template: Arc<ContractTemplate>,
        schema: Arc<StateSchema>,
        state: StructuredState,
        network: Network,
        engine: StateDigestEngine,
    ) -> Result<Self> {
        let digest = engine.digest(&schema, &state)?;
        Ok(Self {
            template,
            schema,
            engine,
            network,
            state,
            digest,
            utxo: None,
        })
    }

    pub fn phase(&self) -> LifecyclePhase {
        match self.utxo {
            Some(_) => LifecyclePhase::Bound,
            None => LifecyclePhase::Unbound,
        }
    }

    pub fn template(&self) -> &ContractTemplate {
        &self.template
    }

    pub fn schema(&self) -> &StateSchema {
        &self.schema
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn state(&self) -> &StructuredState {
        &self.state
    }

    pub fn utxo(&self) -> Option<&BoundUtxo> {
        self.utxo.as_ref()
    }

    pub fn state_digest(&self) -> &StateDigest {
        &self.digest
    }

    /// Attach the mined output carrying this state
    pub fn bind_to_utxo(&mut self, outpoint: Outpoint, amount: u64) -> Result<()> {
        if let Some(bound) = &self.utxo {
            return Err(CovenantError::LifecycleViolation(Cow::Owned(format!(
                "{} already bound to {}",
                self.template.name, bound.outpoint
            ))));
        }
        info!(contract = %self.template.name, %outpoint, amount, "covenant bound");
        self.utxo = Some(BoundUtxo { outpoint, amount });
        Ok(())
    }

    fn require_bound(&self, action: &'static str) -> Result<&BoundUtxo> {
        self.utxo.as_ref().ok_or_else(|| {
            CovenantError::LifecycleViolation(Cow::Owned(format!(
                "{action} requires a bound {} instance",
                self.template.name
            )))
        })
    }

    /// Unbound successor carrying `new_state`
    pub fn next(&self, new_state: StructuredState) -> Result<Self> {
        self.require_bound("next")?;
        Self::with_engine(
            Arc::clone(&self.template),
            Arc::clone(&self.schema),
            new_state,
            self.network,
            self.engine,
        )
    }

    /// Output that locks `amount` under this instance's state
    pub fn commitment_output(&self, amount: u64) -> TxOutput {
        TxOutput::with_state_digest(amount, self.template.script_hash, self.digest.as_bytes())
    }

    /// The spent input must be this template carrying this state
    pub fn verify_continuity<O: OutputSelector, I: InputSelector>(
        &self,
        ctx: &Context<O, I>,
    ) -> Result<()> {
        if *ctx.spent_script_hash() != self.template.script_hash {
            debug!(contract = %self.template.name, "spent script hash differs from template");
            return Err(CovenantError::ContextMismatch(Cow::Borrowed(
                "spent script hash differs from template",
            )));
        }
        if *ctx.spent_data_hash() != self.digest.data_hash() {
            debug!(contract = %self.template.name, digest = %self.digest, "spent data hash differs from state");
            return Err(CovenantError::ContextMismatch(Cow::Borrowed(
                "spent data hash differs from state digest",
            )));
        }
        if let Some(bound) = &self.utxo {
            if *ctx.outpoint() != bound.outpoint {
                return Err(CovenantError::ContextMismatch(Cow::Owned(format!(
                    "context spends {}, instance bound to {}",
                    ctx.outpoint(),
                    bound.outpoint
                ))));
            }
        }
        Ok(())
    }

    /// Prepare the successor and the outputs a spend must produce
    ///
    /// The covenant output comes first, followed by `extra_outputs`.
    pub fn transition(
        &self,
        new_state: StructuredState,
        amount: u64,
        extra_outputs: &[TxOutput],
    ) -> Result<StateTransition> {
        let successor = self.next(new_state)?;
        let mut outputs = Vec::with_capacity(1 + extra_outputs.len());
        outputs.push(successor.commitment_output(amount));
        outputs.extend_from_slice(extra_outputs);
        Ok(StateTransition {
            predecessor: self.clone(),
            successor,
            outputs,
        })
    }

    /// Consume a bound instance
    pub fn spend(self, spending_txid: Hash) -> Result<SpentCovenant> {
        let bound = *self.require_bound("spend")?;
        info!(
            contract = %self.template.name,
            outpoint = %bound.outpoint,
            spending_txid = %hex::encode(spending_txid),
            "covenant spent"
        );
        Ok(SpentCovenant {
            template: self.template,
            utxo: bound,
            digest: self.digest,
            spending_txid,
        })
    }
}

/// Record left behind by a spent instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpentCovenant {
    pub template: Arc<ContractTemplate>,
    pub utxo: BoundUtxo,
    pub digest: StateDigest,
    pub spending_txid: Hash,
}

impl SpentCovenant {
    pub fn phase(&self) -> LifecyclePhase {
        LifecyclePhase::Spent
    }
}

/// One state transition, checked in a single pass against a context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    predecessor: CovenantInstance,
    successor: CovenantInstance,
    outputs: Vec<TxOutput>,
}

impl StateTransition {
    pub fn predecessor(&self) -> &CovenantInstance {
        &self.predecessor
    }

    pub fn successor(&self) -> &CovenantInstance {
        &self.successor
    }

    pub fn into_successor(self) -> CovenantInstance {
        self.successor
    }

    pub fn outputs(&self) -> &[TxOutput] {
        &self.outputs
    }

    pub fn output_bytes(&self) -> Vec<u8> {
        serialize_outputs(&self.outputs)
    }

    /// Continuity of the predecessor plus the required outputs
    pub fn verify<O: CommitsOutputs, I: InputSelector>(&self, ctx: &Context<O, I>) -> Result<()> {
        self.predecessor.verify_continuity(ctx)?;
        check_outputs(ctx, &self.output_bytes())
    }
}
