//! Context Preimage Verifier
//!
//! A contract receives the sighash preimage of the transaction spending it,
//! proves the preimage authentic through the signature check, and from then
//! on treats its fields as facts about the spending transaction.
//!
//! Preimage layout (320 bytes, integers little-endian):
//!
//! | field                     | size |
//! |---------------------------|------|
//! | version                   | 4    |
//! | lock_time                 | 4    |
//! | hash_prevouts             | 32   |
//! | hash_spent_script_hashes  | 32   |
//! | hash_spent_amounts        | 32   |
//! | hash_spent_data_hashes    | 32   |
//! | hash_sequences            | 32   |
//! | hash_outputs              | 32   |
//! | input_index               | 4    |
//! | outpoint                  | 36   |
//! | spent_script_hash         | 32   |
//! | spent_amount              | 8    |
//! | spent_data_hash           | 32   |
//! | sequence                  | 4    |
//! | sighash_type              | 4    |
//!
//! Fields a sighash mode does not commit to are the all-zero sentinel. The
//! typed [`Context`] only offers accessors for fields its mode commits to.

use crate::constants::{
    CONTEXT_PREIMAGE_SIZE, HASH_SIZE, SIGHASH_ALL, SIGHASH_ANYONECANPAY, SIGHASH_NONE,
    SIGHASH_SINGLE,
};
use crate::crypto::sha256;
use crate::error::{CovenantError, Result};
use crate::serialization::reader::ByteReader;
use crate::types::{Hash, Outpoint};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;
use tracing::debug;

const ZERO_HASH: Hash = [0u8; HASH_SIZE];

/// Which outputs a signature commits to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputMode {
    All,
    None,
    Single,
}

/// Sighash mode: output selection plus the AnyoneCanPay input flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SighashMode {
    pub outputs: OutputMode,
    pub anyone_can_pay: bool,
}

/// Preimage fields, for access planning with [`SighashMode::check_access`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextField {
    Version,
    LockTime,
    HashPrevouts,
    HashSpentScriptHashes,
    HashSpentAmounts,
    HashSpentDataHashes,
    HashSequences,
    HashOutputs,
    InputIndex,
    Outpoint,
    SpentScriptHash,
    SpentAmount,
    SpentDataHash,
    Sequence,
    SighashType,
}

impl fmt::Display for ContextField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl SighashMode {
    pub const ALL: Self = Self::new(OutputMode::All, false);
    pub const NONE: Self = Self::new(OutputMode::None, false);
    pub const SINGLE: Self = Self::new(OutputMode::Single, false);
    pub const ALL_ANYONECANPAY: Self = Self::new(OutputMode::All, true);
    pub const NONE_ANYONECANPAY: Self = Self::new(OutputMode::None, true);
    pub const SINGLE_ANYONECANPAY: Self = Self::new(OutputMode::Single, true);

    pub const fn new(outputs: OutputMode, anyone_can_pay: bool) -> Self {
        Self {
            outputs,
            anyone_can_pay,
        }
    }

    pub fn from_u32(value: u32) -> Result<Self> {
        let anyone_can_pay = value & SIGHASH_ANYONECANPAY != 0;
        let outputs = match value & !SIGHASH_ANYONECANPAY {
            SIGHASH_ALL => OutputMode::All,
            SIGHASH_NONE => OutputMode::None,
            SIGHASH_SINGLE => OutputMode::Single,
            _ => {
                return Err(CovenantError::MalformedEncoding(Cow::Owned(format!(
                    "unknown sighash type {value:#x}"
                ))))
            }
        };
        Ok(Self::new(outputs, anyone_can_pay))
    }

    pub fn to_u32(self) -> u32 {
        let base = match self.outputs {
            OutputMode::All => SIGHASH_ALL,
            OutputMode::None => SIGHASH_NONE,
            OutputMode::Single => SIGHASH_SINGLE,
        };
        if self.anyone_can_pay {
            base | SIGHASH_ANYONECANPAY
        } else {
            base
        }
    }

    pub fn commits_outputs(self) -> bool {
        self.outputs != OutputMode::None
    }

    pub fn commits_input_set(self) -> bool {
        !self.anyone_can_pay
    }

    pub fn commits_sequences(self) -> bool {
        self.outputs == OutputMode::All && !self.anyone_can_pay
    }

    /// Whether `field` is committed under this mode
    pub fn check_access(self, field: ContextField) -> Result<()> {
        let committed = match field {
            ContextField::HashPrevouts
            | ContextField::HashSpentScriptHashes
            | ContextField::HashSpentAmounts
            | ContextField::HashSpentDataHashes => self.commits_input_set(),
            ContextField::HashSequences => self.commits_sequences(),
            ContextField::HashOutputs => self.commits_outputs(),
            _ => true,
        };
        if committed {
            Ok(())
        } else {
            Err(CovenantError::SighashModeViolation(Cow::Owned(format!(
                "{field} is not committed under {self}"
            ))))
        }
    }
}

impl fmt::Display for SighashMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = match self.outputs {
            OutputMode::All => "ALL",
            OutputMode::None => "NONE",
            OutputMode::Single => "SINGLE",
        };
        if self.anyone_can_pay {
            write!(f, "{base}|ANYONECANPAY")
        } else {
            f.write_str(base)
        }
    }
}

/// Raw preimage record, exactly the 320-byte layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextPreimage {
    pub version: u32,
    pub lock_time: u32,
    pub hash_prevouts: Hash,
    pub hash_spent_script_hashes: Hash,
    pub hash_spent_amounts: Hash,
    pub hash_spent_data_hashes: Hash,
    pub hash_sequences: Hash,
    pub hash_outputs: Hash,
    pub input_index: u32,
    pub outpoint: Outpoint,
    pub spent_script_hash: Hash,
    pub spent_amount: u64,
    pub spent_data_hash: Hash,
    pub sequence: u32,
    pub sighash_type: u32,
}

impl ContextPreimage {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(CONTEXT_PREIMAGE_SIZE);
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.lock_time.to_le_bytes());
        out.extend_from_slice(&self.hash_prevouts);
        out.extend_from_slice(&self.hash_spent_script_hashes);
        out.extend_from_slice(&self.hash_spent_amounts);
        out.extend_from_slice(&self.hash_spent_data_hashes);
        out.extend_from_slice(&self.hash_sequences);
        out.extend_from_slice(&self.hash_outputs);
        out.extend_from_slice(&self.input_index.to_le_bytes());
        out.extend_from_slice(&self.outpoint.to_bytes());
        out.extend_from_slice(&self.spent_script_hash);
        out.extend_from_slice(&self.spent_amount.to_le_bytes());
        out.extend_from_slice(&self.spent_data_hash);
        out.extend_from_slice(&self.sequence.to_le_bytes());
        out.extend_from_slice(&self.sighash_type.to_le_bytes());
        debug_assert_eq!(out.len(), CONTEXT_PREIMAGE_SIZE);
        out
    }

    /// Decode the layout without checking any mode rule
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != CONTEXT_PREIMAGE_SIZE {
            return Err(CovenantError::MalformedEncoding(Cow::Owned(format!(
                "context preimage must be {CONTEXT_PREIMAGE_SIZE} bytes, got {}",
                bytes.len()
            ))));
        }
        let mut r = ByteReader::new(bytes, "context preimage");
        let preimage = Self {
            version: r.u32_le()?,
            lock_time: r.u32_le()?,
            hash_prevouts: r.array()?,
            hash_spent_script_hashes: r.array()?,
            hash_spent_amounts: r.array()?,
            hash_spent_data_hashes: r.array()?,
            hash_sequences: r.array()?,
            hash_outputs: r.array()?,
            input_index: r.u32_le()?,
            outpoint: Outpoint::from_bytes(&r.array()?),
            spent_script_hash: r.array()?,
            spent_amount: r.u64_le()?,
            spent_data_hash: r.array()?,
            sequence: r.u32_le()?,
            sighash_type: r.u32_le()?,
        };
        r.finish()?;
        Ok(preimage)
    }
}

/// A preimage that passed layout, sentinel and input-index checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedContext {
    preimage: ContextPreimage,
    mode: SighashMode,
}

impl ParsedContext {
    /// Parse preimage bytes for the input at `input_index`
    pub fn parse(bytes: &[u8], input_index: u32) -> Result<Self> {
        let preimage = ContextPreimage::decode(bytes)?;
        let mode = SighashMode::from_u32(preimage.sighash_type)?;
        check_sentinels(&preimage, mode)?;
        if preimage.input_index != input_index {
            debug!(
                committed = preimage.input_index,
                supplied = input_index,
                "context input index mismatch"
            );
            return Err(CovenantError::ContextMismatch(Cow::Owned(format!(
                "preimage commits input {}, evaluating input {input_index}",
                preimage.input_index
            ))));
        }
        Ok(Self { preimage, mode })
    }

    pub fn mode(&self) -> SighashMode {
        self.mode
    }

    pub fn input_index(&self) -> u32 {
        self.preimage.input_index
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.preimage.to_bytes()
    }

    /// Convert into the context typed for mode `(O, I)`
    pub fn typed<O: OutputSelector, I: InputSelector>(self) -> Result<Context<O, I>> {
        let expected = SighashMode::new(O::MODE, I::ANYONE_CAN_PAY);
        if self.mode != expected {
            debug!(preimage = %self.mode, expected = %expected, "sighash mode violation");
            return Err(CovenantError::SighashModeViolation(Cow::Owned(format!(
                "preimage signed with {}, contract expects {expected}",
                self.mode
            ))));
        }
        Ok(Context {
            preimage: self.preimage,
            _mode: PhantomData,
        })
    }
}

fn check_sentinels(preimage: &ContextPreimage, mode: SighashMode) -> Result<()> {
    let gated = [
        (ContextField::HashPrevouts, &preimage.hash_prevouts),
        (
            ContextField::HashSpentScriptHashes,
            &preimage.hash_spent_script_hashes,
        ),
        (ContextField::HashSpentAmounts, &preimage.hash_spent_amounts),
        (
            ContextField::HashSpentDataHashes,
            &preimage.hash_spent_data_hashes,
        ),
        (ContextField::HashSequences, &preimage.hash_sequences),
        (ContextField::HashOutputs, &preimage.hash_outputs),
    ];
    for (field, value) in gated {
        if mode.check_access(field).is_err() && *value != ZERO_HASH {
            return Err(CovenantError::MalformedEncoding(Cow::Owned(format!(
                "{field} must be zero under {mode}"
            ))));
        }
    }
    Ok(())
}

mod sealed {
    pub trait Sealed {}
}

/// Type-level output selection
pub trait OutputSelector: sealed::Sealed {
    const MODE: OutputMode;
}

/// Type-level input selection
pub trait InputSelector: sealed::Sealed {
    const ANYONE_CAN_PAY: bool;
}

/// Output selections that commit `hash_outputs`
pub trait CommitsOutputs: OutputSelector {}

/// Input selections that commit the spent-input aggregates
pub trait CommitsInputSet: InputSelector {}

/// SIGHASH_ALL
#[derive(Debug, Clone, Copy)]
pub struct OutputsAll;
/// SIGHASH_NONE
#[derive(Debug, Clone, Copy)]
pub struct OutputsNone;
/// SIGHASH_SINGLE
#[derive(Debug, Clone, Copy)]
pub struct OutputsSingle;
/// Every input committed
#[derive(Debug, Clone, Copy)]
pub struct InputsAll;
/// ANYONECANPAY: only the current input committed
#[derive(Debug, Clone, Copy)]
pub struct AnyoneCanPay;

impl sealed::Sealed for OutputsAll {}
impl sealed::Sealed for OutputsNone {}
impl sealed::Sealed for OutputsSingle {}
impl sealed::Sealed for InputsAll {}
impl sealed::Sealed for AnyoneCanPay {}

impl OutputSelector for OutputsAll {
    const MODE: OutputMode = OutputMode::All;
}
impl OutputSelector for OutputsNone {
    const MODE: OutputMode = OutputMode::None;
}
impl OutputSelector for OutputsSingle {
    const MODE: OutputMode = OutputMode::Single;
}
impl InputSelector for InputsAll {
    const ANYONE_CAN_PAY: bool = false;
}
impl InputSelector for AnyoneCanPay {
    const ANYONE_CAN_PAY: bool = true;
}

impl CommitsOutputs for OutputsAll {}
impl CommitsOutputs for OutputsSingle {}
impl CommitsInputSet for InputsAll {}

/// Context typed by sighash mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context<O, I> {
    preimage: ContextPreimage,
    _mode: PhantomData<(O, I)>,
}

pub type AllContext = Context<OutputsAll, InputsAll>;
pub type NoneContext = Context<OutputsNone, InputsAll>;
pub type SingleContext = Context<OutputsSingle, InputsAll>;
pub type AllAnyoneCanPayContext = Context<OutputsAll, AnyoneCanPay>;
pub type NoneAnyoneCanPayContext = Context<OutputsNone, AnyoneCanPay>;
pub type SingleAnyoneCanPayContext = Context<OutputsSingle, AnyoneCanPay>;

impl<O: OutputSelector, I: InputSelector> Context<O, I> {
    /// Parse and type in one step
    pub fn parse(bytes: &[u8], input_index: u32) -> Result<Self> {
        ParsedContext::parse(bytes, input_index)?.typed()
    }

    pub fn mode(&self) -> SighashMode {
        SighashMode::new(O::MODE, I::ANYONE_CAN_PAY)
    }

    pub fn version(&self) -> u32 {
        self.preimage.version
    }

    pub fn lock_time(&self) -> u32 {
        self.preimage.lock_time
    }

    pub fn input_index(&self) -> u32 {
        self.preimage.input_index
    }

    pub fn outpoint(&self) -> &Outpoint {
        &self.preimage.outpoint
    }

    pub fn spent_script_hash(&self) -> &Hash {
        &self.preimage.spent_script_hash
    }

    pub fn spent_amount(&self) -> u64 {
        self.preimage.spent_amount
    }

    pub fn spent_data_hash(&self) -> &Hash {
        &self.preimage.spent_data_hash
    }

    pub fn sequence(&self) -> u32 {
        self.preimage.sequence
    }

    pub fn preimage(&self) -> &ContextPreimage {
        &self.preimage
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.preimage.to_bytes()
    }
}

impl<O: CommitsOutputs, I: InputSelector> Context<O, I> {
    pub fn hash_outputs(&self) -> &Hash {
        &self.preimage.hash_outputs
    }
}

impl<O: OutputSelector, I: CommitsInputSet> Context<O, I> {
    pub fn hash_prevouts(&self) -> &Hash {
        &self.preimage.hash_prevouts
    }

    pub fn hash_spent_script_hashes(&self) -> &Hash {
        &self.preimage.hash_spent_script_hashes
    }

    pub fn hash_spent_amounts(&self) -> &Hash {
        &self.preimage.hash_spent_amounts
    }

    pub fn hash_spent_data_hashes(&self) -> &Hash {
        &self.preimage.hash_spent_data_hashes
    }

    /// Check the witness lists against the committed aggregates
    pub fn verify_inputs(&self, witness: &InputWitness) -> Result<VerifiedInputs> {
        verify_inputs(self, witness)
    }
}

impl Context<OutputsAll, InputsAll> {
    pub fn hash_sequences(&self) -> &Hash {
        &self.preimage.hash_sequences
    }
}

/// Claimed per-input lists, supplied in the unlocking data
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputWitness {
    pub prevouts: Vec<Outpoint>,
    pub spent_script_hashes: Vec<Hash>,
    pub spent_amounts: Vec<u64>,
    pub spent_data_hashes: Vec<Hash>,
    /// Only needed when the mode commits sequences
    pub sequences: Option<Vec<u32>>,
}

/// Per-input facts proven against a context
///
/// Only [`verify_inputs`] constructs this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedInputs {
    input_index: usize,
    prevouts: Vec<Outpoint>,
    spent_script_hashes: Vec<Hash>,
    spent_amounts: Vec<u64>,
    spent_data_hashes: Vec<Hash>,
    sequences: Option<Vec<u32>>,
}

impl VerifiedInputs {
    pub fn len(&self) -> usize {
        self.prevouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prevouts.is_empty()
    }

    pub fn input_index(&self) -> usize {
        self.input_index
    }

    pub fn prevouts(&self) -> &[Outpoint] {
        &self.prevouts
    }

    pub fn spent_script_hashes(&self) -> &[Hash] {
        &self.spent_script_hashes
    }

    pub fn spent_amounts(&self) -> &[u64] {
        &self.spent_amounts
    }

    pub fn spent_data_hashes(&self) -> &[Hash] {
        &self.spent_data_hashes
    }

    pub fn sequences(&self) -> Option<&[u32]> {
        self.sequences.as_deref()
    }

    pub fn current_outpoint(&self) -> &Outpoint {
        &self.prevouts[self.input_index]
    }

    pub fn current_spent_script_hash(&self) -> &Hash {
        &self.spent_script_hashes[self.input_index]
    }
}

pub fn hash_prevouts(prevouts: &[Outpoint]) -> Hash {
    let mut buf = Vec::with_capacity(prevouts.len() * 36);
    for prevout in prevouts {
        buf.extend_from_slice(&prevout.to_bytes());
    }
    sha256(&buf)
}

pub fn hash_hashes(hashes: &[Hash]) -> Hash {
    sha256(&hashes.concat())
}

pub fn hash_amounts(amounts: &[u64]) -> Hash {
    let buf: Vec<u8> = amounts.iter().flat_map(|a| a.to_le_bytes()).collect();
    sha256(&buf)
}

pub fn hash_sequences(sequences: &[u32]) -> Hash {
    let buf: Vec<u8> = sequences.iter().flat_map(|s| s.to_le_bytes()).collect();
    sha256(&buf)
}

fn mismatch(what: &'static str) -> CovenantError {
    debug!(field = what, "context aggregate mismatch");
    CovenantError::ContextMismatch(Cow::Borrowed(what))
}

/// Recompute every committed aggregate from `witness`
///
/// Any mismatch aborts with `ContextMismatch`; no partial result escapes.
pub fn verify_inputs<O: OutputSelector, I: CommitsInputSet>(
    ctx: &Context<O, I>,
    witness: &InputWitness,
) -> Result<VerifiedInputs> {
    let n = witness.prevouts.len();
    if witness.spent_script_hashes.len() != n
        || witness.spent_amounts.len() != n
        || witness.spent_data_hashes.len() != n
        || witness.sequences.as_ref().is_some_and(|s| s.len() != n)
    {
        return Err(mismatch("input lists differ in length"));
    }
    let index = ctx.input_index() as usize;
    if index >= n {
        return Err(mismatch("input index beyond supplied inputs"));
    }

    if hash_prevouts(&witness.prevouts) != *ctx.hash_prevouts() {
        return Err(mismatch("hash_prevouts"));
    }
    if hash_hashes(&witness.spent_script_hashes) != *ctx.hash_spent_script_hashes() {
        return Err(mismatch("hash_spent_script_hashes"));
    }
    if hash_amounts(&witness.spent_amounts) != *ctx.hash_spent_amounts() {
        return Err(mismatch("hash_spent_amounts"));
    }
    if hash_hashes(&witness.spent_data_hashes) != *ctx.hash_spent_data_hashes() {
        return Err(mismatch("hash_spent_data_hashes"));
    }
    let sequences = if ctx.mode().commits_sequences() {
        let sequences = witness
            .sequences
            .as_ref()
            .ok_or_else(|| mismatch("sequences required under this mode"))?;
        if hash_sequences(sequences) != ctx.preimage.hash_sequences {
            return Err(mismatch("hash_sequences"));
        }
        if sequences[index] != ctx.sequence() {
            return Err(mismatch("current sequence"));
        }
        Some(sequences.clone())
    } else {
        None
    };

    if witness.prevouts[index] != *ctx.outpoint() {
        return Err(mismatch("current outpoint"));
    }
    if witness.spent_script_hashes[index] != *ctx.spent_script_hash() {
        return Err(mismatch("current spent script hash"));
    }
    if witness.spent_amounts[index] != ctx.spent_amount() {
        return Err(mismatch("current spent amount"));
    }
    if witness.spent_data_hashes[index] != *ctx.spent_data_hash() {
        return Err(mismatch("current spent data hash"));
    }

    Ok(VerifiedInputs {
        input_index: index,
        prevouts: witness.prevouts.clone(),
        spent_script_hashes: witness.spent_script_hashes.clone(),
        spent_amounts: witness.spent_amounts.clone(),
        spent_data_hashes: witness.spent_data_hashes.clone(),
        sequences,
    })
}
