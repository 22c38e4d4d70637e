//! Fragment IR emitted by the synthesizer
//!
//! Each variant describes one construct of the generated routine. Turning a fragment into text
//! is the job of a [`TemplateProvider`](super::templates::TemplateProvider).

use super::proof_inputs::ProofInput;
use super::transaction::TransactionParameters;
use super::GenerationStage;
use shroud_runtime::{MappingKey, Operand, UpdateKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Comment line opening a stage
    Heading(GenerationStage),
    Imports,
    ContractInstance { contract: String },
    SenderBinding,
    ParameterBinding { name: String },
    NewOwnerKey { state: String },
    SignatureOpen(SignatureOpen),
    SignatureClose(SignatureClose),
    InitialisePreimage(PreimageInit),
    InitialiseKeys(KeySetup),
    ReadPreimage(PreimageRead),
    /// Binds an accessed-only state's value from its stored preimage
    AccessedBinding { state: String },
    LoadStore,
    LazyInit(StorePath),
    WritePreimage(PreimageWrite),
    PersistStore,
    MembershipWitness(Witness),
    Nullifier(NullifierCalc),
    Commitment(CommitmentCalc),
    ProofInputs(Vec<ProofInput>),
    GenerateProof { circuit: String },
    FlattenProof,
    SendTransaction(TransactionCall),
}

/// Opening line of the exported routine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureOpen {
    pub function: String,
    pub parameters: Vec<String>,
    /// Caller-overridable arguments defaulting to zero, already prefixed with `_`
    pub overrides: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureClose {
    pub returns: Vec<String>,
}

/// Anonymised storage identifier of a state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageId {
    /// Fixed-width identifier derived from the slot id alone
    Fixed { state: String, slot_id: u64 },
    /// `hash(slot_id, key)` for a mapping entry
    Mapped { state: String, slot_id: u64, key: MappingKey },
}

/// Location of a state inside the persisted preimage store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePath {
    /// Mapping name, or the state name for non-mapping states
    pub root: String,
    /// State whose `_stateVarId_key` indexes into `root`
    pub keyed_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreimageInit {
    pub state: String,
    pub kind: UpdateKind,
    pub storage_id: StorageId,
    pub path: StorePath,
    pub accessed_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySetup {
    pub contract: String,
    pub registry: bool,
}

/// How the new owner public key of a modified state is obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerResolution {
    /// Caller-supplied override, else the caller's own key
    CallerOrSelf,
    /// Always the caller's own key
    SelfKey,
    /// Registry lookup by the address held in the mapping key
    RegistryByKey { key: String },
    /// Registry lookup by the state's own address value, falling back to the caller's key
    RegistryByValue,
    /// Registry lookup of the address stored on-chain under `identifier`
    RegistryByIdentifier { identifier: String },
    /// Caller-supplied override, else the named parameter
    Parameter { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreimageRead {
    pub state: String,
    pub kind: UpdateKind,
    /// None for accessed-only states, which keep their owner
    pub owner: Option<OwnerResolution>,
    pub operands: Vec<Operand>,
    pub accessed_only: bool,
    pub reinitialised_only: bool,
    pub initialised: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreimageWrite {
    pub state: String,
    pub kind: UpdateKind,
    pub path: StorePath,
    pub burned_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WitnessMode {
    Partitioned { decrement: bool },
    Whole,
    Accessed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Witness {
    pub state: String,
    pub contract: String,
    pub mode: WitnessMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NullifierCalc {
    pub state: String,
    pub kind: UpdateKind,
    pub accessed_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitmentCalc {
    pub state: String,
    pub kind: UpdateKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionCall {
    pub function: String,
    pub public_inputs: Vec<String>,
    pub parameters: TransactionParameters,
}
