//! Core types for the Shroud toolkit
//!
//! This module defines the classification contract between the upstream AST pass and the
//! orchestration synthesizer: one [`StateVariableDescriptor`] per private state touched by a
//! function, gathered into a [`FunctionContext`] in declaration order.

use crate::error::{Result, ShroudError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Name under which the transaction sender is passed to circuits and orchestration code.
pub const SENDER_PARAMETER: &str = "msgSender";

/// How a private state is committed to on-chain.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    /// One commitment holding the full value, replaced on every update.
    Whole,
    /// Many commitments whose values sum to the state (e.g. a balance).
    Partitioned,
}

/// The update performed on a state by one function, derived from its descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateKind {
    Whole,
    Increment,
    Decrement,
}

/// Where the key of a mapping-backed state comes from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MappingKey {
    /// The transaction sender (`msg.sender`).
    Sender,
    /// A declared function parameter.
    Parameter(String),
    /// A value read earlier in the same function.
    Accessed(String),
}

impl MappingKey {
    /// The identifier holding the key, if it is not the sender.
    pub fn identifier(&self) -> Option<&str> {
        match self {
            MappingKey::Sender => None,
            MappingKey::Parameter(name) | MappingKey::Accessed(name) => Some(name),
        }
    }
}

/// Mapping metadata of a keyed state, e.g. `tokens[msg.sender]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Mapping {
    /// Declared name of the mapping (`tokens`)
    pub name: String,
    pub key: MappingKey,
}

/// Which side of a mapping identifies the owner of a sender-owned state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MappingOwnership {
    Key,
    Value,
}

/// Who may spend the commitments of a state.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Ownership {
    /// No ownership restriction recorded by the classifier.
    #[default]
    Unowned,
    /// Owned by `msg.sender`, optionally through one side of a mapping.
    Sender {
        #[serde(default)]
        mode: Option<MappingOwnership>,
    },
    /// Owned by the address held in a named identifier.
    Named {
        identifier: String,
        #[serde(default)]
        secret: bool,
        #[serde(default)]
        parameter: bool,
    },
}

/// One term of an increment or decrement expression.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    Identifier(String),
    Literal(String),
}

impl Operand {
    pub fn identifier(&self) -> Option<&str> {
        match self {
            Operand::Identifier(name) => Some(name),
            Operand::Literal(_) => None,
        }
    }
}

/// Classification of one private state inside one function.
///
/// # Examples
///
/// ```
/// use shroud_runtime::{MappingKey, Operand, StateVariableDescriptor, UpdateKind};
///
/// let tokens = StateVariableDescriptor::partitioned("tokens_msg", 3)
///     .mapped("tokens", MappingKey::Sender)
///     .decrement()
///     .with_operand(Operand::Identifier("amount".to_string()));
///
/// assert_eq!(tokens.update_kind(), UpdateKind::Decrement);
/// assert_eq!(tokens.nullifier_count(), 2);
/// assert_eq!(tokens.commitment_count(), 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateVariableDescriptor {
    /// Private state name; keyed states carry their key, e.g. `tokens_msg`
    pub name: String,
    /// Base storage slot id used to derive the anonymised state identifier
    pub slot_id: u64,
    pub kind: StorageKind,
    /// Selects decrement (true) or increment (false) for partitioned states
    #[serde(default)]
    pub nullifier_required: bool,
    #[serde(default)]
    pub mapping: Option<Mapping>,
    #[serde(default)]
    pub accessed_only: bool,
    #[serde(default)]
    pub reinitialised_only: bool,
    #[serde(default)]
    pub burned_only: bool,
    /// A commitment is known to exist before this function runs
    #[serde(default)]
    pub initialised: bool,
    #[serde(default)]
    pub owner: Ownership,
    #[serde(default)]
    pub operands: Vec<Operand>,
}

impl StateVariableDescriptor {
    pub fn whole(name: impl Into<String>, slot_id: u64) -> Self {
        Self::new(name, slot_id, StorageKind::Whole)
    }

    pub fn partitioned(name: impl Into<String>, slot_id: u64) -> Self {
        Self::new(name, slot_id, StorageKind::Partitioned)
    }

    fn new(name: impl Into<String>, slot_id: u64, kind: StorageKind) -> Self {
        Self {
            name: name.into(),
            slot_id,
            kind,
            nullifier_required: false,
            mapping: None,
            accessed_only: false,
            reinitialised_only: false,
            burned_only: false,
            initialised: false,
            owner: Ownership::Unowned,
            operands: Vec::new(),
        }
    }

    pub fn mapped(mut self, mapping_name: impl Into<String>, key: MappingKey) -> Self {
        self.mapping = Some(Mapping { name: mapping_name.into(), key });
        self
    }

    pub fn decrement(mut self) -> Self {
        self.nullifier_required = true;
        self
    }

    pub fn accessed_only(mut self) -> Self {
        self.accessed_only = true;
        self
    }

    pub fn reinitialised_only(mut self) -> Self {
        self.reinitialised_only = true;
        self
    }

    pub fn burned_only(mut self) -> Self {
        self.burned_only = true;
        self
    }

    pub fn initialised(mut self) -> Self {
        self.initialised = true;
        self
    }

    pub fn owned_by(mut self, owner: Ownership) -> Self {
        self.owner = owner;
        self
    }

    pub fn with_operand(mut self, operand: Operand) -> Self {
        self.operands.push(operand);
        self
    }

    pub fn is_partitioned(&self) -> bool {
        self.kind == StorageKind::Partitioned
    }

    pub fn update_kind(&self) -> UpdateKind {
        match (self.kind, self.nullifier_required) {
            (StorageKind::Whole, _) => UpdateKind::Whole,
            (StorageKind::Partitioned, true) => UpdateKind::Decrement,
            (StorageKind::Partitioned, false) => UpdateKind::Increment,
        }
    }

    /// The declared mapping name, or the state name for non-mapping states.
    pub fn mapping_name(&self) -> &str {
        self.mapping.as_ref().map(|m| m.name.as_str()).unwrap_or(&self.name)
    }

    pub fn mapping_key(&self) -> Option<&MappingKey> {
        self.mapping.as_ref().map(|m| &m.key)
    }

    /// Nullifiers published or checked by the transaction for this state.
    pub fn nullifier_count(&self) -> usize {
        match self.update_kind() {
            UpdateKind::Decrement => 2,
            UpdateKind::Increment => 0,
            UpdateKind::Whole if self.reinitialised_only => 0,
            UpdateKind::Whole => 1,
        }
    }

    /// New commitments created by the transaction for this state.
    pub fn commitment_count(&self) -> usize {
        match self.update_kind() {
            UpdateKind::Whole if self.accessed_only || self.burned_only => 0,
            _ => 1,
        }
    }

    /// Whether the circuit checks a membership root for this state.
    pub fn needs_root(&self) -> bool {
        match self.update_kind() {
            UpdateKind::Whole => !self.reinitialised_only,
            UpdateKind::Decrement => true,
            UpdateKind::Increment => false,
        }
    }

    /// Modified states get a caller-overridable new owner key.
    pub fn is_modified(&self) -> bool {
        !self.accessed_only
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |reason: &str| -> Result<()> {
            Err(ShroudError::invalid_classification(&self.name, reason))
        };

        if self.name.is_empty() {
            return Err(ShroudError::invalid_classification("<unnamed>", "state name is empty"));
        }

        let exclusive = [self.accessed_only, self.reinitialised_only, self.burned_only]
            .iter()
            .filter(|flag| **flag)
            .count();
        if exclusive > 1 {
            return fail("accessed-only, reinitialised-only and burned-only are mutually exclusive");
        }

        if self.is_partitioned() {
            if exclusive > 0 {
                return fail("only whole states can be accessed-only, reinitialised-only or burned-only");
            }
            if self.operands.is_empty() {
                return fail("partitioned states need at least one increment or decrement operand");
            }
        }

        if let Some(mapping) = &self.mapping {
            if mapping.name.is_empty() {
                return fail("mapping name is empty");
            }
            if mapping.key.identifier().is_some_and(str::is_empty) {
                return fail("mapping key identifier is empty");
            }
        }

        Ok(())
    }
}

/// A declared return value, appended to the transaction handle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReturnValue {
    pub name: String,
}

/// Everything the synthesizer knows about one function.
///
/// Built once by the classification pass and read-only afterwards. `states` is kept in
/// declaration order; root selection and parameter dedup depend on it.
///
/// # Examples
///
/// ```
/// use shroud_runtime::{FunctionContext, Operand, StateVariableDescriptor};
///
/// let context = FunctionContext::new("deposit", "Escrow")
///     .with_parameter("amount")
///     .with_state(
///         StateVariableDescriptor::partitioned("balance", 5)
///             .with_operand(Operand::Identifier("amount".to_string())),
///     );
///
/// assert!(context.validate().is_ok());
/// assert_eq!(context.circuit_name, "deposit");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunctionContext {
    pub name: String,
    pub contract_name: String,
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default)]
    pub states: Vec<StateVariableDescriptor>,
    /// The function body reads `msg.sender`
    #[serde(default)]
    pub uses_sender: bool,
    #[serde(default)]
    pub returns: Vec<ReturnValue>,
    pub circuit_name: String,
    #[serde(default)]
    pub public_inputs: Vec<String>,
    /// Public keys must be registered on-chain before use
    #[serde(default)]
    pub key_registry: bool,
}

impl FunctionContext {
    pub fn new(name: impl Into<String>, contract_name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            circuit_name: name.clone(),
            name,
            contract_name: contract_name.into(),
            parameters: Vec::new(),
            states: Vec::new(),
            uses_sender: false,
            returns: Vec::new(),
            public_inputs: Vec::new(),
            key_registry: false,
        }
    }

    pub fn from_json(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn with_parameter(mut self, name: impl Into<String>) -> Self {
        self.parameters.push(name.into());
        self
    }

    pub fn with_state(mut self, state: StateVariableDescriptor) -> Self {
        self.states.push(state);
        self
    }

    pub fn with_sender(mut self) -> Self {
        self.uses_sender = true;
        self
    }

    pub fn with_return(mut self, name: impl Into<String>) -> Self {
        self.returns.push(ReturnValue { name: name.into() });
        self
    }

    pub fn with_public_input(mut self, name: impl Into<String>) -> Self {
        self.public_inputs.push(name.into());
        self
    }

    pub fn with_circuit(mut self, circuit_name: impl Into<String>) -> Self {
        self.circuit_name = circuit_name.into();
        self
    }

    pub fn with_key_registry(mut self) -> Self {
        self.key_registry = true;
        self
    }

    pub fn state(&self, name: &str) -> Option<&StateVariableDescriptor> {
        self.states.iter().find(|s| s.name == name)
    }

    pub fn is_state(&self, name: &str) -> bool {
        self.state(name).is_some()
    }

    pub fn is_parameter(&self, name: &str) -> bool {
        self.parameters.iter().any(|p| p == name)
    }

    /// States decremented by this function, in declaration order.
    pub fn decremented_states(&self) -> impl Iterator<Item = &StateVariableDescriptor> {
        self.states.iter().filter(|s| s.update_kind() == UpdateKind::Decrement)
    }

    /// States receiving a new owner key, in declaration order.
    pub fn modified_states(&self) -> impl Iterator<Item = &StateVariableDescriptor> {
        self.states.iter().filter(|s| s.is_modified())
    }

    /// Checks the classification contract before any code is synthesized.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(ShroudError::other("function name is empty"));
        }

        let mut seen = HashSet::new();
        for state in &self.states {
            state.validate()?;

            if !seen.insert(state.name.as_str()) {
                return Err(ShroudError::invalid_classification(
                    &state.name,
                    "state declared more than once",
                ));
            }

            if let Some(MappingKey::Parameter(key)) = state.mapping_key() {
                if !self.is_parameter(key) {
                    return Err(ShroudError::invalid_classification(
                        &state.name,
                        format!("mapping key '{}' is not a declared parameter", key),
                    ));
                }
            }

            if let Ownership::Named { identifier, parameter: true, .. } = &state.owner {
                if !self.is_parameter(identifier) {
                    return Err(ShroudError::invalid_classification(
                        &state.name,
                        format!("owner '{}' is not a declared parameter", identifier),
                    ));
                }
            }
        }

        Ok(())
    }
}
