//! Proof-input assembly
//!
//! Orders the scalars handed to the circuit. Free scalars (parameters, operands, mapping keys)
//! appear at most once per function; per-state blocks follow declaration order, and only the
//! first state needing a membership root asks for it.

use shroud_runtime::{FunctionContext, MappingKey, StateVariableDescriptor, UpdateKind, SENDER_PARAMETER};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofInput {
    Scalar(String),
    State(StateInputs),
}

/// The templated block of circuit inputs owned by one state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateInputs {
    pub state: String,
    pub block: InputBlock,
    pub root_required: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputBlock {
    Whole { reinitialised_only: bool, burned_only: bool, accessed_only: bool },
    Increment,
    Decrement,
}

#[derive(Debug, Default)]
struct ProofInputBuilder {
    inputs: Vec<ProofInput>,
    emitted: HashSet<String>,
    root_claimed: bool,
}

impl ProofInputBuilder {
    fn scalar(&mut self, name: &str) {
        if self.emitted.insert(name.to_string()) {
            self.inputs.push(ProofInput::Scalar(name.to_string()));
        }
    }

    fn claim_root(&mut self, state: &StateVariableDescriptor) -> bool {
        if state.needs_root() && !self.root_claimed {
            self.root_claimed = true;
            return true;
        }
        false
    }

    fn block(&mut self, state: &StateVariableDescriptor, block: InputBlock) {
        let root_required = self.claim_root(state);
        self.inputs.push(ProofInput::State(StateInputs {
            state: state.name.clone(),
            block,
            root_required,
        }));
    }
}

/// Key scalar of a mapping state, unless the key already reaches the circuit as a parameter.
fn mapping_key_scalar(context: &FunctionContext, state: &StateVariableDescriptor) -> Option<String> {
    match state.mapping_key()? {
        MappingKey::Parameter(_) => None,
        MappingKey::Sender if context.uses_sender => None,
        MappingKey::Sender | MappingKey::Accessed(_) => Some(format!("{}_stateVarId_key", state.name)),
    }
}

pub fn build(context: &FunctionContext) -> Vec<ProofInput> {
    let mut builder = ProofInputBuilder::default();

    if context.uses_sender {
        builder.scalar(SENDER_PARAMETER);
    }
    for parameter in context.parameters.iter().filter(|p| !context.is_state(p)) {
        builder.scalar(parameter);
    }

    for state in &context.states {
        let block = match state.update_kind() {
            UpdateKind::Whole => InputBlock::Whole {
                reinitialised_only: state.reinitialised_only,
                burned_only: state.burned_only,
                accessed_only: state.accessed_only,
            },
            kind => {
                let operands = state
                    .operands
                    .iter()
                    .filter_map(|operand| operand.identifier())
                    .filter(|name| !context.is_state(name));
                for operand in operands {
                    builder.scalar(operand);
                }

                if kind == UpdateKind::Decrement {
                    InputBlock::Decrement
                } else {
                    InputBlock::Increment
                }
            }
        };

        if let Some(key) = mapping_key_scalar(context, state) {
            builder.scalar(&key);
        }
        builder.block(state, block);
    }

    builder.inputs
}

/// The state whose block carries the membership root, if any.
pub fn root_owner(inputs: &[ProofInput]) -> Option<&str> {
    inputs.iter().find_map(|input| match input {
        ProofInput::State(block) if block.root_required => Some(block.state.as_str()),
        _ => None,
    })
}
