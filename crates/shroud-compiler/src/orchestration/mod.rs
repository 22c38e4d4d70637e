//! Orchestration code synthesis
//!
//! Turns a classified [`FunctionContext`] into the ordered fragments of an off-chain routine that
//! reads commitment preimages, proves membership, derives nullifiers and commitments, builds the
//! proof and submits the transaction.
//!
//! # Example
//!
//! ```
//! use shroud_compiler::orchestration::{GenerationStage, JavaScriptTemplates, Synthesizer};
//! use shroud_runtime::{FunctionContext, StateVariableDescriptor};
//!
//! let context = FunctionContext::new("deposit", "Bank")
//!     .with_parameter("value")
//!     .with_state(StateVariableDescriptor::whole("balance", 3));
//!
//! let synthesizer = Synthesizer::new(&context).unwrap();
//! let nullifiers = synthesizer.stage(GenerationStage::CalculateNullifier);
//! assert_eq!(nullifiers.len(), 2); // heading + balance
//!
//! let code = synthesizer.render(&JavaScriptTemplates::default());
//! assert!(code.contains("export default async function deposit(_value, _balance_newOwnerPublicKey = 0)"));
//! ```

pub mod ir;
pub mod preimage;
pub mod proof_inputs;
pub mod templates;
pub mod transaction;

pub use ir::*;
pub use proof_inputs::{InputBlock, ProofInput, StateInputs};
pub use templates::{render_fragments, JavaScriptTemplates, TemplateConfig, TemplateProvider};
pub use transaction::{TransactionArgument, TransactionParameters};

use crate::error::{CompilerError, Result};
use serde::{Deserialize, Serialize};
use shroud_runtime::{FunctionContext, UpdateKind};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Generation stages in routine order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStage {
    Imports,
    FunctionDefinition,
    InitialisePreimage,
    InitialiseKeys,
    ReadPreimage,
    WritePreimage,
    MembershipWitness,
    CalculateNullifier,
    CalculateCommitment,
    GenerateProof,
    SendTransaction,
}

impl GenerationStage {
    pub const ALL: [GenerationStage; 11] = [
        GenerationStage::Imports,
        GenerationStage::FunctionDefinition,
        GenerationStage::InitialisePreimage,
        GenerationStage::InitialiseKeys,
        GenerationStage::ReadPreimage,
        GenerationStage::WritePreimage,
        GenerationStage::MembershipWitness,
        GenerationStage::CalculateNullifier,
        GenerationStage::CalculateCommitment,
        GenerationStage::GenerateProof,
        GenerationStage::SendTransaction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStage::Imports => "imports",
            GenerationStage::FunctionDefinition => "function_definition",
            GenerationStage::InitialisePreimage => "initialise_preimage",
            GenerationStage::InitialiseKeys => "initialise_keys",
            GenerationStage::ReadPreimage => "read_preimage",
            GenerationStage::WritePreimage => "write_preimage",
            GenerationStage::MembershipWitness => "membership_witness",
            GenerationStage::CalculateNullifier => "calculate_nullifier",
            GenerationStage::CalculateCommitment => "calculate_commitment",
            GenerationStage::GenerateProof => "generate_proof",
            GenerationStage::SendTransaction => "send_transaction",
        }
    }
}

impl fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationStage {
    type Err = CompilerError;

    /// Accepts the snake_case name or the PascalCase variant name.
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s.chars().filter(|c| *c != '_').collect::<String>().to_lowercase();
        GenerationStage::ALL
            .into_iter()
            .find(|stage| stage.as_str().replace('_', "") == normalized)
            .ok_or_else(|| CompilerError::UnknownStage(s.to_string()))
    }
}

/// Exported routine signature: opening line and closing return shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub open: SignatureOpen,
    pub close: SignatureClose,
}

pub struct Synthesizer<'a> {
    context: &'a FunctionContext,
}

impl<'a> Synthesizer<'a> {
    /// Validates the context; a malformed classification never reaches the stages.
    pub fn new(context: &'a FunctionContext) -> Result<Self> {
        context.validate()?;
        Ok(Self { context })
    }

    pub fn stage(&self, kind: GenerationStage) -> Vec<Fragment> {
        let fragments = match kind {
            GenerationStage::Imports => vec![Fragment::Imports],
            GenerationStage::FunctionDefinition => self.function_definition(),
            GenerationStage::InitialisePreimage => self.initialise_preimage(),
            GenerationStage::InitialiseKeys => self.initialise_keys(),
            GenerationStage::ReadPreimage => self.read_preimage(),
            GenerationStage::WritePreimage => self.write_preimage(),
            GenerationStage::MembershipWitness => self.membership_witness(),
            GenerationStage::CalculateNullifier => self.calculate_nullifier(),
            GenerationStage::CalculateCommitment => self.calculate_commitment(),
            GenerationStage::GenerateProof => self.generate_proof(),
            GenerationStage::SendTransaction => self.send_transaction(),
        };
        debug!(function = %self.context.name, stage = %kind, fragments = fragments.len(), "Synthesized stage");
        fragments
    }

    pub fn signature(&self) -> Signature {
        let ctx = self.context;
        let mut overrides: Vec<String> = ctx
            .modified_states()
            .map(|state| format!("_{}_newOwnerPublicKey", state.name))
            .collect();
        for state in ctx.decremented_states() {
            overrides.push(format!("_{}_0_oldCommitment", state.name));
            overrides.push(format!("_{}_1_oldCommitment", state.name));
        }

        Signature {
            open: SignatureOpen {
                function: ctx.name.clone(),
                parameters: ctx.parameters.clone(),
                overrides,
            },
            close: SignatureClose {
                returns: ctx.returns.iter().map(|value| value.name.clone()).collect(),
            },
        }
    }

    /// Every stage in order, wrapped in the signature pair.
    pub fn routine(&self) -> Vec<Fragment> {
        let Signature { open, close } = self.signature();
        let mut fragments = self.stage(GenerationStage::Imports);
        fragments.push(Fragment::SignatureOpen(open));
        for stage in GenerationStage::ALL.into_iter().skip(1) {
            fragments.extend(self.stage(stage));
        }
        fragments.push(Fragment::SignatureClose(close));
        fragments
    }

    pub fn render<T: TemplateProvider + ?Sized>(&self, templates: &T) -> String {
        render_fragments(templates, &self.routine())
    }

    fn function_definition(&self) -> Vec<Fragment> {
        let ctx = self.context;
        let mut fragments = vec![
            Fragment::Heading(GenerationStage::FunctionDefinition),
            Fragment::ContractInstance { contract: ctx.contract_name.clone() },
        ];
        if ctx.uses_sender {
            fragments.push(Fragment::SenderBinding);
        }
        fragments.extend(ctx.parameters.iter().map(|name| Fragment::ParameterBinding { name: name.clone() }));
        fragments.extend(ctx.modified_states().map(|state| Fragment::NewOwnerKey { state: state.name.clone() }));
        fragments
    }

    fn initialise_preimage(&self) -> Vec<Fragment> {
        let mut fragments = vec![Fragment::Heading(GenerationStage::InitialisePreimage)];
        fragments.extend(
            self.context.states.iter().map(|state| Fragment::InitialisePreimage(preimage::init(state))),
        );
        fragments
    }

    fn initialise_keys(&self) -> Vec<Fragment> {
        vec![
            Fragment::Heading(GenerationStage::InitialiseKeys),
            Fragment::InitialiseKeys(KeySetup {
                contract: self.context.contract_name.clone(),
                registry: self.context.key_registry,
            }),
        ]
    }

    fn read_preimage(&self) -> Vec<Fragment> {
        let states = &self.context.states;
        let mut fragments = vec![Fragment::Heading(GenerationStage::ReadPreimage)];
        fragments.extend(
            states
                .iter()
                .filter(|state| state.accessed_only)
                .map(|state| Fragment::AccessedBinding { state: state.name.clone() }),
        );
        fragments.extend(states.iter().map(|state| Fragment::ReadPreimage(preimage::read(state))));
        fragments
    }

    fn write_preimage(&self) -> Vec<Fragment> {
        let mut fragments = vec![Fragment::Heading(GenerationStage::WritePreimage), Fragment::LoadStore];

        for state in self.context.modified_states() {
            let kind = state.update_kind();
            let path = preimage::store_path(state);
            let lazy = match kind {
                UpdateKind::Increment => true,
                UpdateKind::Whole => !state.burned_only,
                UpdateKind::Decrement => false,
            };
            if lazy {
                fragments.push(Fragment::LazyInit(path.clone()));
            }
            fragments.push(Fragment::WritePreimage(PreimageWrite {
                state: state.name.clone(),
                kind,
                path,
                burned_only: state.burned_only,
            }));
        }

        fragments.push(Fragment::PersistStore);
        fragments
    }

    fn membership_witness(&self) -> Vec<Fragment> {
        let ctx = self.context;
        let mut fragments = vec![Fragment::Heading(GenerationStage::MembershipWitness)];
        fragments.extend(ctx.states.iter().map(|state| {
            let mode = match state.update_kind() {
                UpdateKind::Increment => WitnessMode::Partitioned { decrement: false },
                UpdateKind::Decrement => WitnessMode::Partitioned { decrement: true },
                UpdateKind::Whole if state.accessed_only => WitnessMode::Accessed,
                UpdateKind::Whole => WitnessMode::Whole,
            };
            Fragment::MembershipWitness(Witness {
                state: state.name.clone(),
                contract: ctx.contract_name.clone(),
                mode,
            })
        }));
        fragments
    }

    fn calculate_nullifier(&self) -> Vec<Fragment> {
        let mut fragments = vec![Fragment::Heading(GenerationStage::CalculateNullifier)];
        fragments.extend(self.context.states.iter().filter(|state| state.nullifier_count() > 0).map(
            |state| {
                Fragment::Nullifier(NullifierCalc {
                    state: state.name.clone(),
                    kind: state.update_kind(),
                    accessed_only: state.accessed_only,
                })
            },
        ));
        fragments
    }

    fn calculate_commitment(&self) -> Vec<Fragment> {
        let mut fragments = vec![Fragment::Heading(GenerationStage::CalculateCommitment)];
        fragments.extend(
            self.context.states.iter().filter(|state| state.commitment_count() > 0).map(|state| {
                Fragment::Commitment(CommitmentCalc { state: state.name.clone(), kind: state.update_kind() })
            }),
        );
        fragments
    }

    fn generate_proof(&self) -> Vec<Fragment> {
        vec![
            Fragment::Heading(GenerationStage::GenerateProof),
            Fragment::ProofInputs(proof_inputs::build(self.context)),
            Fragment::GenerateProof { circuit: self.context.circuit_name.clone() },
            Fragment::FlattenProof,
        ]
    }

    fn send_transaction(&self) -> Vec<Fragment> {
        let ctx = self.context;
        vec![
            Fragment::Heading(GenerationStage::SendTransaction),
            Fragment::SendTransaction(TransactionCall {
                function: ctx.name.clone(),
                public_inputs: ctx.public_inputs.clone(),
                parameters: TransactionParameters::collect(&ctx.states),
            }),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shroud_runtime::{MappingKey, Operand, StateVariableDescriptor};

    fn amount() -> Operand {
        Operand::Identifier("amount".to_string())
    }

    fn mixed_context() -> FunctionContext {
        FunctionContext::new("transfer", "Token")
            .with_parameter("amount")
            .with_state(StateVariableDescriptor::whole("rate", 1).accessed_only())
            .with_state(
                StateVariableDescriptor::partitioned("balances_msg", 2)
                    .mapped("balances", MappingKey::Sender)
                    .with_operand(amount())
                    .decrement(),
            )
            .with_state(StateVariableDescriptor::partitioned("supply", 3).with_operand(amount()))
    }

    #[test]
    fn test_stage_parsing() {
        assert_eq!("read_preimage".parse::<GenerationStage>().unwrap(), GenerationStage::ReadPreimage);
        assert_eq!("ReadPreimage".parse::<GenerationStage>().unwrap(), GenerationStage::ReadPreimage);
        assert!(matches!(
            "CompileCircuit".parse::<GenerationStage>(),
            Err(CompilerError::UnknownStage(name)) if name == "CompileCircuit"
        ));
    }

    #[test]
    fn test_stage_display_round_trips() {
        for stage in GenerationStage::ALL {
            assert_eq!(stage.to_string().parse::<GenerationStage>().unwrap(), stage);
        }
    }

    #[test]
    fn test_signature_overrides() {
        let context = mixed_context();
        let synthesizer = Synthesizer::new(&context).unwrap();
        let signature = synthesizer.signature();

        assert_eq!(signature.open.parameters, vec!["amount"]);
        assert_eq!(
            signature.open.overrides,
            vec![
                "_balances_msg_newOwnerPublicKey",
                "_supply_newOwnerPublicKey",
                "_balances_msg_0_oldCommitment",
                "_balances_msg_1_oldCommitment",
            ]
        );
    }

    #[test]
    fn test_accessed_bindings_precede_reads() {
        let context = mixed_context();
        let fragments = Synthesizer::new(&context).unwrap().stage(GenerationStage::ReadPreimage);

        assert!(matches!(&fragments[1], Fragment::AccessedBinding { state } if state == "rate"));
        assert_eq!(fragments.iter().filter(|f| matches!(f, Fragment::ReadPreimage(_))).count(), 3);
    }

    #[test]
    fn test_write_preimage_wrapping() {
        let context = mixed_context();
        let fragments = Synthesizer::new(&context).unwrap().stage(GenerationStage::WritePreimage);

        assert_eq!(fragments[1], Fragment::LoadStore);
        assert_eq!(fragments.last(), Some(&Fragment::PersistStore));
        let lazy = fragments.iter().filter(|f| matches!(f, Fragment::LazyInit(_))).count();
        let writes = fragments.iter().filter(|f| matches!(f, Fragment::WritePreimage(_))).count();
        assert_eq!(lazy, 1);
        assert_eq!(writes, 2);
    }

    #[test]
    fn test_witness_modes() {
        let context = mixed_context();
        let modes: Vec<WitnessMode> = Synthesizer::new(&context)
            .unwrap()
            .stage(GenerationStage::MembershipWitness)
            .into_iter()
            .filter_map(|fragment| match fragment {
                Fragment::MembershipWitness(witness) => Some(witness.mode),
                _ => None,
            })
            .collect();

        assert_eq!(
            modes,
            vec![
                WitnessMode::Accessed,
                WitnessMode::Partitioned { decrement: true },
                WitnessMode::Partitioned { decrement: false },
            ]
        );
    }

    #[test]
    fn test_invalid_context_rejected() {
        let context = FunctionContext::new("f", "C")
            .with_state(StateVariableDescriptor::whole("x", 1))
            .with_state(StateVariableDescriptor::whole("x", 2));
        assert!(matches!(Synthesizer::new(&context), Err(CompilerError::RuntimeError(_))));
    }
}
