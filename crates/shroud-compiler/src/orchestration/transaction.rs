//! Transaction-argument packing

use shroud_runtime::{StateVariableDescriptor, UpdateKind};

/// Values the verifier contract receives besides the public inputs and the proof.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionParameters {
    pub roots: Vec<String>,
    pub nullifiers: Vec<String>,
    pub commitments: Vec<String>,
    /// Nullifiers checked for existence but not consumed
    pub accessed_nullifiers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionArgument {
    Scalar(String),
    Array(Vec<String>),
    Proof,
}

impl TransactionParameters {
    pub fn collect(states: &[StateVariableDescriptor]) -> Self {
        let mut params = Self::default();

        for state in states {
            let name = &state.name;
            match state.update_kind() {
                UpdateKind::Decrement => {
                    params.roots.push(format!("{}_root", name));
                    params.nullifiers.push(format!("{}_0_nullifier", name));
                    params.nullifiers.push(format!("{}_1_nullifier", name));
                    params.commitments.push(format!("{}_2_newCommitment", name));
                }
                UpdateKind::Increment => {
                    params.commitments.push(format!("{}_newCommitment", name));
                }
                UpdateKind::Whole => {
                    params.roots.push(format!("{}_root", name));
                    if state.accessed_only {
                        params.accessed_nullifiers.push(format!("{}_nullifier", name));
                        continue;
                    }
                    if !state.reinitialised_only {
                        params.nullifiers.push(format!("{}_nullifier", name));
                    }
                    if !state.burned_only {
                        params.commitments.push(format!("{}_newCommitment", name));
                    }
                }
            }
        }

        params
    }

    /// The single root sent with the transaction.
    // TODO: states backed by distinct commitment trees would each need their own root here.
    pub fn root(&self) -> Option<&str> {
        self.roots.first().map(String::as_str)
    }

    /// Positional call arguments; empty collections are left out.
    pub fn arguments(&self, public_inputs: &[String]) -> Vec<TransactionArgument> {
        let mut args: Vec<TransactionArgument> =
            public_inputs.iter().cloned().map(TransactionArgument::Scalar).collect();

        if !self.nullifiers.is_empty() {
            args.push(TransactionArgument::Array(self.nullifiers.clone()));
        }
        if let Some(root) = self.root() {
            args.push(TransactionArgument::Scalar(root.to_string()));
        }
        if !self.commitments.is_empty() {
            args.push(TransactionArgument::Array(self.commitments.clone()));
        }
        if !self.accessed_nullifiers.is_empty() {
            args.push(TransactionArgument::Array(self.accessed_nullifiers.clone()));
        }
        args.push(TransactionArgument::Proof);

        args
    }
}
