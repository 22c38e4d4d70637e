//! Shroud Runtime
//!
//! Shared data model and error handling for the Shroud toolkit. The types here form the
//! contract between the upstream classification pass and the orchestration synthesizer.

pub mod error;
pub mod types;

// Re-export core types for convenience
pub use error::{Result, ShroudError};
pub use types::{
    FunctionContext, Mapping, MappingKey, MappingOwnership, Operand, Ownership, ReturnValue,
    StateVariableDescriptor, StorageKind, UpdateKind, SENDER_PARAMETER,
};

#[cfg(test)]
mod tests {
    use super::*;

    fn amount() -> Operand {
        Operand::Identifier("amount".to_string())
    }

    #[test]
    fn test_whole_counts() {
        let plain = StateVariableDescriptor::whole("admin", 1);
        assert_eq!((plain.nullifier_count(), plain.commitment_count()), (1, 1));

        let accessed = StateVariableDescriptor::whole("admin", 1).accessed_only();
        assert_eq!((accessed.nullifier_count(), accessed.commitment_count()), (1, 0));

        let reinit = StateVariableDescriptor::whole("admin", 1).reinitialised_only();
        assert_eq!((reinit.nullifier_count(), reinit.commitment_count()), (0, 1));

        let burned = StateVariableDescriptor::whole("admin", 1).burned_only();
        assert_eq!((burned.nullifier_count(), burned.commitment_count()), (1, 0));
    }

    #[test]
    fn test_partitioned_counts() {
        let inc = StateVariableDescriptor::partitioned("balance", 2).with_operand(amount());
        assert_eq!(inc.update_kind(), UpdateKind::Increment);
        assert_eq!((inc.nullifier_count(), inc.commitment_count()), (0, 1));
        assert!(!inc.needs_root());

        let dec = inc.clone().decrement();
        assert_eq!(dec.update_kind(), UpdateKind::Decrement);
        assert_eq!((dec.nullifier_count(), dec.commitment_count()), (2, 1));
        assert!(dec.needs_root());
    }

    #[test]
    fn test_mapping_name_fallback() {
        let plain = StateVariableDescriptor::whole("owner", 1);
        assert_eq!(plain.mapping_name(), "owner");

        let keyed = StateVariableDescriptor::whole("votes_msg", 1).mapped("votes", MappingKey::Sender);
        assert_eq!(keyed.mapping_name(), "votes");
    }

    #[test]
    fn test_validate_rejects_exclusive_flags() {
        let state = StateVariableDescriptor::whole("x", 1).accessed_only().burned_only();
        let err = state.validate().unwrap_err();
        assert!(err.to_string().contains("mutually exclusive"));
    }

    #[test]
    fn test_validate_rejects_flags_on_partitioned() {
        let state = StateVariableDescriptor::partitioned("x", 1).with_operand(amount()).burned_only();
        assert!(state.validate().is_err());
    }

    #[test]
    fn test_validate_requires_operands_on_partitioned() {
        let state = StateVariableDescriptor::partitioned("x", 1);
        assert!(state.validate().is_err());
    }

    #[test]
    fn test_context_rejects_duplicate_states() {
        let context = FunctionContext::new("f", "C")
            .with_state(StateVariableDescriptor::whole("x", 1))
            .with_state(StateVariableDescriptor::whole("x", 2));
        let err = context.validate().unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_context_rejects_undeclared_mapping_key() {
        let context = FunctionContext::new("f", "C").with_state(
            StateVariableDescriptor::whole("x_user", 1)
                .mapped("x", MappingKey::Parameter("user".to_string())),
        );
        assert!(context.validate().is_err());

        let fixed = context.clone().with_parameter("user");
        assert!(fixed.validate().is_ok());
    }

    #[test]
    fn test_decremented_states_preserve_order() {
        let context = FunctionContext::new("f", "C")
            .with_state(StateVariableDescriptor::partitioned("b", 1).with_operand(amount()).decrement())
            .with_state(StateVariableDescriptor::whole("w", 2))
            .with_state(StateVariableDescriptor::partitioned("a", 3).with_operand(amount()).decrement());

        let names: Vec<&str> = context.decremented_states().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
