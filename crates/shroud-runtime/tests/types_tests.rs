//! Integration tests for the classification data model in shroud-runtime

use shroud_runtime::{
    FunctionContext, MappingKey, MappingOwnership, Operand, Ownership, StateVariableDescriptor,
    StorageKind, UpdateKind,
};

// ============================================================================
// JSON CONTRACT TESTS
// ============================================================================

#[test]
fn test_function_context_from_json() {
    let json = r#"{
        "name": "transfer",
        "contract_name": "Token",
        "parameters": ["recipient", "amount"],
        "uses_sender": true,
        "circuit_name": "transfer",
        "states": [
            {
                "name": "balances_msg",
                "slot_id": 3,
                "kind": "partitioned",
                "nullifier_required": true,
                "mapping": { "name": "balances", "key": "sender" },
                "owner": { "kind": "sender", "mode": "key" },
                "operands": [{ "identifier": "amount" }]
            },
            {
                "name": "balances_recipient",
                "slot_id": 3,
                "kind": "partitioned",
                "mapping": { "name": "balances", "key": { "parameter": "recipient" } },
                "owner": { "kind": "named", "identifier": "recipient", "parameter": true },
                "operands": [{ "identifier": "amount" }]
            }
        ]
    }"#;

    let context = FunctionContext::from_json(json).expect("Context should parse");
    assert!(context.validate().is_ok());

    assert_eq!(context.states.len(), 2);
    assert_eq!(context.states[0].name, "balances_msg");
    assert_eq!(context.states[0].update_kind(), UpdateKind::Decrement);
    assert_eq!(context.states[0].mapping_key(), Some(&MappingKey::Sender));
    assert_eq!(context.states[0].owner, Ownership::Sender { mode: Some(MappingOwnership::Key) });

    assert_eq!(context.states[1].update_kind(), UpdateKind::Increment);
    assert_eq!(
        context.states[1].mapping_key(),
        Some(&MappingKey::Parameter("recipient".to_string()))
    );
    assert!(!context.key_registry);
    assert!(context.public_inputs.is_empty());
}

#[test]
fn test_state_flags_default_to_false() {
    let json = r#"{ "name": "admin", "slot_id": 1, "kind": "whole" }"#;
    let state: StateVariableDescriptor = serde_json::from_str(json).unwrap();

    assert_eq!(state.kind, StorageKind::Whole);
    assert!(!state.accessed_only);
    assert!(!state.reinitialised_only);
    assert!(!state.burned_only);
    assert!(state.mapping.is_none());
    assert_eq!(state.owner, Ownership::Unowned);
}

#[test]
fn test_context_json_preserves_declaration_order() {
    let context = FunctionContext::new("f", "C")
        .with_state(StateVariableDescriptor::whole("zeta", 9))
        .with_state(StateVariableDescriptor::whole("alpha", 1))
        .with_state(StateVariableDescriptor::whole("mid", 5));

    let json = serde_json::to_string(&context).unwrap();
    let parsed = FunctionContext::from_json(&json).unwrap();

    let names: Vec<&str> = parsed.states.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["zeta", "alpha", "mid"]);
}

#[test]
fn test_malformed_json_is_serialization_error() {
    let result = FunctionContext::from_json("{ not json");
    let error = result.unwrap_err();
    assert!(error.to_string().contains("Serialization error"));
}

// ============================================================================
// CLASSIFICATION TESTS
// ============================================================================

#[test]
fn test_operand_identifier() {
    assert_eq!(Operand::Identifier("amount".to_string()).identifier(), Some("amount"));
    assert_eq!(Operand::Literal("10".to_string()).identifier(), None);
}

#[test]
fn test_modified_states_skip_accessed() {
    let context = FunctionContext::new("f", "C")
        .with_state(StateVariableDescriptor::whole("read", 1).accessed_only())
        .with_state(StateVariableDescriptor::whole("written", 2));

    let modified: Vec<&str> = context.modified_states().map(|s| s.name.as_str()).collect();
    assert_eq!(modified, vec!["written"]);
}

#[test]
fn test_named_parameter_owner_must_be_declared() {
    let owner = Ownership::Named { identifier: "to".to_string(), secret: false, parameter: true };
    let context = FunctionContext::new("give", "C")
        .with_state(StateVariableDescriptor::whole("prize", 4).owned_by(owner));

    let error = context.validate().unwrap_err();
    assert!(error.to_string().contains("prize"));
    assert!(context.with_parameter("to").validate().is_ok());
}

#[test]
fn test_reinitialised_whole_needs_no_root() {
    let state = StateVariableDescriptor::whole("x", 1).reinitialised_only();
    assert!(!state.needs_root());
    assert!(StateVariableDescriptor::whole("x", 1).accessed_only().needs_root());
}

#[test]
fn test_whole_state_accepts_operands() {
    let context = FunctionContext::new("deposit", "Bank").with_parameter("amount").with_state(
        StateVariableDescriptor::whole("balance", 3)
            .owned_by(Ownership::Sender { mode: None })
            .with_operand(Operand::Identifier("amount".to_string())),
    );

    assert!(context.validate().is_ok());
    assert_eq!(context.states[0].update_kind(), UpdateKind::Whole);
}
