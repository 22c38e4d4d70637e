//! Shroud Orchestration Demo
//!
//! Walks a private token transfer through the toolchain:
//! 1. Strip decorators from the annotated contract
//! 2. Classify the `transfer` function's private states
//! 3. Inspect the transaction parameters
//! 4. Render the orchestration routine

use shroud_compiler::{
    strip_decorators, FunctionContext, JavaScriptTemplates, StateVariableDescriptor, Synthesizer,
    TransactionParameters,
};
use shroud_runtime::{MappingKey, Operand, Ownership};

fn main() {
    println!("\n=== Shroud Orchestration Demo ===\n");

    let contract = r#"
        contract Token {
            secret mapping(address => uint256) public balances;

            function transfer(secret address recipient, secret uint256 amount) public {
                balances[msg.sender] -= amount;
                balances[recipient] += amount;
            }
        }
    "#;

    println!("STEP 1: Strip decorators");
    println!("────────────────────────");
    let stripped = strip_decorators(contract).expect("Failed to strip decorators");
    println!("{}", stripped.text.replace("\r\n", "\n"));
    for record in &stripped.redecorations {
        println!("  - '{}' at offset {}", record.decorator, record.offset);
    }
    println!();

    println!("STEP 2: Classify transfer()");
    println!("───────────────────────────");
    let amount = Operand::Identifier("amount".to_string());
    let context = FunctionContext::new("transfer", "Token")
        .with_parameter("recipient")
        .with_parameter("amount")
        .with_sender()
        .with_state(
            StateVariableDescriptor::partitioned("balances_msg", 1)
                .mapped("balances", MappingKey::Sender)
                .owned_by(Ownership::Sender { mode: None })
                .with_operand(amount.clone())
                .decrement(),
        )
        .with_state(
            StateVariableDescriptor::partitioned("balances_recipient", 1)
                .mapped("balances", MappingKey::Parameter("recipient".to_string()))
                .owned_by(Ownership::Named {
                    identifier: "recipient".to_string(),
                    secret: true,
                    parameter: true,
                })
                .with_operand(amount),
        );
    for state in &context.states {
        println!(
            "  {} : {:?} ({} nullifier(s), {} commitment(s))",
            state.name,
            state.update_kind(),
            state.nullifier_count(),
            state.commitment_count()
        );
    }
    println!();

    println!("STEP 3: Transaction parameters");
    println!("──────────────────────────────");
    let params = TransactionParameters::collect(&context.states);
    println!("  Nullifiers:  {:?}", params.nullifiers);
    println!("  Root:        {:?}", params.root());
    println!("  Commitments: {:?}", params.commitments);
    println!();

    println!("STEP 4: Render orchestration");
    println!("────────────────────────────");
    let synthesizer = Synthesizer::new(&context).expect("Invalid classification");
    println!("{}", synthesizer.render(&JavaScriptTemplates::default()));

    println!("\n=== Demo complete ===");
}
