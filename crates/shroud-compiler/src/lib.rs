//! Shroud Compiler
//!
//! Strips privacy decorators from annotated contract source and synthesizes the off-chain
//! orchestration code that drives the commitment/nullifier protocol for each function.

pub mod error;
pub mod lexer;
pub mod orchestration;

pub use error::{CompilerError, Result};
pub use lexer::{
    normalize, redecorate, strip_decorators, strip_file, Decorator, DecoratorLexer, Redecoration,
    StripOptions, StrippedFile, StrippedSource,
};
pub use orchestration::{
    Fragment, GenerationStage, JavaScriptTemplates, Signature, Synthesizer, TemplateConfig,
    TemplateProvider, TransactionParameters,
};

// Re-export runtime types for convenience
pub use shroud_runtime::{FunctionContext, StateVariableDescriptor};
