//! Compiler error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompilerError {
    #[error(
        "Cannot name contract/function/struct/enum/variables as decorators. \
         Please rename '{text}' at index {offset} to a non-decorator name"
    )]
    ReservedKeyword { text: String, offset: usize },

    #[error("Unknown decorator: {0}")]
    InvalidDecorator(String),

    #[error("Unknown generation stage: {0}")]
    UnknownStage(String),

    #[error("Invalid input path: {0}")]
    InvalidPath(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid keyword pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error(transparent)]
    RuntimeError(#[from] shroud_runtime::ShroudError),
}

pub type Result<T> = std::result::Result<T, CompilerError>;
