//! # Errors
//!
//! Failures of declaration edits and literal coercion.

use crate::step::{Block, StepKind};
use crate::value::DataType;
use thiserror::Error;

/// A rejected declaration edit; the original declaration is left untouched
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuilderError {
    #[error("step index {index} out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("step {index} is a {found} step, expected {expected}")]
    StepTypeMismatch {
        index: usize,
        expected: StepKind,
        found: StepKind,
    },

    #[error("step {index} ({kind}) has no {block} block")]
    BlockNotFound {
        index: usize,
        kind: StepKind,
        block: Block,
    },

    #[error("variable name must not be empty")]
    EmptyVariableName,

    #[error("variable `{0}` is already declared")]
    DuplicateVariable(String),

    #[error(transparent)]
    Value(#[from] ValueError),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    #[error("`{input}` is not a valid {data_type} literal")]
    InvalidLiteral { data_type: DataType, input: String },

    #[error("unknown data type `{0}`")]
    UnknownDataType(String),

    #[error("expected a {expected} literal, found {found}")]
    TypeMismatch {
        expected: DataType,
        found: serde_json::Value,
    },
}
