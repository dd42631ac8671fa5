//! # Flowgraph Core
//!
//! Step model, flowgraph declarations and the immutable declaration builder.

#![cfg_attr(docsrs, feature(doc_cfg))]

mod builder;
mod declaration;
mod error;
mod step;
mod value;

#[cfg(test)]
mod tests;

pub use builder::{BlockPath, DeclarationBuilder};
pub use declaration::{
    DeclarationField, Diagnostic, FlowgraphDeclaration, FLOWGRAPH_BLUEPRINT,
};
pub use error::{BuilderError, ValueError};
pub use step::{
    Block, Branch, ForEachLoop, FunctionCall, OverRangeLoop, Step, StepKind,
    StepList, VariableAssignment, VariableDeclaration, WhileLoop,
};
pub use value::{
    normalize_numbers, DataType, Expression, Operand, TypedValue, VariableRef,
    VARIABLE_PREFIX,
};

/// Prelude module for core functionality
pub mod prelude {
    pub use crate::{
        Block, BlockPath, BuilderError, DataType, DeclarationBuilder,
        DeclarationField, Expression, FlowgraphDeclaration, FunctionCall,
        Operand, Step, StepKind, TypedValue, VariableDeclaration, VariableRef,
    };
}
