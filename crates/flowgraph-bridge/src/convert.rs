// SPDX-License-Identifier: Apache-2.0

//! Conversions from editor declarations and catalog functions to the
//! executable form an engine consumes.

use crate::contract::{Dialect, ExecutableFlowgraph};
use crate::error::ConvertError;
use flowgraph_catalog::{FunctionCatalog, FunctionDefinition};
use flowgraph_core::{FlowgraphDeclaration, FLOWGRAPH_BLUEPRINT};
use indexmap::IndexMap;
use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Definitions bundled with the executable
    pub functions: Vec<FunctionDefinition>,
    /// Refuse declarations whose diagnostics are not empty
    pub strict: bool,
}

impl ConvertOptions {
    pub fn with_functions(mut self, functions: impl IntoIterator<Item = FunctionDefinition>) -> Self {
        self.functions.extend(functions);
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    fn bundled(&self) -> Result<Vec<Value>, ConvertError> {
        self.functions
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<_, _>>()
            .map_err(ConvertError::from)
    }
}

/// Turns a source definition into an engine-consumable executable
pub trait DeclarationConverter {
    type Source;

    fn convert(
        &self,
        dialect: Dialect,
        source: &Self::Source,
        options: &ConvertOptions,
    ) -> Result<ExecutableFlowgraph, ConvertError>;
}

/// Converts an editor declaration by carrying its execution flow over as is
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionFlowConverter;

impl DeclarationConverter for ExecutionFlowConverter {
    type Source = FlowgraphDeclaration;

    fn convert(
        &self,
        dialect: Dialect,
        declaration: &FlowgraphDeclaration,
        options: &ConvertOptions,
    ) -> Result<ExecutableFlowgraph, ConvertError> {
        if declaration.define().trim().is_empty() {
            return Err(ConvertError::EmptyName);
        }
        if options.strict {
            let issues: Vec<String> = declaration
                .diagnostics()
                .iter()
                .map(ToString::to_string)
                .collect();
            if !issues.is_empty() {
                return Err(ConvertError::Rejected {
                    define: declaration.define().to_string(),
                    issues,
                });
            }
        }

        let execution_flow = match declaration.to_json_value()? {
            Value::Object(mut object) => object.remove("executionFlow").unwrap_or(Value::Null),
            _ => Value::Null,
        };
        tracing::debug!(
            define = %declaration.define(),
            %dialect,
            steps = declaration.step_count(),
            "declaration converted"
        );

        Ok(ExecutableFlowgraph {
            dialect,
            define: declaration.define().to_string(),
            blueprint: declaration.blueprint().to_string(),
            parameters: IndexMap::new(),
            execution_flow,
            functions: options.bundled()?,
        })
    }
}

/// Wraps a catalog function so it can run on its own
#[derive(Debug, Clone, Copy, Default)]
pub struct FunctionConverter;

impl DeclarationConverter for FunctionConverter {
    type Source = FunctionDefinition;

    fn convert(
        &self,
        dialect: Dialect,
        function: &FunctionDefinition,
        options: &ConvertOptions,
    ) -> Result<ExecutableFlowgraph, ConvertError> {
        FunctionCatalog::bare_name(&function.define)
            .map_err(|_| ConvertError::MalformedName(function.define.clone()))?;

        let parameters = function
            .parameters
            .iter()
            .map(|(name, entry)| serde_json::to_value(entry).map(|value| (name.clone(), value)))
            .collect::<Result<IndexMap<_, _>, _>>()?;

        tracing::debug!(define = %function.define, %dialect, "function converted");
        Ok(ExecutableFlowgraph {
            dialect,
            define: function.define.clone(),
            blueprint: function
                .blueprint
                .clone()
                .unwrap_or_else(|| FLOWGRAPH_BLUEPRINT.to_string()),
            parameters,
            execution_flow: function.implementation.clone().unwrap_or(Value::Null),
            functions: options.bundled()?,
        })
    }
}
