//! # Function definitions
//!
//! One catalog entry: a dot-qualified function with its parameters and the
//! recorded test cases that double as usage examples.

use crate::error::CatalogError;
use crate::examples::create_examples;
use flowgraph_core::{DataType, TypedValue};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Declared type and optional default of a parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataEntry {
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl DataEntry {
    /// Scalar type of this entry, when it is one the editor knows
    pub fn scalar_type(&self) -> Option<DataType> {
        self.data_type.parse().ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionTest {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub input: Map<String, Value>,
    #[serde(default)]
    pub expected: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Fully-qualified name, `_functions.<Category>.<Name>`
    pub define: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blueprint: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: IndexMap<String, DataEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation: Option<Value>,
    #[serde(default)]
    pub tests: IndexMap<String, FunctionTest>,
}

impl FunctionDefinition {
    pub fn new(define: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            define: define.into(),
            blueprint: None,
            description: description.into(),
            parameters: IndexMap::new(),
            returns: None,
            implementation: None,
            tests: IndexMap::new(),
        }
    }

    /// Adds a parameter
    pub fn parameter(mut self, name: impl Into<String>, entry: DataEntry) -> Self {
        self.parameters.insert(name.into(), entry);
        self
    }

    /// Adds a recorded test case
    pub fn test(mut self, id: impl Into<String>, test: FunctionTest) -> Self {
        self.tests.insert(id.into(), test);
        self
    }

    /// Last dot-delimited segment of `define`
    pub fn bare_name(&self) -> &str {
        self.define.rsplit('.').next().unwrap_or(&self.define)
    }

    /// Second dot-delimited segment of `define`
    pub fn category(&self) -> Option<&str> {
        self.define.split('.').nth(1)
    }

    /// `Name(args) => expected` strings for every recorded test
    pub fn examples(&self) -> Vec<String> {
        create_examples(self.bare_name(), Some(&self.tests))
    }

    /// Turns raw form input into call arguments. Scalar parameters are
    /// coerced to their declared type; other types accept JSON and fall back
    /// to the raw string. Missing inputs take the parameter default.
    pub fn parse_arguments(
        &self,
        raw: &IndexMap<String, String>,
    ) -> Result<Map<String, Value>, CatalogError> {
        let mut arguments = Map::new();
        for (name, entry) in &self.parameters {
            let value = match raw.get(name) {
                Some(input) => match entry.scalar_type() {
                    Some(data_type) => TypedValue::from_input(data_type, input)
                        .map(|typed| typed.to_json())
                        .map_err(|source| CatalogError::InvalidArgument {
                            parameter: name.clone(),
                            source,
                        })?,
                    None => serde_json::from_str(input)
                        .unwrap_or_else(|_| Value::String(input.clone())),
                },
                None => match &entry.default {
                    Some(default) => default.clone(),
                    None => continue,
                },
            };
            arguments.insert(name.clone(), value);
        }
        Ok(arguments)
    }
}
