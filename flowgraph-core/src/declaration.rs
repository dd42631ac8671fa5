//! # Flowgraph declaration
//!
//! The serializable plan a user composes: a name, a description, the ordered
//! steps of its execution flow and the variable it returns.

use crate::step::{Step, StepList};
use crate::value::VariableRef;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Blueprint every flowgraph declaration is built from
pub const FLOWGRAPH_BLUEPRINT: &str = "_blueprint.Flowgraph";

fn default_blueprint() -> String {
    FLOWGRAPH_BLUEPRINT.to_string()
}

/// A named, described plan of steps plus a return reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowgraphDeclaration {
    define: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_blueprint")]
    blueprint: String,
    #[serde(rename = "executionFlow", default)]
    execution_flow: ExecutionFlow,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ExecutionFlow {
    #[serde(default)]
    execute: StepList,
    #[serde(rename = "return", default, with = "return_identifier")]
    return_identifier: Option<VariableRef>,
}

/// `return` is written as `""` when no variable has been chosen yet
mod return_identifier {
    use crate::value::VariableRef;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<VariableRef>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.as_ref().map_or("", VariableRef::as_str))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<VariableRef>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(super::return_ref(&raw))
    }
}

fn return_ref(raw: &str) -> Option<VariableRef> {
    let raw = raw.trim();
    if raw.is_empty() || raw == crate::value::VARIABLE_PREFIX {
        None
    } else {
        Some(VariableRef::variable(raw))
    }
}

/// Top-level field addressed by `DeclarationBuilder::set_field`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationField {
    Define,
    Description,
    /// Bare or prefixed variable name; empty clears it
    ReturnIdentifier,
}

impl FlowgraphDeclaration {
    pub fn new(define: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            define: define.into(),
            description: description.into(),
            blueprint: default_blueprint(),
            execution_flow: ExecutionFlow::default(),
        }
    }

    pub fn define(&self) -> &str {
        &self.define
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn blueprint(&self) -> &str {
        &self.blueprint
    }

    /// Top-level steps in execution order
    pub fn steps(&self) -> &[Arc<Step>] {
        &self.execution_flow.execute
    }

    pub fn return_identifier(&self) -> Option<&VariableRef> {
        self.execution_flow.return_identifier.as_ref()
    }

    pub(crate) fn with_field(&self, field: DeclarationField, value: &str) -> Self {
        let mut next = Self {
            define: self.define.clone(),
            description: self.description.clone(),
            blueprint: self.blueprint.clone(),
            execution_flow: self.execution_flow.clone(),
        };
        match field {
            DeclarationField::Define => next.define = value.to_string(),
            DeclarationField::Description => next.description = value.to_string(),
            DeclarationField::ReturnIdentifier => {
                next.execution_flow.return_identifier = return_ref(value)
            }
        }
        next
    }

    pub(crate) fn with_steps(&self, steps: StepList) -> Self {
        Self {
            define: self.define.clone(),
            description: self.description.clone(),
            blueprint: self.blueprint.clone(),
            execution_flow: ExecutionFlow {
                execute: steps,
                return_identifier: self.execution_flow.return_identifier.clone(),
            },
        }
    }

    /// Every variable name declared anywhere in the plan, in document order
    pub fn declared_names(&self) -> Vec<&str> {
        self.steps()
            .iter()
            .flat_map(|step| step.declared_names())
            .collect()
    }

    /// Total number of steps, nested ones included
    pub fn step_count(&self) -> usize {
        fn count(steps: &[Arc<Step>]) -> usize {
            steps
                .iter()
                .map(|step| 1 + step.blocks().into_iter().map(count).sum::<usize>())
                .sum()
        }
        count(self.steps())
    }

    /// Non-fatal issues a plan may carry while it is being composed
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut known: HashSet<&str> = self.declared_names().into_iter().collect();
        for step in self.steps() {
            known.extend(subtree_bound_names(step));
        }

        let mut diagnostics = Vec::new();
        let mut declared: HashSet<&str> = HashSet::new();
        for name in self.declared_names() {
            let diagnostic = if name.trim().is_empty() {
                Diagnostic::EmptyVariableName
            } else if !declared.insert(name) {
                Diagnostic::DuplicateVariable(name.to_string())
            } else {
                continue;
            };
            if !diagnostics.contains(&diagnostic) {
                diagnostics.push(diagnostic);
            }
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for (index, step) in self.steps().iter().enumerate() {
            seen.extend(step.declared_names());
            seen.extend(subtree_bound_names(step));
            for reference in subtree_references(step) {
                if reference.is_internal() || seen.contains(reference.name()) {
                    continue;
                }
                let diagnostic = if known.contains(reference.name()) {
                    Diagnostic::UsedBeforeDeclared { index, reference }
                } else {
                    Diagnostic::UndeclaredReference { index, reference }
                };
                if !diagnostics.contains(&diagnostic) {
                    diagnostics.push(diagnostic);
                }
            }
        }

        if let Some(reference) = self.return_identifier() {
            if !reference.is_internal() && !known.contains(reference.name()) {
                diagnostics.push(Diagnostic::ReturnNotDeclared(reference.clone()));
            }
        }
        diagnostics
    }

    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn subtree_references(step: &Step) -> Vec<crate::value::VariableRef> {
    let mut references = step.references();
    for block in step.blocks() {
        references.extend(block.iter().flat_map(|nested| subtree_references(nested)));
    }
    references
}

fn subtree_bound_names(step: &Step) -> Vec<&str> {
    let mut names = step.bound_names();
    for block in step.blocks() {
        names.extend(block.iter().flat_map(|nested| subtree_bound_names(nested)));
    }
    names
}

/// An issue `FlowgraphDeclaration::diagnostics` reports without blocking edits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A declaration loaded with an empty variable name
    EmptyVariableName,
    /// A variable name declared more than once
    DuplicateVariable(String),
    /// The return identifier names no declared variable
    ReturnNotDeclared(VariableRef),
    /// Top-level step `index` references a variable declared nowhere
    UndeclaredReference { index: usize, reference: VariableRef },
    /// Top-level step `index` references a variable declared only further down
    UsedBeforeDeclared { index: usize, reference: VariableRef },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::EmptyVariableName => f.write_str("a variable is declared without a name"),
            Diagnostic::DuplicateVariable(name) => {
                write!(f, "variable `{name}` is declared more than once")
            }
            Diagnostic::ReturnNotDeclared(reference) => {
                write!(f, "return identifier {reference} is not declared")
            }
            Diagnostic::UndeclaredReference { index, reference } => {
                write!(f, "step {index}: {reference} is not declared")
            }
            Diagnostic::UsedBeforeDeclared { index, reference } => {
                write!(f, "step {index}: {reference} is used before it is declared")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::FunctionCall;
    use serde_json::json;

    fn counter_json() -> serde_json::Value {
        json!({
            "define": "Counter",
            "description": "Counts to ten",
            "blueprint": "_blueprint.Flowgraph",
            "executionFlow": {
                "execute": [
                    { "declare": "index", "type": "_types.Number", "value": 0 },
                    {
                        "control": "_controls.Loop.While",
                        "condition": {
                            "call": "_functions.Math.LessThan",
                            "arguments": { "a": "$$variables.index", "b": 10 }
                        },
                        "execute": [
                            {
                                "call": "_functions.Math.Add",
                                "arguments": { "numbers": ["$$variables.index", 1] },
                                "set": "$$variables.index"
                            }
                        ]
                    }
                ],
                "return": "$$variables.index"
            }
        })
    }

    #[test]
    fn test_counter_round_trip() {
        let declaration: FlowgraphDeclaration =
            serde_json::from_value(counter_json()).unwrap();
        assert_eq!(declaration.define(), "Counter");
        assert_eq!(declaration.steps().len(), 2);
        assert_eq!(declaration.step_count(), 3);
        assert_eq!(
            declaration.return_identifier(),
            Some(&VariableRef::variable("index"))
        );
        assert!(declaration.diagnostics().is_empty());
        assert_eq!(declaration.to_json_value().unwrap(), counter_json());
    }

    #[test]
    fn test_empty_return_is_written_as_empty_string() {
        let declaration = FlowgraphDeclaration::new("Empty", "");
        let wire = declaration.to_json_value().unwrap();
        assert_eq!(wire["executionFlow"]["return"], json!(""));
        assert_eq!(wire["blueprint"], json!(FLOWGRAPH_BLUEPRINT));

        let parsed = FlowgraphDeclaration::from_json_str(&wire.to_string()).unwrap();
        assert_eq!(parsed.return_identifier(), None);
    }

    #[test]
    fn test_set_return_stores_reference_form() {
        let declaration = FlowgraphDeclaration::new("Flag", "")
            .with_field(DeclarationField::ReturnIdentifier, "flag");
        assert_eq!(
            declaration.return_identifier().map(VariableRef::as_str),
            Some("$$variables.flag")
        );
    }

    #[test]
    fn test_diagnostics() {
        let declaration = FlowgraphDeclaration::new("Broken", "")
            .with_steps(vec![
                Arc::new(Step::from(
                    FunctionCall::new("_functions.Math.Add")
                        .argument("a", crate::value::Operand::reference("later"))
                        .argument("b", crate::value::Operand::reference("missing")),
                )),
                Arc::new(Step::declare("later", 1.0)),
            ])
            .with_field(DeclarationField::ReturnIdentifier, "result");

        let diagnostics = declaration.diagnostics();
        assert_eq!(
            diagnostics,
            vec![
                Diagnostic::UsedBeforeDeclared {
                    index: 0,
                    reference: VariableRef::variable("later"),
                },
                Diagnostic::UndeclaredReference {
                    index: 0,
                    reference: VariableRef::variable("missing"),
                },
                Diagnostic::ReturnNotDeclared(VariableRef::variable("result")),
            ]
        );
    }

    #[test]
    fn test_loaded_names_are_checked() {
        let declaration: FlowgraphDeclaration = serde_json::from_value(json!({
            "define": "Loaded",
            "description": "",
            "blueprint": "_blueprint.Flowgraph",
            "executionFlow": {
                "execute": [
                    { "declare": "a", "type": "_types.Number", "value": 1 },
                    { "declare": "a", "type": "_types.Number", "value": 2 },
                    { "declare": "", "type": "_types.String", "value": "" }
                ],
                "return": ""
            }
        }))
        .unwrap();

        assert_eq!(declaration.declared_names(), vec!["a", "a", ""]);
        assert_eq!(
            declaration.diagnostics(),
            vec![
                Diagnostic::DuplicateVariable("a".into()),
                Diagnostic::EmptyVariableName,
            ]
        );
    }
}
