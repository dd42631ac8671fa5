//! # Steps
//!
//! The closed set of instructions a flowgraph plan is made of, and the wire
//! shape each one takes inside `executionFlow.execute`.

use crate::error::ValueError;
use crate::value::{DataType, Expression, Operand, TypedValue, VariableRef};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Ordered step sequence; untouched steps are shared between declaration versions
pub type StepList = Vec<Arc<Step>>;

/// Directive a step was created from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepKind {
    DeclareVariable,
    AssignVariable,
    CallFunction,
    Branch,
    ForEachLoop,
    OverRangeLoop,
    WhileLoop,
}

impl StepKind {
    pub const ALL: [StepKind; 7] = [
        StepKind::DeclareVariable,
        StepKind::AssignVariable,
        StepKind::CallFunction,
        StepKind::Branch,
        StepKind::ForEachLoop,
        StepKind::OverRangeLoop,
        StepKind::WhileLoop,
    ];

    /// Directive identifier, e.g. `declareVariable`
    pub fn identifier(&self) -> &'static str {
        match self {
            StepKind::DeclareVariable => "declareVariable",
            StepKind::AssignVariable => "assignVariable",
            StepKind::CallFunction => "callFunction",
            StepKind::Branch => "branch",
            StepKind::ForEachLoop => "forEachLoop",
            StepKind::OverRangeLoop => "overRangeLoop",
            StepKind::WhileLoop => "whileLoop",
        }
    }

    /// Human-readable label for step pickers
    pub fn label(&self) -> &'static str {
        match self {
            StepKind::DeclareVariable => "Declare variable",
            StepKind::AssignVariable => "Assign variable",
            StepKind::CallFunction => "Call function",
            StepKind::Branch => "Branch",
            StepKind::ForEachLoop => "For each loop",
            StepKind::OverRangeLoop => "Over range loop",
            StepKind::WhileLoop => "While loop",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

/// Nested step sequence of a control step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Block {
    Then,
    Else,
    Body,
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Block::Then => "then",
            Block::Else => "else",
            Block::Body => "execute",
        })
    }
}

/// `{ "declare": name, "type": ..., "value": ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDeclaration", into = "RawDeclaration")]
pub struct VariableDeclaration {
    pub name: String,
    pub value: TypedValue,
}

impl VariableDeclaration {
    pub fn new(name: impl Into<String>, value: impl Into<TypedValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn data_type(&self) -> DataType {
        self.value.data_type()
    }

    /// Switches the declared type, converting the literal when possible and
    /// falling back to the type's default otherwise
    pub fn with_type(&self, data_type: DataType) -> Self {
        let value = self
            .value
            .convert(data_type)
            .unwrap_or_else(|| TypedValue::default_for(data_type));
        Self {
            name: self.name.clone(),
            value,
        }
    }

    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: self.value.clone(),
        }
    }

    pub fn with_value(&self, value: impl Into<TypedValue>) -> Self {
        Self {
            name: self.name.clone(),
            value: value.into(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RawDeclaration {
    declare: String,
    #[serde(rename = "type")]
    data_type: DataType,
    value: serde_json::Value,
}

impl TryFrom<RawDeclaration> for VariableDeclaration {
    type Error = ValueError;

    fn try_from(raw: RawDeclaration) -> Result<Self, Self::Error> {
        Ok(Self {
            value: TypedValue::from_json(raw.data_type, &raw.value)?,
            name: raw.declare,
        })
    }
}

impl From<VariableDeclaration> for RawDeclaration {
    fn from(declaration: VariableDeclaration) -> Self {
        Self {
            data_type: declaration.data_type(),
            value: declaration.value.to_json(),
            declare: declaration.name,
        }
    }
}

/// `{ "assign": target, "value": expression }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableAssignment {
    #[serde(rename = "assign")]
    pub target: VariableRef,
    pub value: Expression,
}

/// `{ "call": function, "arguments": {...}, "set": target }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    #[serde(rename = "call")]
    pub function: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub arguments: IndexMap<String, Operand>,
    #[serde(rename = "set", default, skip_serializing_if = "Option::is_none")]
    pub result: Option<VariableRef>,
}

impl FunctionCall {
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            arguments: IndexMap::new(),
            result: None,
        }
    }

    /// Adds an argument
    pub fn argument(
        mut self,
        parameter: impl Into<String>,
        value: impl Into<Operand>,
    ) -> Self {
        self.arguments.insert(parameter.into(), value.into());
        self
    }

    /// Stores the call result into `target`
    pub fn set(mut self, target: VariableRef) -> Self {
        self.result = Some(target);
        self
    }

    pub fn references(&self) -> Vec<VariableRef> {
        self.arguments
            .values()
            .flat_map(Operand::references)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub condition: Expression,
    #[serde(rename = "then", default)]
    pub then_steps: StepList,
    #[serde(rename = "else", default, skip_serializing_if = "Option::is_none")]
    pub else_steps: Option<StepList>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForEachLoop {
    pub collection: Expression,
    #[serde(rename = "as")]
    pub element: String,
    #[serde(rename = "execute", default)]
    pub body: StepList,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverRangeLoop {
    pub from: Expression,
    pub to: Expression,
    pub index: String,
    #[serde(rename = "execute", default)]
    pub body: StepList,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhileLoop {
    pub condition: Expression,
    #[serde(rename = "execute", default)]
    pub body: StepList,
}

/// One instruction of a flowgraph plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireStep", into = "WireStep")]
pub enum Step {
    DeclareVariable(VariableDeclaration),
    AssignVariable(VariableAssignment),
    CallFunction(FunctionCall),
    Branch(Branch),
    ForEach(ForEachLoop),
    OverRange(OverRangeLoop),
    While(WhileLoop),
}

static NO_STEPS: StepList = Vec::new();

impl Step {
    pub fn kind(&self) -> StepKind {
        match self {
            Step::DeclareVariable(_) => StepKind::DeclareVariable,
            Step::AssignVariable(_) => StepKind::AssignVariable,
            Step::CallFunction(_) => StepKind::CallFunction,
            Step::Branch(_) => StepKind::Branch,
            Step::ForEach(_) => StepKind::ForEachLoop,
            Step::OverRange(_) => StepKind::OverRangeLoop,
            Step::While(_) => StepKind::WhileLoop,
        }
    }

    /// Blank step of `kind`, the starting state of a "new step" form.
    ///
    /// The `DeclareVariable` template has an empty name, so the builder
    /// refuses it with `EmptyVariableName` until the form sets one through
    /// [`VariableDeclaration::with_name`].
    pub fn template(kind: StepKind) -> Self {
        match kind {
            StepKind::DeclareVariable => Step::DeclareVariable(
                VariableDeclaration::new("", TypedValue::default_for(DataType::String)),
            ),
            StepKind::AssignVariable => Step::AssignVariable(VariableAssignment {
                target: VariableRef::variable(""),
                value: Expression::default(),
            }),
            StepKind::CallFunction => Step::CallFunction(FunctionCall::new("")),
            StepKind::Branch => Step::Branch(Branch {
                condition: Expression::default(),
                then_steps: Vec::new(),
                else_steps: None,
            }),
            StepKind::ForEachLoop => Step::ForEach(ForEachLoop {
                collection: Expression::default(),
                element: String::new(),
                body: Vec::new(),
            }),
            StepKind::OverRangeLoop => Step::OverRange(OverRangeLoop {
                from: Expression::literal(0),
                to: Expression::literal(0),
                index: String::new(),
                body: Vec::new(),
            }),
            StepKind::WhileLoop => Step::While(WhileLoop {
                condition: Expression::default(),
                body: Vec::new(),
            }),
        }
    }

    pub fn declare(name: impl Into<String>, value: impl Into<TypedValue>) -> Self {
        Step::DeclareVariable(VariableDeclaration::new(name, value))
    }

    pub fn assign(target: VariableRef, value: impl Into<Expression>) -> Self {
        Step::AssignVariable(VariableAssignment {
            target,
            value: value.into(),
        })
    }

    pub fn as_declaration(&self) -> Option<&VariableDeclaration> {
        match self {
            Step::DeclareVariable(declaration) => Some(declaration),
            _ => None,
        }
    }

    /// Nested sequence behind `block`; a missing `else` reads as empty
    pub fn block(&self, block: Block) -> Option<&[Arc<Step>]> {
        match (self, block) {
            (Step::Branch(b), Block::Then) => Some(b.then_steps.as_slice()),
            (Step::Branch(b), Block::Else) => {
                Some(b.else_steps.as_ref().unwrap_or(&NO_STEPS).as_slice())
            }
            (Step::ForEach(l), Block::Body) => Some(l.body.as_slice()),
            (Step::OverRange(l), Block::Body) => Some(l.body.as_slice()),
            (Step::While(l), Block::Body) => Some(l.body.as_slice()),
            _ => None,
        }
    }

    /// Copy of this step with `block` replaced; siblings stay shared
    pub fn with_block(&self, block: Block, steps: StepList) -> Option<Step> {
        let step = match (self, block) {
            (Step::Branch(b), Block::Then) => Step::Branch(Branch {
                then_steps: steps,
                ..b.clone()
            }),
            (Step::Branch(b), Block::Else) => Step::Branch(Branch {
                else_steps: Some(steps),
                ..b.clone()
            }),
            (Step::ForEach(l), Block::Body) => Step::ForEach(ForEachLoop {
                body: steps,
                ..l.clone()
            }),
            (Step::OverRange(l), Block::Body) => Step::OverRange(OverRangeLoop {
                body: steps,
                ..l.clone()
            }),
            (Step::While(l), Block::Body) => Step::While(WhileLoop {
                body: steps,
                ..l.clone()
            }),
            _ => return None,
        };
        Some(step)
    }

    /// Every nested sequence of this step, in wire order
    pub fn blocks(&self) -> Vec<&[Arc<Step>]> {
        match self {
            Step::Branch(b) => {
                let mut blocks = vec![b.then_steps.as_slice()];
                blocks.extend(b.else_steps.as_deref());
                blocks
            }
            Step::ForEach(l) => vec![l.body.as_slice()],
            Step::OverRange(l) => vec![l.body.as_slice()],
            Step::While(l) => vec![l.body.as_slice()],
            _ => Vec::new(),
        }
    }

    /// Names declared by this step and by any step nested in it
    pub fn declared_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> =
            self.as_declaration().map(|d| d.name.as_str()).into_iter().collect();
        for block in self.blocks() {
            names.extend(block.iter().flat_map(|step| step.declared_names()));
        }
        names
    }

    /// Names this step binds for its own body (loop element or index)
    pub fn bound_names(&self) -> Vec<&str> {
        match self {
            Step::ForEach(l) => vec![l.element.as_str()],
            Step::OverRange(l) => vec![l.index.as_str()],
            _ => Vec::new(),
        }
    }

    /// Variables read or written by this step itself, excluding nested blocks
    pub fn references(&self) -> Vec<VariableRef> {
        match self {
            Step::DeclareVariable(_) => Vec::new(),
            Step::AssignVariable(a) => {
                let mut refs = vec![a.target.clone()];
                refs.extend(a.value.references());
                refs
            }
            Step::CallFunction(c) => {
                let mut refs = c.references();
                refs.extend(c.result.clone());
                refs
            }
            Step::Branch(b) => b.condition.references(),
            Step::ForEach(l) => l.collection.references(),
            Step::OverRange(l) => {
                let mut refs = l.from.references();
                refs.extend(l.to.references());
                refs
            }
            Step::While(l) => l.condition.references(),
        }
    }
}

impl From<VariableDeclaration> for Step {
    fn from(declaration: VariableDeclaration) -> Self {
        Step::DeclareVariable(declaration)
    }
}

impl From<VariableAssignment> for Step {
    fn from(assignment: VariableAssignment) -> Self {
        Step::AssignVariable(assignment)
    }
}

impl From<FunctionCall> for Step {
    fn from(call: FunctionCall) -> Self {
        Step::CallFunction(call)
    }
}

impl From<Branch> for Step {
    fn from(branch: Branch) -> Self {
        Step::Branch(branch)
    }
}

impl From<ForEachLoop> for Step {
    fn from(l: ForEachLoop) -> Self {
        Step::ForEach(l)
    }
}

impl From<OverRangeLoop> for Step {
    fn from(l: OverRangeLoop) -> Self {
        Step::OverRange(l)
    }
}

impl From<WhileLoop> for Step {
    fn from(l: WhileLoop) -> Self {
        Step::While(l)
    }
}

/// Wire shape: plain steps are recognised by their key field, control steps
/// by their `control` identifier.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WireStep {
    Declare(VariableDeclaration),
    Assign(VariableAssignment),
    Call(FunctionCall),
    Control(ControlStep),
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "control")]
enum ControlStep {
    #[serde(rename = "_controls.Branch")]
    Branch(Branch),
    #[serde(rename = "_controls.Loop.ForEach")]
    ForEach(ForEachLoop),
    #[serde(rename = "_controls.Loop.OverRange")]
    OverRange(OverRangeLoop),
    #[serde(rename = "_controls.Loop.While")]
    While(WhileLoop),
}

impl From<WireStep> for Step {
    fn from(wire: WireStep) -> Self {
        match wire {
            WireStep::Declare(d) => Step::DeclareVariable(d),
            WireStep::Assign(a) => Step::AssignVariable(a),
            WireStep::Call(c) => Step::CallFunction(c),
            WireStep::Control(ControlStep::Branch(b)) => Step::Branch(b),
            WireStep::Control(ControlStep::ForEach(l)) => Step::ForEach(l),
            WireStep::Control(ControlStep::OverRange(l)) => Step::OverRange(l),
            WireStep::Control(ControlStep::While(l)) => Step::While(l),
        }
    }
}

impl From<Step> for WireStep {
    fn from(step: Step) -> Self {
        match step {
            Step::DeclareVariable(d) => WireStep::Declare(d),
            Step::AssignVariable(a) => WireStep::Assign(a),
            Step::CallFunction(c) => WireStep::Call(c),
            Step::Branch(b) => WireStep::Control(ControlStep::Branch(b)),
            Step::ForEach(l) => WireStep::Control(ControlStep::ForEach(l)),
            Step::OverRange(l) => WireStep::Control(ControlStep::OverRange(l)),
            Step::While(l) => WireStep::Control(ControlStep::While(l)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_while_loop_wire_shape() {
        let wire = json!({
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
        });

        let step: Step = serde_json::from_value(wire.clone()).unwrap();
        assert_eq!(step.kind(), StepKind::WhileLoop);
        let body = step.block(Block::Body).unwrap();
        assert_eq!(body.len(), 1);
        assert_eq!(body[0].kind(), StepKind::CallFunction);

        assert_eq!(serde_json::to_value(&step).unwrap(), wire);
    }

    #[test]
    fn test_declaration_rejects_mismatched_literal() {
        let bad = json!({ "declare": "flag", "type": "_types.Boolean", "value": "yes" });
        assert!(serde_json::from_value::<Step>(bad).is_err());

        let good = json!({ "declare": "flag", "type": "_types.Boolean", "value": true });
        let step: Step = serde_json::from_value(good).unwrap();
        assert_eq!(step, Step::declare("flag", true));
    }

    #[test]
    fn test_with_type_keeps_invariant() {
        let declaration = VariableDeclaration::new("count", "7");
        assert_eq!(
            declaration.with_type(DataType::Number).value,
            TypedValue::Number(7.0)
        );
        assert_eq!(
            declaration.with_type(DataType::Boolean).value,
            TypedValue::Boolean(false)
        );
    }

    #[test]
    fn test_branch_else_reads_as_empty() {
        let branch = Step::template(StepKind::Branch);
        assert_eq!(branch.block(Block::Else).map(|b| b.len()), Some(0));
        assert!(branch.block(Block::Body).is_none());

        let wire = serde_json::to_value(&branch).unwrap();
        assert!(wire.get("else").is_none());
        assert_eq!(wire["control"], json!("_controls.Branch"));
    }

    #[test]
    fn test_nested_declared_names() {
        let inner = Arc::new(Step::declare("inner", 1.0));
        let outer = Step::ForEach(ForEachLoop {
            collection: Expression::reference("items"),
            element: "item".into(),
            body: vec![inner],
        });
        assert_eq!(outer.declared_names(), vec!["inner"]);
        assert_eq!(outer.bound_names(), vec!["item"]);
        assert_eq!(outer.references(), vec![VariableRef::variable("items")]);
    }

    #[test]
    fn test_every_kind_has_a_template() {
        for kind in StepKind::ALL {
            assert_eq!(Step::template(kind).kind(), kind);
        }
    }
}
