//! # Declaration builder
//!
//! Immutable editing of a [`FlowgraphDeclaration`]. Every operation returns a
//! new builder and leaves the receiver untouched; a rejected edit returns an
//! error and the caller keeps the previous value.

use crate::declaration::{DeclarationField, FlowgraphDeclaration};
use crate::error::BuilderError;
use crate::step::{Block, Step, StepKind, StepList, VariableDeclaration};
use std::fmt;
use std::sync::Arc;

/// Address of a step sequence: the top level, or a block nested inside it
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BlockPath(Vec<(usize, Block)>);

impl BlockPath {
    /// The declaration's top-level sequence
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Descends into `block` of the step at `index`
    pub fn child(mut self, index: usize, block: Block) -> Self {
        self.0.push((index, block));
        self
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[(usize, Block)] {
        &self.0
    }
}

impl fmt::Display for BlockPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str("root");
        }
        for (position, (index, block)) in self.0.iter().enumerate() {
            if position > 0 {
                f.write_str("/")?;
            }
            write!(f, "{index}.{block}")?;
        }
        Ok(())
    }
}

/// Holds one declaration value and derives edited copies of it
#[derive(Debug, Clone, PartialEq)]
pub struct DeclarationBuilder {
    declaration: Arc<FlowgraphDeclaration>,
}

impl DeclarationBuilder {
    pub fn new(define: impl Into<String>, description: impl Into<String>) -> Self {
        Self::from_declaration(FlowgraphDeclaration::new(define, description))
    }

    pub fn from_declaration(declaration: impl Into<Arc<FlowgraphDeclaration>>) -> Self {
        Self {
            declaration: declaration.into(),
        }
    }

    /// Current value; cheap to clone and safe to hold across edits
    pub fn declaration(&self) -> &Arc<FlowgraphDeclaration> {
        &self.declaration
    }

    pub fn build(&self) -> Arc<FlowgraphDeclaration> {
        Arc::clone(&self.declaration)
    }

    pub fn steps(&self) -> &[Arc<Step>] {
        self.declaration.steps()
    }

    /// Replaces one top-level field
    pub fn set_field(&self, field: DeclarationField, value: impl AsRef<str>) -> Self {
        tracing::debug!(
            define = %self.declaration.define(),
            field = ?field,
            "declaration field set"
        );
        Self::from_declaration(self.declaration.with_field(field, value.as_ref()))
    }

    /// Appends to the top level; existing indices are unaffected
    pub fn append_step(&self, step: impl Into<Step>) -> Result<Self, BuilderError> {
        self.append_step_in(&BlockPath::root(), step)
    }

    pub fn replace_step_at(
        &self,
        index: usize,
        step: impl Into<Step>,
    ) -> Result<Self, BuilderError> {
        self.replace_step_at_in(&BlockPath::root(), index, step)
    }

    /// Removes the step at `index`; later steps shift down by one
    pub fn remove_step_at(&self, index: usize) -> Result<Self, BuilderError> {
        self.remove_step_at_in(&BlockPath::root(), index)
    }

    /// Rewrites the step at `index` after checking it is of the `expected` kind
    pub fn edit_step_at<F>(
        &self,
        index: usize,
        expected: StepKind,
        edit: F,
    ) -> Result<Self, BuilderError>
    where
        F: FnOnce(&Step) -> Step,
    {
        self.edit_step_at_in(&BlockPath::root(), index, expected, edit)
    }

    /// Rewrites the variable declaration at `index`
    pub fn edit_declaration_at<F>(&self, index: usize, edit: F) -> Result<Self, BuilderError>
    where
        F: FnOnce(&VariableDeclaration) -> VariableDeclaration,
    {
        self.edit_step_at(index, StepKind::DeclareVariable, |step| match step {
            Step::DeclareVariable(declaration) => Step::DeclareVariable(edit(declaration)),
            other => other.clone(),
        })
    }

    pub fn append_step_in(
        &self,
        path: &BlockPath,
        step: impl Into<Step>,
    ) -> Result<Self, BuilderError> {
        let step = Arc::new(step.into());
        self.rebuild("append", path, Some(&step), |steps| {
            let mut next = Vec::with_capacity(steps.len() + 1);
            next.extend_from_slice(steps);
            next.push(Arc::clone(&step));
            Ok(next)
        })
    }

    pub fn replace_step_at_in(
        &self,
        path: &BlockPath,
        index: usize,
        step: impl Into<Step>,
    ) -> Result<Self, BuilderError> {
        let step = Arc::new(step.into());
        self.rebuild("replace", path, Some(&step), |steps| {
            check_index(index, steps.len())?;
            Ok(splice(steps, index, Some(Arc::clone(&step))))
        })
    }

    pub fn remove_step_at_in(
        &self,
        path: &BlockPath,
        index: usize,
    ) -> Result<Self, BuilderError> {
        self.rebuild("remove", path, None, |steps| {
            check_index(index, steps.len())?;
            Ok(splice(steps, index, None))
        })
    }

    pub fn edit_step_at_in<F>(
        &self,
        path: &BlockPath,
        index: usize,
        expected: StepKind,
        edit: F,
    ) -> Result<Self, BuilderError>
    where
        F: FnOnce(&Step) -> Step,
    {
        let current = locate(self.steps(), path.segments())?;
        let existing = current.get(index).ok_or(BuilderError::IndexOutOfRange {
            index,
            len: current.len(),
        })?;
        if existing.kind() != expected {
            let error = BuilderError::StepTypeMismatch {
                index,
                expected,
                found: existing.kind(),
            };
            tracing::warn!(define = %self.declaration.define(), %path, %error, "edit rejected");
            return Err(error);
        }
        let edited = edit(existing.as_ref());
        self.replace_step_at_in(path, index, edited)
    }

    fn rebuild<F>(
        &self,
        action: &'static str,
        path: &BlockPath,
        introduced: Option<&Arc<Step>>,
        edit: F,
    ) -> Result<Self, BuilderError>
    where
        F: FnOnce(&[Arc<Step>]) -> Result<StepList, BuilderError>,
    {
        let result = update_block(self.steps(), path.segments(), edit).and_then(|steps| {
            let next = self.declaration.with_steps(steps);
            if let Some(step) = introduced {
                check_introduced(&next, step)?;
            }
            Ok(next)
        });

        match result {
            Ok(next) => {
                tracing::debug!(
                    define = %next.define(),
                    action,
                    %path,
                    steps = next.steps().len(),
                    "declaration edited"
                );
                Ok(Self::from_declaration(next))
            }
            Err(error) => {
                tracing::warn!(
                    define = %self.declaration.define(),
                    action,
                    %path,
                    %error,
                    "edit rejected"
                );
                Err(error)
            }
        }
    }
}

impl Default for DeclarationBuilder {
    fn default() -> Self {
        Self::new("", "")
    }
}

impl From<FlowgraphDeclaration> for DeclarationBuilder {
    fn from(declaration: FlowgraphDeclaration) -> Self {
        Self::from_declaration(declaration)
    }
}

fn check_index(index: usize, len: usize) -> Result<(), BuilderError> {
    if index < len {
        Ok(())
    } else {
        Err(BuilderError::IndexOutOfRange { index, len })
    }
}

/// `steps[..index] + replacement + steps[index + 1..]`; `index` must be in range
fn splice(steps: &[Arc<Step>], index: usize, replacement: Option<Arc<Step>>) -> StepList {
    let mut next = Vec::with_capacity(steps.len());
    next.extend_from_slice(&steps[..index]);
    next.extend(replacement);
    next.extend_from_slice(&steps[index + 1..]);
    next
}

/// Follows `path` down from `steps` to the addressed sequence
fn locate<'a>(
    steps: &'a [Arc<Step>],
    path: &[(usize, Block)],
) -> Result<&'a [Arc<Step>], BuilderError> {
    match path.split_first() {
        None => Ok(steps),
        Some((&(index, block), rest)) => {
            let parent = steps.get(index).ok_or(BuilderError::IndexOutOfRange {
                index,
                len: steps.len(),
            })?;
            let inner = parent.block(block).ok_or(BuilderError::BlockNotFound {
                index,
                kind: parent.kind(),
                block,
            })?;
            locate(inner, rest)
        }
    }
}

/// Applies `edit` to the sequence at `path`, copying each level it passes
/// through and sharing every sibling it does not touch
fn update_block<F>(
    steps: &[Arc<Step>],
    path: &[(usize, Block)],
    edit: F,
) -> Result<StepList, BuilderError>
where
    F: FnOnce(&[Arc<Step>]) -> Result<StepList, BuilderError>,
{
    match path.split_first() {
        None => edit(steps),
        Some((&(index, block), rest)) => {
            let parent = steps.get(index).ok_or(BuilderError::IndexOutOfRange {
                index,
                len: steps.len(),
            })?;
            let not_found = || BuilderError::BlockNotFound {
                index,
                kind: parent.kind(),
                block,
            };
            let inner = parent.block(block).ok_or_else(not_found)?;
            let updated = update_block(inner, rest, edit)?;
            let replaced = parent.with_block(block, updated).ok_or_else(not_found)?;
            Ok(splice(steps, index, Some(Arc::new(replaced))))
        }
    }
}

/// Names a new step declares must be non-empty and unique in the whole plan,
/// and every literal it declares must have a wire form
fn check_introduced(declaration: &FlowgraphDeclaration, step: &Step) -> Result<(), BuilderError> {
    check_literals(step)?;
    let all = declaration.declared_names();
    for name in step.declared_names() {
        if name.trim().is_empty() {
            return Err(BuilderError::EmptyVariableName);
        }
        if all.iter().filter(|declared| **declared == name).count() > 1 {
            return Err(BuilderError::DuplicateVariable(name.to_string()));
        }
    }
    Ok(())
}

fn check_literals(step: &Step) -> Result<(), BuilderError> {
    if let Some(declaration) = step.as_declaration() {
        declaration.value.validate()?;
    }
    for block in step.blocks() {
        block.iter().try_for_each(|nested| check_literals(nested))?;
    }
    Ok(())
}
