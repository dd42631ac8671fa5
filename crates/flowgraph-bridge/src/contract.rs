// SPDX-License-Identifier: Apache-2.0

//! Contract with the external flowgraph engine: lifecycle statuses, events,
//! subscriptions and the executable form the engine consumes.

use flowgraph_core::VariableRef;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum EngineStatus {
    #[default]
    #[serde(rename = "notInitialized")]
    NotInitialized,
    #[serde(rename = "initialized")]
    Initialized,
    #[serde(rename = "execution done")]
    ExecutionDone,
}

impl EngineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineStatus::NotInitialized => "notInitialized",
            EngineStatus::Initialized => "initialized",
            EngineStatus::ExecutionDone => "execution done",
        }
    }

    /// Forward-only lifecycle; every status may repeat itself
    pub fn can_transition_to(&self, next: EngineStatus) -> bool {
        matches!(
            (self, next),
            (EngineStatus::NotInitialized, _)
                | (EngineStatus::Initialized, EngineStatus::Initialized)
                | (EngineStatus::Initialized, EngineStatus::ExecutionDone)
                | (EngineStatus::ExecutionDone, EngineStatus::ExecutionDone)
        )
    }
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EngineEvent {
    Initialized,
    StateChanged,
    Reexecution,
}

impl EngineEvent {
    pub const ALL: [EngineEvent; 3] = [
        EngineEvent::Initialized,
        EngineEvent::StateChanged,
        EngineEvent::Reexecution,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::Initialized => "initialized",
            EngineEvent::StateChanged => "stateChanged",
            EngineEvent::Reexecution => "reexecution",
        }
    }
}

impl fmt::Display for EngineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// State the engine hands to event handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineState {
    pub status: EngineStatus,
}

pub type EventHandler = Arc<dyn Fn(&EngineState) + Send + Sync>;

/// Registration handle; dropping it unsubscribes the handler
#[must_use = "dropping a Subscription unsubscribes its handler"]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(unsubscribe: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// Unsubscribes now instead of on drop
    pub fn unsubscribe(mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("engine is not initialized")]
    NotInitialized,

    #[error("invalid executable: {0}")]
    InvalidExecutable(String),

    #[error("execution failed: {0}")]
    Failed(String),
}

/// The engine behind a bridge. Methods take `&self`; implementations
/// synchronize internally and must call handlers without holding locks
/// a handler's callbacks into the engine would need.
pub trait FlowgraphEngine: Send + Sync + 'static {
    fn status(&self) -> EngineStatus;

    /// Prepares for execution and emits `initialized`
    async fn initialize(&self) -> Result<(), EngineError>;

    /// Runs the plan, emitting `reexecution` first when a previous run finished,
    /// then zero or more `stateChanged`
    async fn execute_to_end(&self, arguments: Map<String, Value>) -> Result<(), EngineError>;

    fn on(&self, event: EngineEvent, handler: EventHandler) -> Subscription;

    fn get_variable(&self, reference: &VariableRef) -> Option<Value>;

    fn has_output(&self) -> bool;

    fn output(&self) -> Option<Value>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialect {
    #[default]
    #[serde(rename = "javascript")]
    JavaScript,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::JavaScript => f.write_str("javascript"),
        }
    }
}

/// Engine-consumable form of a declaration or function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutableFlowgraph {
    pub dialect: Dialect,
    pub define: String,
    pub blueprint: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: IndexMap<String, Value>,
    #[serde(rename = "executionFlow")]
    pub execution_flow: Value,
    /// Function definitions bundled for the engine to resolve calls against
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<Value>,
}

impl ExecutableFlowgraph {
    /// Return reference of the execution flow, if it names one
    pub fn return_identifier(&self) -> Option<VariableRef> {
        self.execution_flow
            .get("return")
            .and_then(Value::as_str)
            .and_then(VariableRef::parse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn status_wire_names() {
        assert_eq!(
            serde_json::to_value(EngineStatus::ExecutionDone).unwrap(),
            serde_json::json!("execution done")
        );
        assert_eq!(EngineEvent::StateChanged.to_string(), "stateChanged");
    }

    #[test]
    fn lifecycle_never_returns_to_not_initialized() {
        use EngineStatus::*;
        assert!(NotInitialized.can_transition_to(Initialized));
        assert!(Initialized.can_transition_to(ExecutionDone));
        assert!(ExecutionDone.can_transition_to(ExecutionDone));
        assert!(!ExecutionDone.can_transition_to(NotInitialized));
        assert!(!Initialized.can_transition_to(NotInitialized));
        assert!(!ExecutionDone.can_transition_to(Initialized));
    }

    #[test]
    fn subscription_unsubscribes_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let subscription = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        subscription.unsubscribe();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let counter = Arc::clone(&calls);
        drop(Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
