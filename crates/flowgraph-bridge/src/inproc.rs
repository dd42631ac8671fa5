// SPDX-License-Identifier: Apache-2.0

//! In-process engine that replays a fixed script of variable updates.
//! Used to drive a [`RuntimeBridge`](crate::RuntimeBridge) without an
//! external runtime.

use crate::contract::{
    EngineError, EngineEvent, EngineState, EngineStatus, EventHandler,
    ExecutableFlowgraph, FlowgraphEngine, Subscription,
};
use flowgraph_core::{Step, VariableRef};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

type Variables = IndexMap<String, Value>;
type OutputFn = Arc<dyn Fn(&Variables) -> Option<Value> + Send + Sync>;
type Listeners = Arc<Mutex<Vec<(u64, EngineEvent, EventHandler)>>>;

struct RunState {
    status: EngineStatus,
    variables: Variables,
    output: Option<Value>,
}

pub struct ScriptedEngine {
    initial: Variables,
    frames: Vec<Variables>,
    returns: Option<VariableRef>,
    output_with: Option<OutputFn>,
    state: Mutex<RunState>,
    listeners: Listeners,
    next_listener: AtomicU64,
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self {
            initial: IndexMap::new(),
            frames: Vec::new(),
            returns: None,
            output_with: None,
            state: Mutex::new(RunState {
                status: EngineStatus::NotInitialized,
                variables: IndexMap::new(),
                output: None,
            }),
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_listener: AtomicU64::new(0),
        }
    }

    /// Seeds a variable present at the start of every run
    pub fn variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.initial.insert(name.into(), value.into());
        self
    }

    /// Appends one batch of updates, published as a single `stateChanged`
    pub fn frame<I, K, V>(mut self, updates: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.frames.push(
            updates
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        );
        self
    }

    pub fn returns(mut self, reference: VariableRef) -> Self {
        self.returns = Some(reference);
        self
    }

    /// Computes the output from the final variables instead of the return reference
    pub fn output_with(
        mut self,
        output: impl Fn(&Variables) -> Option<Value> + Send + Sync + 'static,
    ) -> Self {
        self.output_with = Some(Arc::new(output));
        self
    }

    /// Seeds the script from an executable's top-level declarations and return
    pub fn from_executable(executable: &ExecutableFlowgraph) -> Result<Self, EngineError> {
        let steps = match executable.execution_flow.get("execute") {
            Some(Value::Array(steps)) => steps,
            None => return Ok(Self::new()),
            Some(_) => {
                return Err(EngineError::InvalidExecutable(format!(
                    "`{}` has a non-list execute block",
                    executable.define
                )))
            }
        };

        let mut engine = Self::new();
        for raw in steps {
            let step: Step = serde_json::from_value(raw.clone())
                .map_err(|error| EngineError::InvalidExecutable(error.to_string()))?;
            if let Some(declaration) = step.as_declaration() {
                engine = engine.variable(declaration.name.clone(), declaration.value.to_json());
            }
        }
        if let Some(reference) = executable.return_identifier() {
            engine = engine.returns(reference);
        }
        tracing::debug!(
            define = %executable.define,
            variables = engine.initial.len(),
            "Scripted engine loaded"
        );
        Ok(engine)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    fn emit(&self, event: EngineEvent) {
        let state = EngineState {
            status: self.status(),
        };
        let handlers: Vec<EventHandler> = self
            .listeners
            .lock()
            .iter()
            .filter(|(_, listened, _)| *listened == event)
            .map(|(_, _, handler)| Arc::clone(handler))
            .collect();
        for handler in handlers {
            handler(&state);
        }
    }

    fn compute_output(&self, variables: &Variables) -> Option<Value> {
        match (&self.output_with, &self.returns) {
            (Some(output), _) => output(variables),
            (None, Some(reference)) => variables.get(reference.name()).cloned(),
            (None, None) => None,
        }
    }
}

impl FlowgraphEngine for ScriptedEngine {
    fn status(&self) -> EngineStatus {
        self.state.lock().status
    }

    async fn initialize(&self) -> Result<(), EngineError> {
        {
            let mut state = self.state.lock();
            if state.status == EngineStatus::NotInitialized {
                state.status = EngineStatus::Initialized;
            }
            state.variables = self.initial.clone();
            state.output = None;
        }
        self.emit(EngineEvent::Initialized);
        Ok(())
    }

    async fn execute_to_end(&self, arguments: Map<String, Value>) -> Result<(), EngineError> {
        let rerun = {
            let mut state = self.state.lock();
            if state.status == EngineStatus::NotInitialized {
                return Err(EngineError::NotInitialized);
            }
            state.variables = self.initial.clone();
            state.variables.extend(arguments);
            state.output = None;
            state.status == EngineStatus::ExecutionDone
        };
        if rerun {
            self.emit(EngineEvent::Reexecution);
        }

        for frame in &self.frames {
            self.state
                .lock()
                .variables
                .extend(frame.iter().map(|(name, value)| (name.clone(), value.clone())));
            self.emit(EngineEvent::StateChanged);
            tokio::task::yield_now().await;
        }

        {
            let mut state = self.state.lock();
            state.output = self.compute_output(&state.variables);
            state.status = EngineStatus::ExecutionDone;
        }
        self.emit(EngineEvent::StateChanged);
        Ok(())
    }

    fn on(&self, event: EngineEvent, handler: EventHandler) -> Subscription {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push((id, event, handler));

        let listeners = Arc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                listeners.lock().retain(|(listener, _, _)| *listener != id);
            }
        })
    }

    fn get_variable(&self, reference: &VariableRef) -> Option<Value> {
        self.state.lock().variables.get(reference.name()).cloned()
    }

    fn has_output(&self) -> bool {
        self.state.lock().output.is_some()
    }

    fn output(&self) -> Option<Value> {
        self.state.lock().output.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{ConvertOptions, DeclarationConverter, ExecutionFlowConverter};
    use crate::contract::Dialect;
    use flowgraph_core::{DeclarationBuilder, DeclarationField};
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn events_follow_the_script() {
        let engine = ScriptedEngine::new()
            .frame([("a", json!(1))])
            .frame([("b", json!(2))]);
        let changes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&changes);
        let _subscription = engine.on(
            EngineEvent::StateChanged,
            Arc::new(move |_: &EngineState| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert_eq!(
            engine.execute_to_end(Map::new()).await,
            Err(EngineError::NotInitialized)
        );
        engine.initialize().await.unwrap();
        engine.execute_to_end(Map::new()).await.unwrap();
        assert_eq!(changes.load(Ordering::SeqCst), 3);
        assert_eq!(engine.status(), EngineStatus::ExecutionDone);
        assert_eq!(engine.get_variable(&VariableRef::variable("b")), Some(json!(2)));
        assert!(!engine.has_output());
    }

    #[tokio::test]
    async fn loads_declarations_from_an_executable() {
        let declaration = DeclarationBuilder::new("Greeting", "")
            .append_step(Step::declare("greeting", "hello"))
            .unwrap()
            .set_field(DeclarationField::ReturnIdentifier, "greeting")
            .build();
        let executable = ExecutionFlowConverter
            .convert(Dialect::JavaScript, &declaration, &ConvertOptions::default())
            .unwrap();

        let engine = ScriptedEngine::from_executable(&executable).unwrap();
        engine.initialize().await.unwrap();
        engine.execute_to_end(Map::new()).await.unwrap();
        assert_eq!(engine.output(), Some(json!("hello")));
    }

    #[tokio::test]
    async fn custom_output_sees_final_variables() {
        let engine = ScriptedEngine::new()
            .variable("x", 2)
            .frame([("x", json!(5))])
            .output_with(|variables| {
                variables
                    .get("x")
                    .and_then(Value::as_i64)
                    .map(|x| json!(x * 10))
            });
        engine.initialize().await.unwrap();
        engine.execute_to_end(Map::new()).await.unwrap();
        assert_eq!(engine.output(), Some(json!(50)));
    }

    #[test]
    fn rejects_a_non_list_execute_block() {
        let executable = ExecutableFlowgraph {
            dialect: Dialect::JavaScript,
            define: "Broken".to_string(),
            blueprint: String::new(),
            parameters: IndexMap::new(),
            execution_flow: json!({ "execute": 3 }),
            functions: Vec::new(),
        };
        assert!(matches!(
            ScriptedEngine::from_executable(&executable),
            Err(EngineError::InvalidExecutable(_))
        ));
    }
}
