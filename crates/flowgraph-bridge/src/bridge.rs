// SPDX-License-Identifier: Apache-2.0

use crate::contract::{
    EngineEvent, EngineState, EngineStatus, FlowgraphEngine, Subscription,
};
use crate::error::BridgeError;
use crate::snapshot::RuntimeSnapshot;
use flowgraph_core::VariableRef;
use serde_json::{Map, Value};
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use uuid::Uuid;

/// Mirrors an engine's lifecycle into immutable [`RuntimeSnapshot`]s.
///
/// Every engine event replaces the published snapshot wholesale; readers
/// either take the current one with [`RuntimeBridge::snapshot`] or follow
/// changes through [`RuntimeBridge::subscribe`]. Dropping the bridge
/// unsubscribes all of its handlers.
pub struct RuntimeBridge<E: FlowgraphEngine> {
    engine: Arc<E>,
    trace_id: String,
    sender: Arc<watch::Sender<Arc<RuntimeSnapshot>>>,
    subscriptions: Vec<Subscription>,
}

impl<E: FlowgraphEngine> RuntimeBridge<E> {
    pub fn new(engine: Arc<E>) -> Self {
        Self::with_watched(engine, Vec::new())
    }

    /// Bridge that also mirrors the current value of each watched variable
    pub fn with_watched(engine: Arc<E>, watched: Vec<VariableRef>) -> Self {
        let trace_id = Uuid::new_v4().to_string();
        let watched: Arc<[VariableRef]> = watched.into();
        let (sender, _) = watch::channel(Arc::new(RuntimeSnapshot::initial(
            engine.as_ref(),
            &watched,
        )));
        let sender = Arc::new(sender);

        let subscriptions = EngineEvent::ALL
            .into_iter()
            .map(|event| {
                let handler = mirror(
                    event,
                    Arc::downgrade(&engine),
                    Arc::clone(&sender),
                    Arc::clone(&watched),
                    trace_id.clone(),
                );
                engine.on(event, Arc::new(handler))
            })
            .collect();

        tracing::info!(
            trace_id = %trace_id,
            status = %engine.status(),
            watched = watched.len(),
            "Runtime bridge attached"
        );

        Self {
            engine,
            trace_id,
            sender,
            subscriptions,
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    /// The snapshot derived from the most recent event
    pub fn snapshot(&self) -> Arc<RuntimeSnapshot> {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<RuntimeSnapshot>> {
        self.sender.subscribe()
    }

    pub async fn initialize(&self) -> Result<(), BridgeError> {
        tracing::info!(trace_id = %self.trace_id, "Initializing engine");
        self.engine.initialize().await?;
        Ok(())
    }

    /// Runs the engine's plan to completion with the given arguments
    pub async fn execute_to_end(&self, arguments: Map<String, Value>) -> Result<(), BridgeError> {
        if self.engine.status() == EngineStatus::NotInitialized {
            tracing::warn!(trace_id = %self.trace_id, "Execution requested before initialization");
            return Err(BridgeError::NotInitialized);
        }

        tracing::info!(
            trace_id = %self.trace_id,
            arguments = arguments.len(),
            "Executing to end"
        );
        self.engine.execute_to_end(arguments).await?;
        tracing::info!(
            trace_id = %self.trace_id,
            status = %self.snapshot().status,
            "Execution settled"
        );
        Ok(())
    }

    /// Detaches from the engine; the last snapshot stays readable
    pub fn unsubscribe_all(&mut self) {
        let count = self.subscriptions.len();
        for subscription in self.subscriptions.drain(..) {
            subscription.unsubscribe();
        }
        tracing::debug!(trace_id = %self.trace_id, count, "Runtime bridge detached");
    }
}

fn mirror<E: FlowgraphEngine>(
    event: EngineEvent,
    engine: Weak<E>,
    sender: Arc<watch::Sender<Arc<RuntimeSnapshot>>>,
    watched: Arc<[VariableRef]>,
    trace_id: String,
) -> impl Fn(&EngineState) + Send + Sync + 'static {
    move |state: &EngineState| {
        let Some(engine) = engine.upgrade() else {
            return;
        };
        let snapshot = RuntimeSnapshot::derive(engine.as_ref(), state, event, &watched);

        let previous = sender.borrow().status;
        if !previous.can_transition_to(snapshot.status) {
            tracing::warn!(
                trace_id = %trace_id,
                event = %event,
                from = %previous,
                to = %snapshot.status,
                "Engine reported a backwards status transition"
            );
        }

        let status = snapshot.status;
        let has_output = snapshot.output.is_some();
        sender.send_replace(Arc::new(snapshot));
        tracing::debug!(
            trace_id = %trace_id,
            event = %event,
            status = %status,
            has_output,
            "Snapshot replaced"
        );
    }
}
