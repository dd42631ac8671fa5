// SPDX-License-Identifier: Apache-2.0

use crate::contract::{EngineEvent, EngineState, EngineStatus, FlowgraphEngine};
use flowgraph_catalog::natural;
use flowgraph_core::VariableRef;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// Immutable view of the engine, replaced wholesale on every event
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeSnapshot {
    pub status: EngineStatus,
    pub output: Option<Value>,
    pub observed_variables: IndexMap<VariableRef, Value>,
}

impl RuntimeSnapshot {
    /// Snapshot of an engine before any event has been seen
    pub fn initial<E: FlowgraphEngine + ?Sized>(engine: &E, watched: &[VariableRef]) -> Self {
        Self {
            status: engine.status(),
            output: None,
            observed_variables: observe(engine, watched),
        }
    }

    /// Derives the snapshot for `event` from the engine's state at event time.
    /// Only `stateChanged` carries output; `initialized` and `reexecution`
    /// clear it.
    pub fn derive<E: FlowgraphEngine + ?Sized>(
        engine: &E,
        state: &EngineState,
        event: EngineEvent,
        watched: &[VariableRef],
    ) -> Self {
        let output = match event {
            EngineEvent::StateChanged if engine.has_output() => engine.output(),
            _ => None,
        };
        Self {
            status: state.status,
            output,
            observed_variables: observe(engine, watched),
        }
    }

    /// Output in display form, empty when there is none
    pub fn output_text(&self) -> String {
        self.output.as_ref().map(natural).unwrap_or_default()
    }

    pub fn variable(&self, reference: &VariableRef) -> Option<&Value> {
        self.observed_variables.get(reference)
    }
}

fn observe<E: FlowgraphEngine + ?Sized>(
    engine: &E,
    watched: &[VariableRef],
) -> IndexMap<VariableRef, Value> {
    watched
        .iter()
        .filter_map(|reference| {
            engine
                .get_variable(reference)
                .map(|value| (reference.clone(), value))
        })
        .collect()
}
