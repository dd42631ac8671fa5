use flowgraph::bridge::{EngineEvent, EngineState};
use flowgraph::prelude::*;
use serde_json::{json, Map};
use std::sync::Arc;

const COUNTER: &str = include_str!("data/counter.json");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    Logger::init_tracing();
    println!("=== Runtime Bridge Demo ===\n");

    let declaration = FlowgraphDeclaration::from_json_str(COUNTER)?;
    let executable = ExecutionFlowConverter.convert(
        Dialect::JavaScript,
        &declaration,
        &ConvertOptions::default().strict(),
    )?;

    // replays the loop the real engine would run
    let engine = Arc::new(
        ScriptedEngine::from_executable(&executable)?
            .frame([("counter", json!(1))])
            .frame([("counter", json!(2))])
            .frame([("counter", json!(3))]),
    );
    let bridge = RuntimeBridge::with_watched(
        Arc::clone(&engine),
        vec![VariableRef::variable("counter")],
    );

    let mut receiver = bridge.subscribe();
    let watcher = tokio::spawn(async move {
        while receiver.changed().await.is_ok() {
            let snapshot = receiver.borrow_and_update().clone();
            println!(
                "  [{}] counter={} output={:?}",
                snapshot.status,
                snapshot
                    .variable(&VariableRef::variable("counter"))
                    .map(ToString::to_string)
                    .unwrap_or_default(),
                snapshot.output_text()
            );
        }
    });

    let _reexecution = engine.on(
        EngineEvent::Reexecution,
        Arc::new(|_: &EngineState| println!("  re-executing")),
    );

    bridge.initialize().await?;
    bridge.execute_to_end(Map::new()).await?;
    println!("first run: {}", bridge.snapshot().output_text());

    bridge.execute_to_end(Map::new()).await?;
    println!("second run: {}", bridge.snapshot().output_text());

    drop(bridge);
    watcher.await?;
    println!("\n=== Demo Completed ===");
    Ok(())
}
