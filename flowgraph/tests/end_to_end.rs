use flowgraph::catalog::{CatalogLoader, DisplayPolicy, SearchEngine};
use flowgraph::context::EditSession;
use flowgraph::prelude::*;
use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use std::sync::Arc;

const CATALOG: &str = include_str!("../examples/data/functions.yaml");
const COUNTER: &str = include_str!("../examples/data/counter.json");

#[test]
fn test_counter_declaration_loads_cleanly() {
    let declaration = FlowgraphDeclaration::from_json_str(COUNTER).unwrap();
    assert_eq!(declaration.define(), "Counter");
    assert_eq!(declaration.step_count(), 3);
    assert_eq!(declaration.declared_names(), vec!["counter", "limit"]);
    assert!(declaration.diagnostics().is_empty());

    let original: Value = serde_json::from_str(COUNTER).unwrap();
    assert_eq!(declaration.to_json_value().unwrap(), original);
}

#[tokio::test]
async fn test_session_to_bridge() {
    let mut session = EditSession::new("Greeting", "Greets someone");
    session
        .apply("declare greeting", |builder| {
            builder.append_step(Step::declare("greeting", "hello"))
        })
        .unwrap();
    session
        .set_field(DeclarationField::ReturnIdentifier, "greeting")
        .unwrap();

    let executable = ExecutionFlowConverter
        .convert(
            Dialect::JavaScript,
            &session.declaration(),
            &ConvertOptions::default().strict(),
        )
        .unwrap();
    let engine = Arc::new(
        ScriptedEngine::from_executable(&executable)
            .unwrap()
            .frame([("greeting", json!("hello, world"))]),
    );
    let bridge = RuntimeBridge::with_watched(engine, vec![VariableRef::variable("greeting")]);

    bridge.initialize().await.unwrap();
    let initialized = bridge.snapshot();
    assert_eq!(initialized.status, EngineStatus::Initialized);
    assert!(initialized.output.is_none());
    assert_eq!(
        initialized.variable(&VariableRef::variable("greeting")),
        Some(&json!("hello"))
    );

    bridge.execute_to_end(Map::new()).await.unwrap();
    let done = bridge.snapshot();
    assert_eq!(done.status, EngineStatus::ExecutionDone);
    assert_eq!(done.output_text(), "hello, world");
    assert_eq!(
        serde_json::to_value(&*done).unwrap(),
        json!({
            "status": "execution done",
            "output": "hello, world",
            "observedVariables": { "$$variables.greeting": "hello, world" }
        })
    );

    // earlier snapshots are never patched
    assert_eq!(initialized.status, EngineStatus::Initialized);
}

#[tokio::test]
async fn test_catalog_function_runs_with_form_arguments() {
    let catalog = CatalogLoader::from_yaml_str(CATALOG).unwrap();
    let engine = SearchEngine::new(&catalog).unwrap();

    let results = engine.search("[Category: Math] add");
    assert_eq!(results.get("Math").unwrap(), ["Add"]);
    let shown = results.displayed(&DisplayPolicy::default());
    assert_eq!(shown[0].hidden, 0);

    let add = catalog.resolve("Math", "Add").unwrap();
    assert_eq!(add.examples(), vec!["Add(2, 3) => 5", "Add(-4, 1) => -3"]);

    let mut form = IndexMap::new();
    form.insert("a".to_string(), "40".to_string());
    let arguments = add.parse_arguments(&form).unwrap();
    assert_eq!(Value::Object(arguments.clone()), json!({ "a": 40, "b": 0 }));

    let executable = FunctionConverter
        .convert(Dialect::JavaScript, add, &ConvertOptions::default())
        .unwrap();
    assert_eq!(executable.define, "_functions.Math.Add");
    assert_eq!(
        executable.parameters.keys().collect::<Vec<_>>(),
        vec!["a", "b"]
    );

    let engine = Arc::new(ScriptedEngine::new().output_with(|variables| {
        let a = variables.get("a")?.as_f64()?;
        let b = variables.get("b")?.as_f64()?;
        Some(json!(a + b))
    }));
    let bridge = RuntimeBridge::new(engine);
    bridge.initialize().await.unwrap();
    bridge.execute_to_end(arguments).await.unwrap();
    assert_eq!(bridge.snapshot().output_text(), "40");
}

#[test]
fn test_rejected_form_input_names_the_parameter() {
    let catalog = CatalogLoader::from_yaml_str(CATALOG).unwrap();
    let add = catalog.find_by_name("_functions.Math.Add").unwrap();

    let mut form = IndexMap::new();
    form.insert("a".to_string(), "forty".to_string());
    let error = add.parse_arguments(&form).unwrap_err();
    assert!(matches!(
        error,
        flowgraph::catalog::CatalogError::InvalidArgument { ref parameter, .. } if parameter == "a"
    ));
}
