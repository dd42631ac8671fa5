use flowgraph::prelude::*;
use flowgraph::WhileLoop;

fn main() -> anyhow::Result<()> {
    Logger::init_tracing();
    println!("=== Flowgraph Editing Session Demo ===\n");

    let mut session = EditSession::new("Counter", "Counts up to a limit");
    let logger = Logger::for_session(&session);

    println!("1. Declaring variables:");
    session.apply("declare counter", |builder| {
        builder.append_step(Step::declare("counter", 0.0))
    })?;
    session.apply("declare limit", |builder| {
        builder.append_step(Step::declare("limit", 3.0))
    })?;
    session.set_field(DeclarationField::ReturnIdentifier, "counter")?;
    println!("  steps: {}", session.declaration().step_count());

    println!("2. Rejected edit keeps the previous value:");
    let before = session.declaration();
    if let Err(error) = session.apply("declare counter again", |builder| {
        builder.append_step(Step::declare("counter", 1.0))
    }) {
        println!("  rejected: {error}");
    }
    assert!(std::sync::Arc::ptr_eq(&before, &session.declaration()));

    println!("3. Adding a loop and filling its body:");
    session.create_snapshot("variables".to_string(), "before the loop".to_string())?;
    session.apply("add loop", |builder| {
        let condition = FunctionCall::new("_functions.Math.LessThan")
            .argument("a", VariableRef::variable("counter"))
            .argument("b", VariableRef::variable("limit"));
        builder.append_step(Step::While(WhileLoop {
            condition: Expression::call(condition),
            body: Vec::new(),
        }))
    })?;
    session.apply("increment in loop", |builder| {
        let increment = FunctionCall::new("_functions.Math.Add")
            .argument("a", VariableRef::variable("counter"))
            .argument("b", Operand::literal(1))
            .set(VariableRef::variable("counter"));
        builder.append_step_in(&BlockPath::root().child(2, Block::Body), increment)
    })?;
    println!("{}", session.declaration().to_json_pretty()?);

    println!("4. Undo, redo and rollback:");
    session.undo()?;
    println!("  after undo: loop body has {} steps", loop_body_len(&session));
    session.redo()?;
    println!("  after redo: loop body has {} steps", loop_body_len(&session));
    session.rollback_to_snapshot("variables")?;
    println!("  after rollback: {} steps", session.declaration().step_count());

    logger.log_session_summary(&session);
    logger.log_edit_details(&session);

    println!("\n=== Demo Completed ===");
    Ok(())
}

fn loop_body_len(session: &EditSession) -> usize {
    session
        .declaration()
        .steps()
        .get(2)
        .and_then(|step| step.block(Block::Body))
        .map_or(0, <[_]>::len)
}
