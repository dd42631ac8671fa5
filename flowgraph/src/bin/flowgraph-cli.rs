//! flowgraph CLI - inspect function catalogs and flowgraph declarations
//!
//! Provides subcommands for searching a catalog, showing a function with its
//! examples, listing a declaration's plan and running it on the scripted
//! in-process engine.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use flowgraph::bridge::inproc::ScriptedEngine;
use flowgraph::bridge::{
    ConvertOptions, DeclarationConverter, Dialect, ExecutionFlowConverter,
    RuntimeBridge,
};
use flowgraph::catalog::{CatalogLoader, DisplayPolicy, SearchEngine};
use flowgraph::logger::Logger;
use flowgraph::{Block, FlowgraphDeclaration, Step, VariableRef};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "flowgraph")]
#[command(about = "Inspect function catalogs and flowgraph declarations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search a catalog; `[Category: Name]` narrows to one category
    Search {
        /// Catalog file (JSON or YAML)
        #[arg(short, long)]
        catalog: PathBuf,

        /// Show every match instead of capping each category
        #[arg(long)]
        all: bool,

        /// Search query
        query: Vec<String>,
    },

    /// Show one function with its parameters and examples
    Show {
        #[arg(short, long)]
        catalog: PathBuf,

        /// Fully-qualified function name
        name: String,
    },

    /// Parse `name=value` inputs against a function's parameters
    Args {
        #[arg(short, long)]
        catalog: PathBuf,

        /// Fully-qualified function name
        name: String,

        /// Inputs in `name=value` form
        inputs: Vec<String>,
    },

    /// List a declaration's steps and issues, then print it as JSON
    Plan {
        /// Declaration JSON file
        file: PathBuf,

        /// Print the executable form instead of the declaration
        #[arg(long)]
        executable: bool,
    },

    /// Run a declaration on the scripted engine and print its output
    Run {
        /// Declaration JSON file
        file: PathBuf,

        /// Arguments in `name=value` form; values are JSON or plain strings
        #[arg(short, long = "arg")]
        args: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    Logger::init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Search {
            catalog,
            all,
            query,
        } => {
            let catalog = CatalogLoader::from_file(&catalog)?;
            let engine = SearchEngine::new(&catalog)?;
            let results = engine.search(&query.join(" "));
            if results.is_empty() {
                println!("No functions found");
                return Ok(());
            }

            let policy = if all {
                DisplayPolicy::unlimited()
            } else {
                DisplayPolicy::default()
            };
            for shown in results.displayed(&policy) {
                println!("{}", shown.category);
                for name in shown.names {
                    println!("  {name}");
                }
                if shown.hidden > 0 {
                    println!("  ... {} more", shown.hidden);
                }
            }
        }

        Commands::Show { catalog, name } => {
            let catalog = CatalogLoader::from_file(&catalog)?;
            let function = catalog.find_by_name(&name)?;
            println!("{}", function.bare_name());
            if !function.description.is_empty() {
                println!("  {}", function.description);
            }
            if !function.parameters.is_empty() {
                println!("Parameters:");
                for (parameter, entry) in &function.parameters {
                    match &entry.default {
                        Some(default) => println!("  {parameter}: {} = {default}", entry.data_type),
                        None => println!("  {parameter}: {}", entry.data_type),
                    }
                }
            }
            let examples = function.examples();
            if !examples.is_empty() {
                println!("Examples:");
                for example in examples {
                    println!("  {example}");
                }
            }
        }

        Commands::Args {
            catalog,
            name,
            inputs,
        } => {
            let catalog = CatalogLoader::from_file(&catalog)?;
            let function = catalog.find_by_name(&name)?;
            let raw = inputs
                .iter()
                .map(|input| split_pair(input))
                .collect::<Result<IndexMap<_, _>>>()?;
            let arguments = function.parse_arguments(&raw)?;
            println!("{}", serde_json::to_string_pretty(&arguments)?);
        }

        Commands::Plan { file, executable } => {
            let declaration = load_declaration(&file)?;
            println!("{} ({} steps)", declaration.define(), declaration.step_count());
            print_steps(declaration.steps(), 1);
            match declaration.return_identifier() {
                Some(reference) => println!("returns {}", reference.name()),
                None => println!("returns nothing"),
            }
            for diagnostic in declaration.diagnostics() {
                println!("warning: {diagnostic}");
            }
            if executable {
                let executable = ExecutionFlowConverter.convert(
                    Dialect::JavaScript,
                    &declaration,
                    &ConvertOptions::default(),
                )?;
                println!("{}", serde_json::to_string_pretty(&executable)?);
            } else {
                println!("{}", declaration.to_json_pretty()?);
            }
        }

        Commands::Run { file, args } => {
            let declaration = load_declaration(&file)?;
            let executable = ExecutionFlowConverter.convert(
                Dialect::JavaScript,
                &declaration,
                &ConvertOptions::default().strict(),
            )?;
            let engine = Arc::new(ScriptedEngine::from_executable(&executable)?);
            let watched = declaration
                .declared_names()
                .into_iter()
                .map(VariableRef::variable)
                .collect();
            let bridge = RuntimeBridge::with_watched(engine, watched);

            let mut arguments = Map::new();
            for arg in &args {
                let (name, raw) = split_pair(arg)?;
                let value = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
                arguments.insert(name, value);
            }

            bridge.initialize().await?;
            bridge.execute_to_end(arguments).await?;

            let snapshot = bridge.snapshot();
            println!("status: {}", snapshot.status);
            for (reference, value) in &snapshot.observed_variables {
                println!("  {} = {value}", reference.name());
            }
            println!("output: {}", snapshot.output_text());
        }
    }

    Ok(())
}

fn load_declaration(path: &Path) -> Result<FlowgraphDeclaration> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read declaration: {path:?}"))?;
    FlowgraphDeclaration::from_json_str(&content)
        .with_context(|| format!("Failed to parse declaration: {path:?}"))
}

fn split_pair(input: &str) -> Result<(String, String)> {
    match input.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => bail!("expected `name=value`, got `{input}`"),
    }
}

fn print_steps(steps: &[Arc<Step>], depth: usize) {
    let indent = "  ".repeat(depth);
    for (index, step) in steps.iter().enumerate() {
        match step.as_declaration() {
            Some(declaration) => println!(
                "{indent}{index}: {} {} = {}",
                step.kind().label(),
                declaration.name,
                declaration.value
            ),
            None => println!("{indent}{index}: {}", step.kind().label()),
        }
        for block in [Block::Then, Block::Else, Block::Body] {
            if let Some(children) = step.block(block).filter(|children| !children.is_empty()) {
                println!("{indent}  {block}:");
                print_steps(children, depth + 2);
            }
        }
    }
}
