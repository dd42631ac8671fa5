use flowgraph::catalog::{CatalogLoader, DisplayPolicy, SearchEngine};

const CATALOG: &str = include_str!("data/functions.yaml");

fn main() -> anyhow::Result<()> {
    println!("=== Function Catalog Search Demo ===\n");

    let catalog = CatalogLoader::from_yaml_str(CATALOG)?;
    let engine = SearchEngine::new(&catalog)?;
    println!("{} functions in {} categories\n", catalog.len(), catalog.categories().count());

    for query in ["", "comp", "[Category: Math] a", "[category: string]", "[Category: Time]"] {
        println!("Query {query:?}:");
        let results = engine.search(query);
        if results.is_empty() {
            println!("  no functions found\n");
            continue;
        }
        for shown in results.displayed(&DisplayPolicy::new(2)) {
            println!("  {}: {}", shown.category, shown.names.join(", "));
            if shown.hidden > 0 {
                println!("    ... {} more", shown.hidden);
            }
        }
        println!();
    }

    let add = catalog.resolve("Math", "Add")?;
    println!("{} - {}", add.bare_name(), add.description);
    for example in add.examples() {
        println!("  {example}");
    }

    println!("\n=== Demo Completed ===");
    Ok(())
}
