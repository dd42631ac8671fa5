//! # Flowgraph Catalog
//!
//! Function catalog loading, category-directed search and example rendering

mod catalog;
mod definition;
mod error;
mod examples;
mod loader;
mod search;

pub use catalog::{CategorizedIndex, FunctionCatalog};
pub use definition::{DataEntry, FunctionDefinition, FunctionTest};
pub use error::CatalogError;
pub use examples::{create_examples, natural};
pub use loader::CatalogLoader;
pub use search::{
    DisplayPolicy, DisplayedCategory, ParsedQuery, SearchEngine, SearchResults,
    DEFAULT_MAX_PER_CATEGORY,
};

/// Prelude module for catalog functionality
pub mod prelude {
    pub use crate::{
        CatalogLoader, DisplayPolicy, FunctionCatalog, FunctionDefinition,
        SearchEngine, SearchResults,
    };
}
