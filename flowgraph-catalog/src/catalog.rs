//! # Function catalog
//!
//! The immutable, process-wide set of function definitions and the
//! category index derived from it.

use crate::definition::FunctionDefinition;
use crate::error::CatalogError;
use indexmap::IndexMap;
use serde::Serialize;

/// Category name to bare function names, both in catalog order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CategorizedIndex(IndexMap<String, Vec<String>>);

impl CategorizedIndex {
    /// Rebuilds the index from a definition list
    pub fn from_definitions<'a>(
        definitions: impl IntoIterator<Item = &'a FunctionDefinition>,
    ) -> Self {
        let mut index: IndexMap<String, Vec<String>> = IndexMap::new();
        for definition in definitions {
            if let Some(category) = definition.category() {
                index
                    .entry(category.to_string())
                    .or_default()
                    .push(definition.bare_name().to_string());
            }
        }
        Self(index)
    }

    pub fn get(&self, category: &str) -> Option<&[String]> {
        self.0.get(category).map(Vec::as_slice)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(category, names)| (category.as_str(), names.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FunctionCatalog {
    definitions: IndexMap<String, FunctionDefinition>,
    index: CategorizedIndex,
}

impl FunctionCatalog {
    /// Indexes `definitions` once, keeping their order
    pub fn load(
        definitions: impl IntoIterator<Item = FunctionDefinition>,
    ) -> Result<Self, CatalogError> {
        let mut by_name = IndexMap::new();
        for definition in definitions {
            if definition.define.split('.').count() < 3 {
                tracing::warn!(define = %definition.define, "malformed function name");
                return Err(CatalogError::MalformedName(definition.define));
            }
            if by_name.contains_key(&definition.define) {
                tracing::warn!(define = %definition.define, "duplicate function definition");
                return Err(CatalogError::DuplicateDefinition(definition.define));
            }
            by_name.insert(definition.define.clone(), definition);
        }

        let index = CategorizedIndex::from_definitions(by_name.values());
        tracing::debug!(
            functions = by_name.len(),
            categories = index.len(),
            "function catalog loaded"
        );
        Ok(Self {
            definitions: by_name,
            index,
        })
    }

    /// Category index, computed at load time
    pub fn categorize(&self) -> &CategorizedIndex {
        &self.index
    }

    pub fn find_by_name(&self, define: &str) -> Result<&FunctionDefinition, CatalogError> {
        self.definitions
            .get(define)
            .ok_or_else(|| CatalogError::NotFound(define.to_string()))
    }

    /// Last segment of a dot-qualified name
    pub fn bare_name(define: &str) -> Result<&str, CatalogError> {
        match define.rsplit_once('.') {
            Some((_, name)) => Ok(name),
            None => Err(CatalogError::MalformedName(define.to_string())),
        }
    }

    pub fn category_of(&self, define: &str) -> Result<&str, CatalogError> {
        self.find_by_name(define)?
            .category()
            .ok_or_else(|| CatalogError::MalformedName(define.to_string()))
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.index.categories()
    }

    /// Maps a search hit back to its definition
    pub fn resolve(
        &self,
        category: &str,
        bare_name: &str,
    ) -> Result<&FunctionDefinition, CatalogError> {
        self.definitions
            .values()
            .find(|d| d.category() == Some(category) && d.bare_name() == bare_name)
            .ok_or_else(|| CatalogError::NotFound(format!("{category}.{bare_name}")))
    }

    pub fn iter(&self) -> impl Iterator<Item = &FunctionDefinition> {
        self.definitions.values()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
