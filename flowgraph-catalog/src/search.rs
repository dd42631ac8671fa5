//! # Search engine
//!
//! Query syntax: free text, optionally with one `[Category: <word>]`
//! directive anywhere in it. The engine returns every match; truncation for
//! display is a [`DisplayPolicy`] the caller applies.

use crate::catalog::FunctionCatalog;
use crate::error::CatalogError;
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

const CATEGORY_DIRECTIVE: &str = r"(?i)\[category:\s*(\w+)\s*\]";

/// Default number of names shown per category for an unfiltered query
pub const DEFAULT_MAX_PER_CATEGORY: usize = 10;

/// A raw query split into its directive and free-text parts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedQuery {
    pub term: String,
    pub category: Option<String>,
}

impl ParsedQuery {
    /// Whether the free-text part narrows the results
    pub fn has_term(&self) -> bool {
        !self.term.is_empty()
    }

    /// Whether a term or a category directive narrows the results
    pub fn is_filtered(&self) -> bool {
        self.has_term() || self.category.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct SearchEngine<'c> {
    catalog: &'c FunctionCatalog,
    directive: Regex,
}

impl<'c> SearchEngine<'c> {
    pub fn new(catalog: &'c FunctionCatalog) -> Result<Self, CatalogError> {
        Ok(Self {
            catalog,
            directive: Regex::new(CATEGORY_DIRECTIVE)?,
        })
    }

    pub fn catalog(&self) -> &'c FunctionCatalog {
        self.catalog
    }

    /// Extracts the first category directive; what remains is the term
    pub fn parse_query(&self, raw: &str) -> ParsedQuery {
        match self.directive.captures(raw) {
            Some(captures) => {
                let category = captures.get(1).map(|m| m.as_str().to_string());
                let range = captures.get(0).map_or(0..0, |m| m.range());
                let mut residual = String::with_capacity(raw.len());
                residual.push_str(&raw[..range.start]);
                residual.push_str(&raw[range.end..]);
                ParsedQuery {
                    term: residual.trim().to_string(),
                    category,
                }
            }
            None => ParsedQuery {
                term: raw.trim().to_string(),
                category: None,
            },
        }
    }

    pub fn search(&self, raw: &str) -> SearchResults {
        let query = self.parse_query(raw);
        let needle = query.term.to_lowercase();

        let mut categories = IndexMap::new();
        for (category, names) in self.catalog.categorize().iter() {
            if let Some(filter) = &query.category {
                if !category.eq_ignore_ascii_case(filter) {
                    continue;
                }
            }
            let hits: Vec<String> = names
                .iter()
                .filter(|name| name.to_lowercase().contains(&needle))
                .cloned()
                .collect();
            if !hits.is_empty() {
                categories.insert(category.to_string(), hits);
            }
        }

        tracing::debug!(
            term = %query.term,
            category = ?query.category,
            categories = categories.len(),
            "search"
        );
        SearchResults { query, categories }
    }
}

/// Untruncated search hits, category and name order as in the catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchResults {
    pub query: ParsedQuery,
    pub categories: IndexMap<String, Vec<String>>,
}

impl SearchResults {
    /// An empty result is a valid state, not a failure
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn get(&self, category: &str) -> Option<&[String]> {
        self.categories.get(category).map(Vec::as_slice)
    }

    pub fn total(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    /// Names to render under `policy`
    pub fn displayed(&self, policy: &DisplayPolicy) -> Vec<DisplayedCategory<'_>> {
        let cap = policy.cap_for(&self.query);
        self.categories
            .iter()
            .map(|(category, names)| {
                let shown = cap.map_or(names.len(), |cap| cap.min(names.len()));
                DisplayedCategory {
                    category: category.as_str(),
                    names: &names[..shown],
                    hidden: names.len() - shown,
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayedCategory<'a> {
    pub category: &'a str,
    pub names: &'a [String],
    /// Matches left out by the cap
    pub hidden: usize,
}

/// Per-category cap applied only to an unfiltered query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayPolicy {
    pub max_per_category: usize,
}

impl DisplayPolicy {
    pub fn new(max_per_category: usize) -> Self {
        Self { max_per_category }
    }

    /// No cap at all
    pub fn unlimited() -> Self {
        Self::new(usize::MAX)
    }

    pub fn cap_for(&self, query: &ParsedQuery) -> Option<usize> {
        if query.is_filtered() {
            None
        } else {
            Some(self.max_per_category)
        }
    }
}

impl Default for DisplayPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PER_CATEGORY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::FunctionDefinition;

    #[test]
    fn test_parse_query() {
        let catalog = FunctionCatalog::default();
        let engine = SearchEngine::new(&catalog).unwrap();

        assert_eq!(
            engine.parse_query("[Category: Math] comp"),
            ParsedQuery {
                term: "comp".into(),
                category: Some("Math".into()),
            }
        );
        assert_eq!(
            engine.parse_query("avg [category:string]"),
            ParsedQuery {
                term: "avg".into(),
                category: Some("string".into()),
            }
        );
        assert_eq!(
            engine.parse_query("  [Category: ] x "),
            ParsedQuery {
                term: "[Category: ] x".into(),
                category: None,
            }
        );
    }

    #[test]
    fn test_directive_is_case_insensitive() {
        let catalog = FunctionCatalog::load([
            FunctionDefinition::new("_functions.Math.Add", ""),
            FunctionDefinition::new("_functions.String.Concat", ""),
        ])
        .unwrap();
        let engine = SearchEngine::new(&catalog).unwrap();

        let results = engine.search("[CATEGORY: math]");
        assert_eq!(results.categories.keys().collect::<Vec<_>>(), vec!["Math"]);
        assert!(engine.search("[Category: Date]").is_empty());
        assert!(engine.search("zzz").is_empty());
    }

    #[test]
    fn test_policy_only_caps_unfiltered_queries() {
        let policy = DisplayPolicy::default();
        assert_eq!(policy.cap_for(&ParsedQuery::default()), Some(10));
        let narrowed = ParsedQuery {
            term: "a".into(),
            category: None,
        };
        assert_eq!(policy.cap_for(&narrowed), None);
        let directive_only = ParsedQuery {
            term: String::new(),
            category: Some("Math".into()),
        };
        assert_eq!(policy.cap_for(&directive_only), None);
    }
}
