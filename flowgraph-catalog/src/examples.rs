//! # Example generator
//!
//! Renders recorded test cases as `Name(args) => expected` strings.

use crate::definition::FunctionTest;
use flowgraph_core::normalize_numbers;
use indexmap::IndexMap;
use serde_json::Value;

/// One string per test, in test-map order. Inputs are JSON-encoded in the
/// order the test lists them; the expected value is shown in natural form.
pub fn create_examples(
    bare_name: &str,
    tests: Option<&IndexMap<String, FunctionTest>>,
) -> Vec<String> {
    let Some(tests) = tests else {
        return Vec::new();
    };
    tests
        .values()
        .map(|test| {
            let arguments = test
                .input
                .values()
                .map(|value| normalize_numbers(value).to_string())
                .collect::<Vec<_>>()
                .join(", ");
            format!("{bare_name}({arguments}) => {}", natural(&test.expected))
        })
        .collect()
}

/// Strings print without quotes, arrays as comma-joined elements and
/// whole numbers without a fraction
pub fn natural(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(natural).collect::<Vec<_>>().join(","),
        other => normalize_numbers(other).to_string(),
    }
}
