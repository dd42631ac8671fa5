use crate::catalog::FunctionCatalog;
use crate::definition::FunctionDefinition;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Loads the function catalog from JSON or YAML
pub struct CatalogLoader;

impl CatalogLoader {
    /// Parses and indexes a YAML catalog file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<FunctionCatalog> {
        let content = fs::read_to_string(&path).with_context(|| {
            format!("Failed to read YAML file: {:?}", path.as_ref())
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<FunctionCatalog> {
        let definitions: Vec<FunctionDefinition> = serde_yaml::from_str(content)
            .with_context(|| "Failed to parse YAML catalog")?;
        Self::index(definitions)
    }

    /// Parses and indexes a JSON catalog file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<FunctionCatalog> {
        let content = fs::read_to_string(&path).with_context(|| {
            format!("Failed to read JSON file: {:?}", path.as_ref())
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<FunctionCatalog> {
        let definitions: Vec<FunctionDefinition> = serde_json::from_str(content)
            .with_context(|| "Failed to parse JSON catalog")?;
        Self::index(definitions)
    }

    /// Picks the format from the file extension; anything but `.yaml`/`.yml` is JSON
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<FunctionCatalog> {
        let is_yaml = path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
        if is_yaml {
            Self::from_yaml_file(path)
        } else {
            Self::from_json_file(path)
        }
    }

    pub fn save_to_json<P: AsRef<Path>>(catalog: &FunctionCatalog, path: P) -> Result<()> {
        let definitions: Vec<&FunctionDefinition> = catalog.iter().collect();
        let json_content = serde_json::to_string_pretty(&definitions)
            .with_context(|| "Failed to serialize catalog to JSON")?;

        fs::write(&path, json_content).with_context(|| {
            format!("Failed to write JSON file: {:?}", path.as_ref())
        })?;
        Ok(())
    }

    pub fn save_to_yaml<P: AsRef<Path>>(catalog: &FunctionCatalog, path: P) -> Result<()> {
        let definitions: Vec<&FunctionDefinition> = catalog.iter().collect();
        let yaml_content = serde_yaml::to_string(&definitions)
            .with_context(|| "Failed to serialize catalog to YAML")?;

        fs::write(&path, yaml_content).with_context(|| {
            format!("Failed to write YAML file: {:?}", path.as_ref())
        })?;
        Ok(())
    }

    fn index(definitions: Vec<FunctionDefinition>) -> Result<FunctionCatalog> {
        FunctionCatalog::load(definitions).with_context(|| "Invalid function catalog")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
- define: _functions.Math.Add
  description: Adds numbers
  parameters:
    a: { type: _types.Number }
    b: { type: _types.Number }
  tests:
    first:
      description: two plus three
      input: { a: 2, b: 3 }
      expected: 5
- define: _functions.String.Concat
  description: Joins strings
"#;

    #[test]
    fn test_yaml_catalog() {
        let catalog = CatalogLoader::from_yaml_str(YAML).unwrap();
        assert_eq!(catalog.len(), 2);
        let add = catalog.find_by_name("_functions.Math.Add").unwrap();
        assert_eq!(add.parameters.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(add.examples(), vec!["Add(2, 3) => 5"]);
    }

    #[test]
    fn test_invalid_catalog_has_context() {
        let error = CatalogLoader::from_json_str(
            r#"[{"define": "_functions.Math.Add"}, {"define": "_functions.Math.Add"}]"#,
        )
        .unwrap_err();
        assert!(format!("{error:#}").contains("defined more than once"));

        assert!(CatalogLoader::from_json_str("{").is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let catalog = CatalogLoader::from_yaml_str(YAML).unwrap();
        let path = std::env::temp_dir().join(format!("catalog-{}.json", std::process::id()));
        CatalogLoader::save_to_json(&catalog, &path).unwrap();
        let reloaded = CatalogLoader::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(
            reloaded.iter().map(|d| d.define.as_str()).collect::<Vec<_>>(),
            catalog.iter().map(|d| d.define.as_str()).collect::<Vec<_>>()
        );
    }
}
