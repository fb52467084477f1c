//! YAML descriptor codec

use super::{read_to_string, write};
use crate::versioning::VersioningError;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

/// A YAML mapping loaded from disk.
///
/// An empty file loads as an empty mapping so new fields can be created.
#[derive(Debug, Clone)]
pub struct YamlDescriptor {
    path: PathBuf,
    content: Mapping,
}

impl YamlDescriptor {
    /// Loads and parses the file.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, VersioningError> {
        let path = path.into();
        let raw = read_to_string(&path)?;
        let content = Self::parse(&path, &raw)?;
        Ok(Self { path, content })
    }

    fn parse(path: &Path, raw: &str) -> Result<Mapping, VersioningError> {
        if raw.trim().is_empty() {
            return Ok(Mapping::new());
        }
        match serde_yaml::from_str::<Value>(raw) {
            Ok(Value::Mapping(m)) => Ok(m),
            Ok(Value::Null) => Ok(Mapping::new()),
            Ok(_) => Err(VersioningError::parse(path, "YAML root is not a mapping in")),
            Err(e) => Err(VersioningError::parse(path, format!("invalid YAML ({e}) in"))),
        }
    }

    /// Path of the descriptor.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns a top-level scalar rendered as a string.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<String> {
        match self.content.get(field)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Sets a top-level field to a string scalar.
    pub fn set(&mut self, field: &str, value: &str) {
        self.content.insert(
            Value::String(field.to_string()),
            Value::String(value.to_string()),
        );
    }

    /// Serializes the mapping.
    pub fn render(&self) -> Result<String, VersioningError> {
        serde_yaml::to_string(&self.content)
            .map_err(|e| VersioningError::parse(&self.path, format!("failed to serialize ({e})")))
    }

    /// Writes the document back to its path.
    pub fn save(&self) -> Result<(), VersioningError> {
        write(&self.path, &self.render()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_file_allows_new_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mta.yaml");
        std::fs::write(&path, "").unwrap();

        let mut yaml = YamlDescriptor::load(&path).unwrap();
        assert_eq!(yaml.get("version"), None);
        yaml.set("version", "1.0.0");
        yaml.save().unwrap();

        let reloaded = YamlDescriptor::load(&path).unwrap();
        assert_eq!(reloaded.get("version").as_deref(), Some("1.0.0"));
    }

    #[test]
    fn test_reads_scalar_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mta.yaml");
        std::fs::write(&path, "ID: com.sap.app\nversion: 1.2.3\n").unwrap();

        let yaml = YamlDescriptor::load(&path).unwrap();
        assert_eq!(yaml.get("ID").as_deref(), Some("com.sap.app"));
        assert_eq!(yaml.get("version").as_deref(), Some("1.2.3"));
    }

    #[test]
    fn test_invalid_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Chart.yaml");
        std::fs::write(&path, "{").unwrap();
        assert!(matches!(
            YamlDescriptor::load(&path),
            Err(VersioningError::Parse { .. })
        ));
    }
}
