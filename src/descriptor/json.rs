//! JSON descriptor codec

use super::{read_to_string, write};
use crate::versioning::VersioningError;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// A JSON object loaded from disk, key order preserved.
#[derive(Debug, Clone)]
pub struct JsonDescriptor {
    path: PathBuf,
    content: Map<String, Value>,
}

impl JsonDescriptor {
    /// Loads and parses the file. The top level must be an object.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, VersioningError> {
        let path = path.into();
        let raw = read_to_string(&path)?;
        let value: Value = serde_json::from_str(&raw)
            .map_err(|e| VersioningError::parse(&path, format!("invalid JSON ({e}) in")))?;
        match value {
            Value::Object(content) => Ok(Self { path, content }),
            _ => Err(VersioningError::parse(&path, "JSON root is not an object in")),
        }
    }

    /// Path of the descriptor.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns a top-level field rendered as a string.
    ///
    /// Numbers and booleans are rendered with their JSON text.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<String> {
        match self.content.get(field)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Sets a top-level field to a string value.
    pub fn set(&mut self, field: &str, value: &str) {
        self.content
            .insert(field.to_string(), Value::String(value.to_string()));
    }

    /// Serializes with two-space indentation.
    pub fn render(&self) -> Result<String, VersioningError> {
        serde_json::to_string_pretty(&self.content)
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

    fn fixture(content: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("package.json");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_get_and_set_preserve_other_fields() {
        let (_dir, path) = fixture(r#"{"name": "app", "version": "1.0.0", "count": 3}"#);
        let mut json = JsonDescriptor::load(&path).unwrap();
        assert_eq!(json.get("version").as_deref(), Some("1.0.0"));

        json.set("version", "1.1.0");
        json.save().unwrap();

        insta::assert_snapshot!(std::fs::read_to_string(&path).unwrap(), @r#"
        {
          "name": "app",
          "version": "1.1.0",
          "count": 3
        }
        "#);
    }

    #[test]
    fn test_numeric_field_is_readable() {
        let (_dir, path) = fixture(r#"{"version": 2}"#);
        let json = JsonDescriptor::load(&path).unwrap();
        assert_eq!(json.get("version").as_deref(), Some("2"));
    }

    #[test]
    fn test_rejects_non_object() {
        let (_dir, path) = fixture("[1, 2]");
        let err = JsonDescriptor::load(&path).unwrap_err();
        assert!(matches!(err, VersioningError::Parse { .. }));
    }
}
