//! Java properties codec (`gradle.properties` and friends)

use super::{read_to_string, write};
use crate::versioning::VersioningError;
use std::path::{Path, PathBuf};

/// A properties file kept as raw lines, key order preserved.
#[derive(Debug, Clone)]
pub struct PropertiesDescriptor {
    path: PathBuf,
    lines: Vec<String>,
}

fn entry(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
        return None;
    }
    let (key, value) = trimmed.split_once('=')?;
    Some((key.trim_end(), value.trim()))
}

impl PropertiesDescriptor {
    /// Loads the file.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, VersioningError> {
        let path = path.into();
        let raw = read_to_string(&path)?;
        Ok(Self {
            path,
            lines: raw.lines().map(str::to_string).collect(),
        })
    }

    /// Path of the descriptor.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the value of a property.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.lines
            .iter()
            .filter_map(|l| entry(l))
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
    }

    /// Sets a property in place, appending it when absent.
    pub fn set(&mut self, key: &str, value: &str) {
        let line = format!("{key}={value}");
        match self
            .lines
            .iter()
            .position(|l| entry(l).is_some_and(|(k, _)| k == key))
        {
            Some(index) => self.lines[index] = line,
            None => self.lines.push(line),
        }
    }

    /// Writes the file back.
    pub fn save(&self) -> Result<(), VersioningError> {
        let mut out = self.lines.join("\n");
        out.push('\n');
        write(&self.path, &out)
    }
}
