//! `pyproject.toml` codec
//!
//! Reads `[project].name` and `[project].version` with a real TOML parser but
//! writes by literal substitution so comments and layout stay untouched.
//! Substitution is limited to the `[project]` table.

use super::{read_to_string, write};
use crate::versioning::VersioningError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::ops::Range;
use std::path::{Path, PathBuf};

static PROJECT_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*\[project\][ \t\r]*(#.*)?$").expect("valid regex"));
static TABLE_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*\[").expect("valid regex"));

/// File name a pyproject descriptor must carry.
pub const PYPROJECT_FILE: &str = "pyproject.toml";

#[derive(Debug, Deserialize)]
struct Document {
    project: Option<ProjectTable>,
}

#[derive(Debug, Deserialize)]
struct ProjectTable {
    name: Option<String>,
    version: Option<String>,
}

/// A parsed `pyproject.toml` together with its raw text.
#[derive(Debug, Clone)]
pub struct PyProject {
    path: PathBuf,
    raw: String,
    name: String,
    version: String,
}

impl PyProject {
    /// Loads the file. `name` and `version` are mandatory.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, VersioningError> {
        let path = path.into();
        if path.file_name().and_then(|n| n.to_str()) != Some(PYPROJECT_FILE) {
            return Err(VersioningError::Configuration(format!(
                "file '{}' is not a {PYPROJECT_FILE}",
                path.display()
            )));
        }
        let raw = read_to_string(&path)?;
        let doc: Document = toml::from_str(&raw)
            .map_err(|e| VersioningError::parse(&path, format!("invalid TOML ({e}) in")))?;

        let project = doc
            .project
            .ok_or_else(|| VersioningError::field_not_found(&path, "version"))?;
        let version = project
            .version
            .filter(|v| !v.is_empty())
            .ok_or_else(|| VersioningError::field_not_found(&path, "version"))?;
        let name = project
            .name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| VersioningError::field_not_found(&path, "name"))?;

        Ok(Self {
            path,
            raw,
            name,
            version,
        })
    }

    /// Path of the descriptor.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `[project].name`
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `[project].version`
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Replaces the `[project]` version assignment in the raw text and writes
    /// the file.
    pub fn set_version(&mut self, version: &str) -> Result<(), VersioningError> {
        let table = project_table(&self.raw)
            .ok_or_else(|| VersioningError::field_not_found(&self.path, "version"))?;
        let assignment = Regex::new(&format!(
            r#"(?m)^([ \t]*version[ \t]*=[ \t]*)(["']){}(["'])"#,
            regex::escape(&self.version)
        ))
        .map_err(|e| {
            VersioningError::parse(&self.path, format!("invalid version pattern ({e}) for"))
        })?;
        let caps = assignment
            .captures(&self.raw[table.clone()])
            .ok_or_else(|| VersioningError::field_not_found(&self.path, "version"))?;
        let Some(whole) = caps.get(0) else {
            return Err(VersioningError::field_not_found(&self.path, "version"));
        };

        let mut updated = String::with_capacity(self.raw.len() + version.len());
        updated.push_str(&self.raw[..table.start + whole.start()]);
        updated.push_str(&caps[1]);
        updated.push_str(&caps[2]);
        updated.push_str(version);
        updated.push_str(&caps[3]);
        updated.push_str(&self.raw[table.start + whole.end()..]);

        write(&self.path, &updated)?;
        tracing::info!(path = %self.path.display(), version, "Updated pyproject version");
        self.raw = updated;
        self.version = version.to_string();
        Ok(())
    }
}

/// Byte range of the `[project]` table body, up to the next table header.
fn project_table(raw: &str) -> Option<Range<usize>> {
    let start = PROJECT_HEADER.find(raw)?.end();
    let end = TABLE_HEADER.find_at(raw, start).map_or(raw.len(), |m| m.start());
    Some(start..end)
}
