//! Maven POM reader
//!
//! Only reads literal element text; `${property}` placeholders are left for
//! the Maven evaluator to resolve.

use super::read_to_string;
use crate::versioning::VersioningError;
use once_cell::sync::Lazy;
use regex::Regex;
use roxmltree::{Document, Node};
use serde::Serialize;
use std::path::{Path, PathBuf};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{.*?\}").unwrap());

/// One `<dependency>` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PomDependency {
    /// `groupId`
    pub group_id: String,
    /// `artifactId`
    pub artifact_id: String,
    /// `version`, possibly empty when managed by a parent
    pub version: String,
    /// `scope`, empty for compile scope
    pub scope: String,
}

/// Top-level coordinates and structure of a `pom.xml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Pom {
    /// Path the POM was read from
    #[serde(skip)]
    pub path: PathBuf,
    /// `project.groupId`
    pub group_id: String,
    /// `project.artifactId`
    pub artifact_id: String,
    /// `project.version`
    pub version: String,
    /// `project.packaging`
    pub packaging: String,
    /// `project.modules.module`
    pub modules: Vec<String>,
    /// `project.dependencies.dependency`
    pub dependencies: Vec<PomDependency>,
}

fn child_text(node: Node<'_, '_>, name: &str) -> String {
    node.children()
        .find(|c| c.has_tag_name(name))
        .and_then(|c| c.text())
        .map(|t| t.trim().to_string())
        .unwrap_or_default()
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| c.has_tag_name(name))
}

impl Pom {
    /// Reads and parses a POM.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, VersioningError> {
        let path = path.into();
        let raw = read_to_string(&path)?;
        Self::parse(&path, &raw)
    }

    /// Parses POM text. `path` is only used for error reporting.
    pub fn parse(path: &Path, raw: &str) -> Result<Self, VersioningError> {
        let doc = Document::parse(raw)
            .map_err(|e| VersioningError::parse(path, format!("invalid POM ({e}) in")))?;
        let project = doc.root_element();
        if !project.has_tag_name("project") {
            return Err(VersioningError::parse(path, "missing <project> root in"));
        }

        let modules = child(project, "modules")
            .map(|m| {
                m.children()
                    .filter(|c| c.has_tag_name("module"))
                    .filter_map(|c| c.text())
                    .map(|t| t.trim().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let dependencies = child(project, "dependencies")
            .map(|d| {
                d.children()
                    .filter(|c| c.has_tag_name("dependency"))
                    .map(|dep| PomDependency {
                        group_id: child_text(dep, "groupId"),
                        artifact_id: child_text(dep, "artifactId"),
                        version: child_text(dep, "version"),
                        scope: child_text(dep, "scope"),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            path: path.to_path_buf(),
            group_id: child_text(project, "groupId"),
            artifact_id: child_text(project, "artifactId"),
            version: child_text(project, "version"),
            packaging: child_text(project, "packaging"),
            modules,
            dependencies,
        })
    }

    /// True when a value is empty or still holds a `${...}` placeholder.
    #[must_use]
    pub fn is_unresolved(value: &str) -> bool {
        value.is_empty() || PLACEHOLDER.is_match(value)
    }
}
