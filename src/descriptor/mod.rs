//! Build descriptor codecs
//!
//! Each codec loads a descriptor into memory, exposes its fields and writes
//! it back. Codecs only touch the fields they are asked to change; the rest
//! of the document survives a load/save cycle as far as the format allows.
//!
//! | Codec | Format |
//! |-------|--------|
//! | [`JsonDescriptor`] | `package.json`, `dub.json`, `sbtDescriptor.json` |
//! | [`YamlDescriptor`] | `mta.yaml`, `Chart.yaml`, custom YAML |
//! | [`PyProject`] | `pyproject.toml` |
//! | [`IniDescriptor`] | `setup.cfg` and other INI files |
//! | [`PropertiesDescriptor`] | `gradle.properties` and Java properties |
//! | [`VersionFile`] | `VERSION`, `version.txt` |
//! | [`Pom`] | `pom.xml` |
//! | [`GoModFile`] | `go.mod` |
//! | [`Dockerfile`] | `Dockerfile` |

pub mod dockerfile;
pub mod gomod;
pub mod ini;
pub mod json;
pub mod pom;
pub mod properties;
pub mod pyproject;
pub mod version_file;
pub mod yaml;

pub use dockerfile::Dockerfile;
pub use gomod::GoModFile;
pub use ini::IniDescriptor;
pub use json::JsonDescriptor;
pub use pom::{Pom, PomDependency};
pub use properties::PropertiesDescriptor;
pub use pyproject::PyProject;
pub use version_file::VersionFile;
pub use yaml::YamlDescriptor;

use crate::versioning::VersioningError;
use std::fs;
use std::path::{Path, PathBuf};

/// Reads a descriptor as UTF-8 text.
pub fn read_to_string(path: &Path) -> Result<String, VersioningError> {
    tracing::debug!(path = %path.display(), "Reading descriptor");
    fs::read_to_string(path).map_err(|e| VersioningError::read(path, &e))
}

/// Writes a descriptor, replacing any previous content.
pub fn write(path: &Path, content: &str) -> Result<(), VersioningError> {
    tracing::debug!(path = %path.display(), bytes = content.len(), "Writing descriptor");
    fs::write(path, content).map_err(|e| VersioningError::write(path, &e))
}

/// Returns the first candidate that exists below `base`.
///
/// The returned path keeps the candidate's relative form when `base` is
/// the current directory.
pub fn search(base: &Path, candidates: &[&str]) -> Result<PathBuf, VersioningError> {
    candidates
        .iter()
        .map(|c| base.join(c))
        .find(|p| p.is_file())
        .ok_or_else(|| {
            VersioningError::Configuration(format!(
                "no build descriptor available, supported: [{}]",
                candidates.join(" ")
            ))
        })
}

/// Returns the first file matching a glob pattern, in sorted order.
pub fn find_first(pattern: &str) -> Option<PathBuf> {
    let mut matches: Vec<PathBuf> = glob::glob(pattern).ok()?.filter_map(Result::ok).collect();
    matches.sort();
    matches.into_iter().next()
}
