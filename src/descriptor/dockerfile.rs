//! Dockerfile reader
//!
//! Line-oriented: only `FROM` and `ENV` instructions are interpreted.

use super::read_to_string;
use crate::versioning::VersioningError;
use std::path::{Path, PathBuf};

/// A Dockerfile held in memory.
#[derive(Debug, Clone)]
pub struct Dockerfile {
    path: PathBuf,
    content: String,
}

fn instruction<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let line = line.trim();
    let (keyword, rest) = line.split_once(char::is_whitespace)?;
    keyword.eq_ignore_ascii_case(name).then(|| rest.trim())
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(quote).and_then(|v| v.strip_suffix(quote)) {
            return inner;
        }
    }
    value
}

impl Dockerfile {
    /// Reads the file.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, VersioningError> {
        let path = path.into();
        let content = read_to_string(&path)?;
        Ok(Self { path, content })
    }

    /// Wraps already-read content.
    #[must_use]
    pub fn from_content(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Path of the Dockerfile.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Image reference of the first `FROM` line, flags skipped.
    #[must_use]
    pub fn base_image(&self) -> Option<&str> {
        self.content
            .lines()
            .find_map(|l| instruction(l, "FROM"))
            .and_then(|args| args.split_whitespace().find(|a| !a.starts_with("--")))
    }

    /// Tag of the first `FROM` image; empty when the image has no tag.
    ///
    /// A `:` that belongs to a registry port (`host:5000/image`) is not a tag.
    #[must_use]
    pub fn base_image_tag(&self) -> String {
        let Some(image) = self.base_image() else {
            return String::new();
        };
        let image = image.split_once('@').map_or(image, |(name, _)| name);
        match image.rsplit_once(':') {
            Some((_, tag)) if !tag.contains('/') => tag.to_string(),
            _ => String::new(),
        }
    }

    /// Value of `ENV name` in either `ENV name value` or `ENV name=value` form.
    ///
    /// The last assignment wins, matching Docker's own semantics.
    #[must_use]
    pub fn env(&self, name: &str) -> Option<String> {
        let mut found = None;
        for args in self.content.lines().filter_map(|l| instruction(l, "ENV")) {
            let first = args.split_whitespace().next().unwrap_or_default();
            if first.contains('=') {
                for pair in args.split_whitespace() {
                    if let Some((key, value)) = pair.split_once('=')
                        && key == name
                    {
                        found = Some(unquote(value).to_string());
                    }
                }
            } else if first == name {
                found = Some(unquote(args[first.len()..].trim()).to_string());
            }
        }
        found
    }
}
