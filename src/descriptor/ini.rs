//! INI descriptor codec
//!
//! Line-oriented so comments, ordering and untouched sections survive a
//! write. Keys before the first `[section]` header belong to the default
//! section, addressed with an empty section name.

use super::{read_to_string, write};
use crate::versioning::VersioningError;
use std::path::{Path, PathBuf};

/// An INI file kept as raw lines.
#[derive(Debug, Clone)]
pub struct IniDescriptor {
    path: PathBuf,
    lines: Vec<String>,
}

fn section_header(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .map(str::trim)
}

fn key_value(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') || trimmed.starts_with(';') {
        return None;
    }
    let (key, value) = trimmed.split_once('=')?;
    Some((key.trim(), value.trim()))
}

impl IniDescriptor {
    /// Loads the file. An empty file is a valid, empty document.
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

    /// Line range `[start, end)` of a section's body.
    fn section_range(&self, section: &str) -> Option<(usize, usize)> {
        let start = if section.is_empty() {
            0
        } else {
            self.lines
                .iter()
                .position(|l| section_header(l) == Some(section))?
                + 1
        };
        let end = self.lines[start..]
            .iter()
            .position(|l| section_header(l).is_some())
            .map_or(self.lines.len(), |offset| start + offset);
        Some((start, end))
    }

    fn find(&self, section: &str, field: &str) -> Option<usize> {
        let (start, end) = self.section_range(section)?;
        (start..end).find(|&i| key_value(&self.lines[i]).is_some_and(|(k, _)| k == field))
    }

    /// Returns the value of `field` inside `section`.
    #[must_use]
    pub fn get(&self, section: &str, field: &str) -> Option<String> {
        let index = self.find(section, field)?;
        key_value(&self.lines[index]).map(|(_, v)| v.to_string())
    }

    /// Sets `field` inside `section`, creating either when missing.
    pub fn set(&mut self, section: &str, field: &str, value: &str) {
        let entry = format!("{field} = {value}");
        if let Some(index) = self.find(section, field) {
            self.lines[index] = entry;
            return;
        }
        match self.section_range(section) {
            Some((start, end)) => {
                // keep trailing blank lines after the new entry
                let mut insert_at = end;
                while insert_at > start && self.lines[insert_at - 1].trim().is_empty() {
                    insert_at -= 1;
                }
                self.lines.insert(insert_at, entry);
            }
            None => {
                if self.lines.last().is_some_and(|l| !l.trim().is_empty()) {
                    self.lines.push(String::new());
                }
                self.lines.push(format!("[{section}]"));
                self.lines.push(entry);
            }
        }
    }

    /// Renders the document with a trailing newline.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }

    /// Writes the document back to its path.
    pub fn save(&self) -> Result<(), VersioningError> {
        write(&self.path, &self.render())
    }
}
