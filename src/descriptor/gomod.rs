//! `go.mod` reader

use super::read_to_string;
use crate::versioning::VersioningError;
use std::path::{Path, PathBuf};

/// The parts of a modfile the versioning engine cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoModFile {
    path: PathBuf,
    module: Option<String>,
    go_version: Option<String>,
}

fn strip_comment(line: &str) -> &str {
    line.split_once("//").map_or(line, |(code, _)| code).trim()
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('`').and_then(|v| v.strip_suffix('`')))
        .unwrap_or(value)
}

impl GoModFile {
    /// Reads and parses a modfile.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, VersioningError> {
        let path = path.into();
        let raw = read_to_string(&path)?;
        Self::parse(&path, &raw)
    }

    /// Parses modfile text.
    pub fn parse(path: &Path, raw: &str) -> Result<Self, VersioningError> {
        let mut module = None;
        let mut go_version = None;
        let mut in_block = false;

        for (number, line) in raw.lines().enumerate() {
            let line = strip_comment(line);
            if line.is_empty() {
                continue;
            }
            if in_block {
                in_block = line != ")";
                continue;
            }
            let mut words = line.split_whitespace();
            let Some(verb) = words.next() else { continue };
            let args: Vec<&str> = words.collect();
            if args.last() == Some(&"(") {
                in_block = true;
                continue;
            }
            match verb {
                "module" => {
                    if module.is_some() {
                        return Err(VersioningError::parse(
                            path,
                            format!("repeated module statement on line {}", number + 1),
                        ));
                    }
                    let [name] = args.as_slice() else {
                        return Err(VersioningError::parse(
                            path,
                            format!("usage: module module/path (line {})", number + 1),
                        ));
                    };
                    module = Some(unquote(name).to_string());
                }
                "go" => go_version = args.first().map(|v| (*v).to_string()),
                "require" | "replace" | "exclude" | "retract" | "toolchain" | "godebug"
                | "tool" | "ignore" => {}
                other => {
                    return Err(VersioningError::parse(
                        path,
                        format!("unknown directive '{other}' on line {} in", number + 1),
                    ));
                }
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            module,
            go_version,
        })
    }

    /// Path of the modfile.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Declared module path, if any.
    #[must_use]
    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    /// `go` directive, if any.
    #[must_use]
    pub fn go_version(&self) -> Option<&str> {
        self.go_version.as_deref()
    }

    /// Splits the module path into `(dirname, basename)`.
    ///
    /// Both parts are empty when no module is declared.
    #[must_use]
    pub fn split_module(&self) -> (String, String) {
        match self.module.as_deref() {
            None | Some("") => (String::new(), String::new()),
            Some(module) => match module.rsplit_once('/') {
                Some((group, artifact)) => (group.to_string(), artifact.to_string()),
                None => (String::new(), module.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_module_and_blocks() {
        let raw = "// header\nmodule github.com/SAP/jenkins-library // main\n\ngo 1.22\n\nrequire (\n\tgithub.com/x/y v1.0.0\n)\nrequire github.com/a/b v0.1.0\n";
        let modfile = GoModFile::parse(Path::new("go.mod"), raw).unwrap();
        assert_eq!(modfile.module(), Some("github.com/SAP/jenkins-library"));
        assert_eq!(modfile.go_version(), Some("1.22"));
        assert_eq!(
            modfile.split_module(),
            ("github.com/SAP".to_string(), "jenkins-library".to_string())
        );
    }

    #[test]
    fn test_quoted_module() {
        let modfile = GoModFile::parse(Path::new("go.mod"), "module \"example.com/m\"\n").unwrap();
        assert_eq!(modfile.module(), Some("example.com/m"));
    }

    #[test]
    fn test_no_module() {
        let modfile = GoModFile::parse(Path::new("go.mod"), "go 1.21\n").unwrap();
        assert_eq!(modfile.split_module(), (String::new(), String::new()));
    }

    #[test]
    fn test_unknown_directive() {
        let err = GoModFile::parse(Path::new("go.mod"), "module a\nfoo bar\n").unwrap_err();
        assert!(matches!(err, VersioningError::Parse { .. }));
    }

    proptest! {
        #[test]
        fn split_joins_back(segments in prop::collection::vec("[a-z][a-z0-9-]{0,8}", 1..5)) {
            let module = segments.join("/");
            let modfile = GoModFile::parse(Path::new("go.mod"), &format!("module {module}\n")).unwrap();
            let (group, artifact) = modfile.split_module();
            prop_assert_eq!(&artifact, segments.last().unwrap());
            if group.is_empty() {
                prop_assert_eq!(artifact, module);
            } else {
                prop_assert_eq!(format!("{group}/{artifact}"), module);
            }
        }
    }
}
