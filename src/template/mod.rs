//! Sandboxed text templates
//!
//! A small Go-template compatible engine used to render project names and
//! version models from [`Coordinates`](crate::versioning::Coordinates).
//! Templates only see the data they are given; the function set is limited
//! to string helpers.
//!
//! ```
//! use steplib::template::{Template, Value};
//!
//! let data = Value::map([("GroupID", "com.test.pkg"), ("ArtifactID", "analyzer")]);
//! let template = Template::parse("name", r#"{{list .GroupID .ArtifactID | join "-"}}"#)?;
//! assert_eq!(template.render(&data)?, "com.test.pkg-analyzer");
//! # Ok::<(), steplib::template::TemplateError>(())
//! ```

mod functions;
mod parser;

use crate::errors::ErrorKind;
use parser::{Command, Node, Operand, Pipeline};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Rendered in place of a missing value.
pub const NO_VALUE: &str = "<no value>";

/// Template errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// Template source is malformed
    #[error("template: {name}: {message}")]
    Parse {
        /// Template name.
        name: String,
        /// Parser message.
        message: String,
    },

    /// Template failed while rendering
    #[error("template: {name}: executing: {message}")]
    Execute {
        /// Template name.
        name: String,
        /// What went wrong.
        message: String,
    },
}

impl TemplateError {
    /// Classifies the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Execute { .. } => ErrorKind::Configuration,
        }
    }
}

/// Data a template operates on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Value {
    /// Missing value
    #[default]
    Nil,
    /// String
    Str(String),
    /// Ordered list
    List(Vec<Value>),
    /// String keyed map; fields are looked up here
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Map of string values.
    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), Self::Str(v.into())))
                .collect(),
        )
    }

    /// True for [`Value::Nil`].
    #[must_use]
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Nil, the empty string and empty collections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Nil => true,
            Self::Str(s) => s.is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Map(entries) => entries.is_empty(),
        }
    }

    /// Text used when the value is a function argument; nil is empty.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::Nil => String::new(),
            Self::Str(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn field(&self, name: &str) -> Result<Self, String> {
        match self {
            Self::Map(entries) => Ok(entries.get(name).cloned().unwrap_or_default()),
            Self::Nil => Ok(Self::Nil),
            Self::Str(_) => Err(format!("can't evaluate field {name} in type string")),
            Self::List(_) => Err(format!("can't evaluate field {name} in type list")),
        }
    }

    fn path(&self, path: &[String]) -> Result<Self, String> {
        path.iter()
            .try_fold(self.clone(), |value, name| value.field(name))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => f.write_str(NO_VALUE),
            Self::Str(s) => f.write_str(s),
            Self::List(items) => {
                let items: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", items.join(" "))
            }
            Self::Map(entries) => {
                let entries: Vec<String> =
                    entries.iter().map(|(k, v)| format!("{k}:{v}")).collect();
                write!(f, "map[{}]", entries.join(" "))
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    name: String,
    nodes: Vec<Node>,
}

impl Template {
    /// Parses `source`; `name` only appears in error messages.
    pub fn parse(name: &str, source: &str) -> Result<Self, TemplateError> {
        let nodes = parser::parse(source).map_err(|message| TemplateError::Parse {
            name: name.to_string(),
            message,
        })?;
        Ok(Self {
            name: name.to_string(),
            nodes,
        })
    }

    /// Template name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renders the template with `data` as `.`.
    pub fn render(&self, data: &Value) -> Result<String, TemplateError> {
        let mut out = String::new();
        for node in &self.nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Action(pipeline) => {
                    let value = eval_pipeline(pipeline, data).map_err(|message| {
                        TemplateError::Execute {
                            name: self.name.clone(),
                            message,
                        }
                    })?;
                    out.push_str(&value.to_string());
                }
            }
        }
        Ok(out)
    }
}

/// Parses and renders in one step.
pub fn render(source: &str, data: &Value) -> Result<String, TemplateError> {
    Template::parse("template", source)?.render(data)
}

fn eval_pipeline(pipeline: &Pipeline, dot: &Value) -> Result<Value, String> {
    let mut piped = None;
    for command in &pipeline.commands {
        piped = Some(eval_command(command, dot, piped)?);
    }
    Ok(piped.unwrap_or_default())
}

fn eval_command(command: &Command, dot: &Value, piped: Option<Value>) -> Result<Value, String> {
    let Some((first, rest)) = command.operands.split_first() else {
        return Err("empty command".to_string());
    };
    match first {
        Operand::Function(name) => {
            let mut args = rest
                .iter()
                .map(|operand| eval_operand(operand, dot))
                .collect::<Result<Vec<_>, _>>()?;
            args.extend(piped);
            functions::call(name, args).map_err(|e| format!("error calling {name}: {e}"))
        }
        operand => {
            if !rest.is_empty() || piped.is_some() {
                return Err("can't give argument to non-function".to_string());
            }
            eval_operand(operand, dot)
        }
    }
}

fn eval_operand(operand: &Operand, dot: &Value) -> Result<Value, String> {
    match operand {
        Operand::Dot => Ok(dot.clone()),
        Operand::Field(path) => dot.path(path),
        Operand::Function(name) => functions::call(name, Vec::new()),
        Operand::Literal(value) => Ok(value.clone()),
        Operand::Group(pipeline, path) => eval_pipeline(pipeline, dot)?.path(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn coordinates() -> Value {
        Value::map([
            ("GroupID", "com.test.pkg"),
            ("ArtifactID", "analyzer"),
            ("Version", "1.2.3-20200101"),
        ])
    }

    #[test]
    fn test_default_name_template() {
        let out = render(
            r#"{{list .GroupID .ArtifactID | join "-" | trimAll "-"}}"#,
            &coordinates(),
        )
        .unwrap();
        assert_eq!(out, "com.test.pkg-analyzer");
    }

    #[test]
    fn test_empty_group_is_trimmed() {
        let data = Value::map([("GroupID", ""), ("ArtifactID", "analyzer")]);
        let out = render(r#"{{list .GroupID .ArtifactID | join "-" | trimAll "-"}}"#, &data)
            .unwrap();
        assert_eq!(out, "analyzer");
    }

    #[test]
    fn test_nested_split() {
        let out = render(
            r#"{{(split "." (split "-" .Version)._0)._0}}.{{(split "." (split "-" .Version)._0)._1}}"#,
            &coordinates(),
        )
        .unwrap();
        assert_eq!(out, "1.2");
    }

    #[test]
    fn test_missing_values_render_placeholder() {
        assert_eq!(render("{{.Missing}}", &coordinates()).unwrap(), NO_VALUE);
        assert_eq!(
            render(r#"{{(split "." "1")._1}}"#, &Value::Nil).unwrap(),
            NO_VALUE
        );
    }

    #[test]
    fn test_execute_errors() {
        let err = render("{{.Version.Major}}", &coordinates()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "template: template: executing: can't evaluate field Major in type string"
        );
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let err = render(r#"{{.Version | "x"}}"#, &coordinates()).unwrap_err();
        assert!(err.to_string().contains("can't give argument to non-function"));
    }

    #[test]
    fn test_parse_error_kind() {
        let err = Template::parse("name", "{{env \"HOME\"}}").unwrap_err();
        assert_eq!(err.to_string(), "template: name: function \"env\" not defined");
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_value_display() {
        let list = Value::List(vec!["a".into(), Value::Nil]);
        assert_eq!(list.to_string(), "[a <no value>]");
        assert_eq!(Value::map([("_0", "1")]).to_string(), "map[_0:1]");
    }
}
