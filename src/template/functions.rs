//! Hermetic template functions
//!
//! String helpers only: nothing here reads files, the environment or the
//! network. Names and argument order follow the common Go template helper
//! set, so the piped value is always the last argument.

use super::Value;
use std::collections::BTreeMap;

const FUNCTIONS: [&str; 14] = [
    "cat",
    "default",
    "join",
    "list",
    "lower",
    "replace",
    "split",
    "splitList",
    "trim",
    "trimAll",
    "trimPrefix",
    "trimSuffix",
    "upper",
    "quote",
];

pub(crate) fn exists(name: &str) -> bool {
    FUNCTIONS.contains(&name)
}

fn arity(name: &str, args: &[Value], want: usize) -> Result<(), String> {
    if args.len() == want {
        Ok(())
    } else {
        Err(format!(
            "wrong number of args for {name}: want {want} got {}",
            args.len()
        ))
    }
}

fn text(args: &[Value], i: usize) -> String {
    args.get(i).map(Value::as_text).unwrap_or_default()
}

pub(crate) fn call(name: &str, args: Vec<Value>) -> Result<Value, String> {
    let value = match name {
        "list" => Value::List(args),
        "cat" => Value::Str(
            args.iter()
                .filter(|v| !v.is_nil())
                .map(Value::as_text)
                .collect::<Vec<_>>()
                .join(" "),
        ),
        "default" => {
            if args.is_empty() || args.len() > 2 {
                return Err(format!(
                    "wrong number of args for default: want 1 or 2 got {}",
                    args.len()
                ));
            }
            let mut args = args.into_iter();
            let fallback = args.next().unwrap_or(Value::Nil);
            match args.next() {
                Some(given) if !given.is_empty() => given,
                _ => fallback,
            }
        }
        "join" => {
            arity(name, &args, 2)?;
            let separator = text(&args, 0);
            match &args[1] {
                Value::List(items) => Value::Str(
                    items
                        .iter()
                        .filter(|v| !v.is_nil())
                        .map(Value::as_text)
                        .collect::<Vec<_>>()
                        .join(&separator),
                ),
                other => Value::Str(other.as_text()),
            }
        }
        "split" | "splitList" => {
            arity(name, &args, 2)?;
            let separator = text(&args, 0);
            let subject = text(&args, 1);
            let parts = subject.split(separator.as_str()).map(|p| Value::Str(p.to_string()));
            if name == "split" {
                Value::Map(
                    parts
                        .enumerate()
                        .map(|(i, p)| (format!("_{i}"), p))
                        .collect::<BTreeMap<_, _>>(),
                )
            } else {
                Value::List(parts.collect())
            }
        }
        "replace" => {
            arity(name, &args, 3)?;
            Value::Str(text(&args, 2).replace(&text(&args, 0), &text(&args, 1)))
        }
        "trimAll" => {
            arity(name, &args, 2)?;
            let cutset = text(&args, 0);
            Value::Str(text(&args, 1).trim_matches(|c: char| cutset.contains(c)).to_string())
        }
        "trimPrefix" => {
            arity(name, &args, 2)?;
            let subject = text(&args, 1);
            let prefix = text(&args, 0);
            Value::Str(subject.strip_prefix(prefix.as_str()).unwrap_or(&subject).to_string())
        }
        "trimSuffix" => {
            arity(name, &args, 2)?;
            let subject = text(&args, 1);
            let suffix = text(&args, 0);
            Value::Str(subject.strip_suffix(suffix.as_str()).unwrap_or(&subject).to_string())
        }
        "trim" | "lower" | "upper" | "quote" => {
            arity(name, &args, 1)?;
            let subject = text(&args, 0);
            Value::Str(match name {
                "trim" => subject.trim().to_string(),
                "lower" => subject.to_lowercase(),
                "upper" => subject.to_uppercase(),
                _ => format!("{subject:?}"),
            })
        }
        other => return Err(format!("function {other:?} not defined")),
    };
    Ok(value)
}
