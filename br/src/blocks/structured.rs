//! Structured (YAML) block sources
//!
//! The top level must be a mapping of block names to either a string or a
//! list of scalars. Lists are flattened by joining elements with a blank line.

use std::fmt;

use serde_yaml::Value;
use tracing::debug;

use super::{BlockMap, is_valid_name};

/// Separator placed between the elements of a list-valued block
pub const SEQUENCE_SEPARATOR: &str = "\n\n";

/// A shape problem found in a structured source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeProblem {
    /// The document's top level is not a mapping
    NotAMapping { found: &'static str },
    /// A top-level key is not a string
    NonStringKey { key: String },
    /// A key is a string but not a usable block name
    InvalidName { key: String },
    /// A block value is neither a string nor a list
    UnsupportedValue { key: String, found: &'static str },
    /// A list element cannot be converted to text
    UnsupportedElement {
        key: String,
        index: usize,
        found: &'static str,
    },
}

impl fmt::Display for ShapeProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeProblem::NotAMapping { found } => write!(f, "top level must be a mapping, found {}", found),
            ShapeProblem::NonStringKey { key } => write!(f, "block key {} is not a string", key),
            ShapeProblem::InvalidName { key } => {
                write!(f, "block name '{}' must match [A-Za-z0-9_-]+", key)
            }
            ShapeProblem::UnsupportedValue { key, found } => {
                write!(f, "block '{}' has unsupported value type {}", key, found)
            }
            ShapeProblem::UnsupportedElement { key, index, found } => write!(
                f,
                "block '{}' list element {} has unsupported type {}",
                key, index, found
            ),
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

fn describe_key(key: &Value) -> String {
    match serde_yaml::to_string(key) {
        Ok(s) => s.trim_end().to_string(),
        Err(_) => format!("<{}>", kind(key)),
    }
}

/// Parse YAML text into a document value
///
/// Anchors and aliases resolve to copies and `<<` merge keys are applied.
/// No object construction happens; custom tags stay as inert tagged values.
pub fn parse_document(text: &str) -> Result<Value, serde_yaml::Error> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    let mut value: Value = serde_yaml::from_str(text)?;
    value.apply_merge()?;
    Ok(value)
}

/// Flatten a block value to text
///
/// Only scalars with one obvious text form are converted: strings, numbers
/// and booleans. A null has no canonical spelling (`~`, `null`, empty) and a
/// nested list or mapping would need a rendering of its own, so those are
/// reported instead of being guessed at.
fn flatten(key: &str, value: &Value) -> Result<String, Vec<ShapeProblem>> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Sequence(items) => {
            let mut parts = Vec::with_capacity(items.len());
            let mut problems = Vec::new();
            for (index, item) in items.iter().enumerate() {
                match item {
                    Value::String(s) => parts.push(s.clone()),
                    Value::Number(n) => parts.push(n.to_string()),
                    Value::Bool(b) => parts.push(b.to_string()),
                    other => problems.push(ShapeProblem::UnsupportedElement {
                        key: key.to_string(),
                        index,
                        found: kind(other),
                    }),
                }
            }
            if problems.is_empty() {
                Ok(parts.join(SEQUENCE_SEPARATOR))
            } else {
                Err(problems)
            }
        }
        other => Err(vec![ShapeProblem::UnsupportedValue {
            key: key.to_string(),
            found: kind(other),
        }]),
    }
}

/// Extract blocks from a parsed document, reporting every shape problem
pub fn extract(document: &Value) -> Result<BlockMap, Vec<ShapeProblem>> {
    let Value::Mapping(mapping) = document else {
        debug!(found = kind(document), "structured::extract: top level is not a mapping");
        return Err(vec![ShapeProblem::NotAMapping { found: kind(document) }]);
    };

    let mut blocks = BlockMap::new();
    let mut problems = Vec::new();

    for (key, value) in mapping {
        let Value::String(name) = key else {
            problems.push(ShapeProblem::NonStringKey { key: describe_key(key) });
            continue;
        };
        if !is_valid_name(name) {
            problems.push(ShapeProblem::InvalidName { key: name.clone() });
            continue;
        }
        match flatten(name, value) {
            Ok(content) => {
                debug!(%name, len = content.len(), "structured::extract: extracted block");
                blocks.insert(name.clone(), content);
            }
            Err(mut found) => problems.append(&mut found),
        }
    }

    if problems.is_empty() { Ok(blocks) } else { Err(problems) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(text: &str) -> Result<BlockMap, Vec<ShapeProblem>> {
        extract(&parse_document(text).unwrap())
    }

    #[test]
    fn test_string_and_list_values() {
        let blocks = load("intro: Hello\nsteps:\n  - a\n  - b\n").unwrap();
        assert_eq!(blocks["intro"], "Hello");
        assert_eq!(blocks["steps"], "a\n\nb");
    }

    #[test]
    fn test_list_scalars_are_stringified_in_order() {
        let blocks = load("mixed: [one, 2, true]\n").unwrap();
        assert_eq!(blocks["mixed"], "one\n\n2\n\ntrue");
    }

    #[test]
    fn test_block_scalar_kept_verbatim() {
        let blocks = load("doc: |\n  line one\n  line two\n").unwrap();
        assert_eq!(blocks["doc"], "line one\nline two\n");
    }

    #[test]
    fn test_top_level_list_rejected() {
        let problems = load("- a\n- b\n").unwrap_err();
        assert_eq!(problems, vec![ShapeProblem::NotAMapping { found: "sequence" }]);
    }

    #[test]
    fn test_top_level_scalar_and_empty_rejected() {
        assert!(matches!(
            load("just text").unwrap_err()[0],
            ShapeProblem::NotAMapping { found: "string" }
        ));
        assert!(matches!(
            load("").unwrap_err()[0],
            ShapeProblem::NotAMapping { found: "null" }
        ));
    }

    #[test]
    fn test_non_string_key_rejected() {
        let problems = load("1: one\ngood: two\n").unwrap_err();
        assert_eq!(problems, vec![ShapeProblem::NonStringKey { key: "1".to_string() }]);
    }

    #[test]
    fn test_invalid_name_rejected() {
        let problems = load("has space: x\n").unwrap_err();
        assert!(matches!(&problems[0], ShapeProblem::InvalidName { key } if key == "has space"));
    }

    #[test]
    fn test_unsupported_values_all_reported() {
        let problems = load("a: 3\nb:\n  nested: x\nc: [ok, {k: v}]\nd: null\n").unwrap_err();
        assert_eq!(problems.len(), 4);
        assert!(problems.contains(&ShapeProblem::UnsupportedValue {
            key: "a".to_string(),
            found: "number"
        }));
        assert!(problems.contains(&ShapeProblem::UnsupportedValue {
            key: "b".to_string(),
            found: "mapping"
        }));
        assert!(problems.contains(&ShapeProblem::UnsupportedElement {
            key: "c".to_string(),
            index: 1,
            found: "mapping"
        }));
        assert!(problems.contains(&ShapeProblem::UnsupportedValue {
            key: "d".to_string(),
            found: "null"
        }));
    }

    #[test]
    fn test_null_and_nested_list_elements_rejected() {
        let problems = load("a: [text, ~]\nb: [[x, y]]\n").unwrap_err();
        assert_eq!(
            problems,
            vec![
                ShapeProblem::UnsupportedElement {
                    key: "a".to_string(),
                    index: 1,
                    found: "null"
                },
                ShapeProblem::UnsupportedElement {
                    key: "b".to_string(),
                    index: 0,
                    found: "sequence"
                },
            ]
        );
    }

    #[test]
    fn test_anchors_and_aliases_resolve() {
        let text = "base: &shared Shared text\ncopy: *shared\nlist:\n  - *shared\n  - more\n";
        let blocks = load(text).unwrap();
        assert_eq!(blocks["copy"], "Shared text");
        assert_eq!(blocks["list"], "Shared text\n\nmore");
    }

    #[test]
    fn test_custom_tags_are_inert() {
        let problems = load("evil: !shell echo hi\n").unwrap_err();
        assert!(matches!(
            &problems[0],
            ShapeProblem::UnsupportedValue { found: "tagged value", .. }
        ));
    }

    #[test]
    fn test_malformed_yaml_is_parse_error() {
        assert!(parse_document("key: [unclosed").is_err());
    }
}
