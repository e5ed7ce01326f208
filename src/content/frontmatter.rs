//! Front-matter parsing

use indexmap::IndexMap;
use serde_yaml::Value;

use crate::error::{Error, Result};

/// Ordered front-matter metadata. Keys keep the order they were written in.
pub type Metadata = IndexMap<String, Value>;

/// Marker line opening and closing the metadata block
const DELIMITER: &str = "---";

/// A document split into its metadata block and body
#[derive(Debug, Clone, PartialEq)]
pub struct FrontMatter {
    pub meta: Metadata,
}

impl FrontMatter {
    /// Parse front-matter from content string
    /// Returns (front_matter, remaining_content)
    ///
    /// The body starts after the closing marker line and, if present, one
    /// blank line. Input without an opening marker is all body.
    pub fn parse(content: &str) -> Result<(Self, &str)> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);

        let (first, rest) = split_line(content);
        if first.trim_end() != DELIMITER {
            return Ok((Self::empty(), content));
        }

        let mut offset = 0;
        let mut remaining = rest;
        loop {
            if remaining.is_empty() {
                return Err(Error::FrontMatter(
                    "unterminated front matter block".to_string(),
                ));
            }

            let (line, next) = split_line(remaining);
            if line.trim_end() == DELIMITER {
                let yaml = &rest[..offset];
                let body = strip_blank_line(next);
                return Ok((Self::from_yaml(yaml)?, body));
            }

            offset += remaining.len() - next.len();
            remaining = next;
        }
    }

    /// Front matter with no keys
    pub fn empty() -> Self {
        Self {
            meta: Metadata::new(),
        }
    }

    fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::empty());
        }

        let value: Value = serde_yaml::from_str(yaml)
            .map_err(|e| Error::FrontMatter(format!("invalid YAML: {}", e)))?;

        match value {
            Value::Null => Ok(Self::empty()),
            Value::Mapping(mapping) => {
                let mut meta = Metadata::with_capacity(mapping.len());
                for (key, value) in mapping {
                    let key = match key {
                        Value::String(s) => s,
                        Value::Number(n) => n.to_string(),
                        Value::Bool(b) => b.to_string(),
                        other => {
                            return Err(Error::FrontMatter(format!(
                                "unsupported key type: {:?}",
                                other
                            )))
                        }
                    };
                    meta.insert(key, value);
                }
                Ok(Self { meta })
            }
            _ => Err(Error::FrontMatter(
                "front matter must be a key-value mapping".to_string(),
            )),
        }
    }

    /// Get a string value for a key
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.meta.get(key).and_then(Value::as_str)
    }

    /// Title from the `title` key
    pub fn title(&self) -> Option<String> {
        self.meta.get("title").and_then(scalar_to_string)
    }

    /// Layout from the `layout` key
    pub fn layout(&self) -> Option<String> {
        self.meta
            .get("layout")
            .and_then(scalar_to_string)
            .filter(|s| !s.trim().is_empty())
    }
}

/// Convert a scalar YAML value to its string form
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        _ => None,
    }
}

/// Split off the first line, returning (line without terminator, rest)
fn split_line(s: &str) -> (&str, &str) {
    match s.find('\n') {
        Some(pos) => {
            let line = &s[..pos];
            (line.strip_suffix('\r').unwrap_or(line), &s[pos + 1..])
        }
        None => (s, ""),
    }
}

/// Drop a single leading blank line
fn strip_blank_line(s: &str) -> &str {
    s.strip_prefix("\r\n")
        .or_else(|| s.strip_prefix('\n'))
        .unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yaml_frontmatter() {
        let content = r#"---
title: Hello World
layout: layouts.app
tags:
  - rust
  - markdown
---

This is the content.
"#;

        let (fm, body) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.title(), Some("Hello World".to_string()));
        assert_eq!(fm.layout(), Some("layouts.app".to_string()));
        assert_eq!(
            fm.meta.get("tags"),
            Some(&serde_yaml::from_str::<Value>("[rust, markdown]").unwrap())
        );
        assert_eq!(body, "This is the content.\n");
    }

    #[test]
    fn test_keys_keep_order() {
        let content = "---\nzeta: 1\nalpha: 2\nmid: 3\n---\n\nbody";
        let (fm, _) = FrontMatter::parse(content).unwrap();
        let keys: Vec<_> = fm.meta.keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_body_is_exact_after_marker_and_blank_line() {
        let body = "# Title\n\n  indented\n\n---\nnot front matter\n";
        let content = format!("---\ntitle: T\n---\n\n{}", body);
        let (_, parsed) = FrontMatter::parse(&content).unwrap();
        assert_eq!(parsed, body);

        // without the blank line the body starts right after the marker
        let content = format!("---\ntitle: T\n---\n{}", body);
        let (_, parsed) = FrontMatter::parse(&content).unwrap();
        assert_eq!(parsed, body);

        // only one blank line is consumed
        let content = format!("---\ntitle: T\n---\n\n\n{}", body);
        let (_, parsed) = FrontMatter::parse(&content).unwrap();
        assert_eq!(parsed, format!("\n{}", body));
    }

    #[test]
    fn test_crlf_line_endings() {
        let content = "---\r\ntitle: Windows\r\n---\r\n\r\nBody\r\n";
        let (fm, body) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.title(), Some("Windows".to_string()));
        assert_eq!(body, "Body\r\n");
    }

    #[test]
    fn test_no_frontmatter() {
        let content = "# Just Markdown\n\nNo metadata here.";
        let (fm, body) = FrontMatter::parse(content).unwrap();
        assert!(fm.meta.is_empty());
        assert_eq!(fm.title(), None);
        assert_eq!(body, content);
    }

    #[test]
    fn test_empty_block() {
        let (fm, body) = FrontMatter::parse("---\n---\n\nBody").unwrap();
        assert!(fm.meta.is_empty());
        assert_eq!(body, "Body");
    }

    #[test]
    fn test_unterminated_block_is_error() {
        let err = FrontMatter::parse("---\ntitle: Never closed\n\nBody").unwrap_err();
        assert!(matches!(err, Error::FrontMatter(_)));
    }

    #[test]
    fn test_malformed_yaml_is_error() {
        let err = FrontMatter::parse("---\ntitle: [unclosed\n---\n\nBody").unwrap_err();
        assert!(matches!(err, Error::FrontMatter(_)));
    }

    #[test]
    fn test_non_mapping_is_error() {
        let err = FrontMatter::parse("---\n- just\n- a list\n---\n\nBody").unwrap_err();
        assert!(err.to_string().contains("mapping"));
    }

    #[test]
    fn test_scalar_values() {
        let content = "---\ntitle: 42\ncount: 7\npublished: true\nlayout: ''\n---\n";
        let (fm, body) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.title(), Some("42".to_string()));
        assert_eq!(fm.meta.get("count").and_then(Value::as_u64), Some(7));
        assert_eq!(fm.meta.get("published").and_then(Value::as_bool), Some(true));
        // empty layout counts as unset
        assert_eq!(fm.layout(), None);
        assert_eq!(body, "");
    }

    #[test]
    fn test_path_attached_to_error() {
        let err = FrontMatter::parse("---\ntitle: x\n")
            .unwrap_err()
            .with_path("content/bad.md");
        match err {
            Error::Parse { path, .. } => assert!(path.ends_with("bad.md")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
