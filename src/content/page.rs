//! Page view data

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use super::frontmatter::{scalar_to_string, Metadata};

/// A loaded document, ready to hand to a view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageData {
    /// Title from front matter, if any
    pub title: Option<String>,

    /// Rendered HTML body
    pub content: String,

    /// Every front-matter key, in file order
    pub meta: Metadata,

    /// Layout from front matter or the configured default
    pub layout: Option<String>,

    /// Path relative to the content root, without extension
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// URL the page is served at
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl PageData {
    /// Look up a front-matter value
    pub fn meta_value(&self, key: &str) -> Option<&Value> {
        self.meta.get(key)
    }

    /// `description` front-matter value, empty when unset
    pub fn description(&self) -> String {
        self.meta
            .get("description")
            .and_then(scalar_to_string)
            .unwrap_or_default()
    }

    /// Publication status; documents without one count as published
    pub fn status(&self) -> Option<String> {
        self.meta.get("status").and_then(scalar_to_string)
    }

    /// Identity used to deduplicate listings
    pub fn key(&self) -> &str {
        self.path.as_deref().unwrap_or_default()
    }
}
