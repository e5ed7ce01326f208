//! Markfolio configuration (markfolio.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default configuration file, as written by `markfolio publish`
pub const DEFAULT_CONFIG: &str = include_str!("markfolio.yml");

/// Name of the configuration file in the base directory
pub const CONFIG_FILE: &str = "markfolio.yml";

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkfolioConfig {
    pub content_directory: String,
    pub views_directory: String,
    pub public_directory: String,
    pub default_layout: Option<String>,
    pub cache: CacheConfig,
    pub debug: bool,
    pub routing: RoutingConfig,
    pub markdown: MarkdownConfig,
}

impl Default for MarkfolioConfig {
    fn default() -> Self {
        Self {
            content_directory: "resources/content".to_string(),
            views_directory: "resources/views".to_string(),
            public_directory: "public".to_string(),
            default_layout: None,
            cache: CacheConfig::default(),
            debug: false,
            routing: RoutingConfig::default(),
            markdown: MarkdownConfig::default(),
        }
    }
}

impl MarkfolioConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: MarkfolioConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from a variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(layout) = lookup("MARKFOLIO_DEFAULT_LAYOUT") {
            let layout = layout.trim();
            self.default_layout = if layout.is_empty() || layout == "null" {
                None
            } else {
                Some(layout.to_string())
            };
        }

        if let Some(dir) = lookup("MARKFOLIO_CONTENT_DIRECTORY") {
            if !dir.trim().is_empty() {
                self.content_directory = dir.trim().to_string();
            }
        }

        let debug = lookup("MARKFOLIO_DEBUG").or_else(|| lookup("APP_DEBUG"));
        if let Some(debug) = debug {
            self.debug = parse_flag(&debug);
        }

        // An explicitly empty layout in the file means "no layout"
        if self.default_layout.as_deref().map(str::trim) == Some("") {
            self.default_layout = None;
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Render and listing cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Time to live in seconds
    pub ttl: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: 3600,
        }
    }
}

/// Which request paths are eligible for Markdown resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub reserved: Vec<String>,
    pub excluded_prefixes: Vec<String>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            reserved: vec!["favicon.ico".to_string()],
            excluded_prefixes: vec!["_".to_string()],
        }
    }
}

/// Markdown rendering options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownConfig {
    pub highlight: bool,
    pub theme: String,
    pub line_numbers: bool,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            highlight: false,
            theme: "base16-ocean.dark".to_string(),
            line_numbers: false,
        }
    }
}
