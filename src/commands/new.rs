//! Create a new Markdown page

use anyhow::{bail, Result};
use serde_yaml::Value;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::content::Metadata;
use crate::Markfolio;

/// Layout used when neither the command line nor the config names one
pub const FALLBACK_LAYOUT: &str = "layouts.app";

/// Options for [`create_page`]
#[derive(Debug, Default, Clone)]
pub struct NewPage {
    pub title: Option<String>,
    pub layout: Option<String>,
    pub force: bool,
}

/// Result of [`create_page`]
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedPage {
    pub file: PathBuf,
    pub url: String,
}

/// Scaffold a page at `path` under the content root.
///
/// An existing file is only replaced when `force` is set or `confirm`
/// agrees; otherwise `None` is returned and nothing is written.
pub fn create_page<F>(
    app: &Markfolio,
    path: &str,
    options: &NewPage,
    confirm: F,
) -> Result<Option<CreatedPage>>
where
    F: FnOnce(&Path) -> bool,
{
    let rel = path.trim_matches('/');
    let rel = rel.strip_suffix(".md").unwrap_or(rel);
    let escapes = Path::new(rel)
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if rel.is_empty() || escapes {
        bail!("Invalid page path: {}", path);
    }

    let file = app.content_dir.join(format!("{}.md", rel));
    if file.exists() && !options.force && !confirm(&file) {
        return Ok(None);
    }

    let title = options
        .title
        .clone()
        .unwrap_or_else(|| title_from_path(rel));
    let layout = options
        .layout
        .clone()
        .or_else(|| app.config.default_layout.clone())
        .unwrap_or_else(|| FALLBACK_LAYOUT.to_string());

    let mut meta = Metadata::new();
    meta.insert("title".to_string(), Value::String(title.clone()));
    meta.insert("layout".to_string(), Value::String(layout));
    meta.insert(
        "created_at".to_string(),
        Value::String(chrono::Local::now().to_rfc3339()),
    );

    let content = format!(
        "---\n{}---\n\n# {}\n\nWrite your markdown content here.\n",
        serde_yaml::to_string(&meta)?,
        title
    );

    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file, content)?;
    tracing::info!("Created {:?}", file);

    Ok(Some(CreatedPage {
        file,
        url: format!("/{}", rel),
    }))
}

/// Title-case the last path segment: `guides/getting-started` becomes
/// `Getting Started`
pub fn title_from_path(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run the new command
pub fn run(app: &Markfolio, path: &str, options: &NewPage) -> Result<()> {
    let created = create_page(app, path, options, |file| {
        super::confirm(&format!(
            "The file {} already exists. Do you want to overwrite it?",
            file.display()
        ))
    })?;

    match created {
        Some(page) => {
            println!("Markdown page created successfully: {}", page.file.display());
            println!("This page will be accessible at: {}", page.url);
        }
        None => println!("Aborted, nothing written."),
    }
    Ok(())
}
