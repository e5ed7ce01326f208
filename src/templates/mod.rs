//! View rendering using the Tera template engine
//!
//! Layouts are plain Tera templates loaded from the views directory and
//! registered by their relative path (`layouts/app.html`). Two built-in
//! views are embedded in the binary and may be overridden by files under
//! `{views}/vendor/markfolio/`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tera::{Context, Tera};
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Complete HTML document for pages without a layout
pub const DIRECT_VIEW: &str = "markfolio/markdown-direct.html";

/// Content wrapper injected into a layout
pub const WRAPPER_VIEW: &str = "markfolio/markdown.html";

/// Built-in view sources, keyed by view name
pub const BUILTIN_VIEWS: [(&str, &str); 2] = [
    (DIRECT_VIEW, include_str!("views/markdown-direct.html")),
    (WRAPPER_VIEW, include_str!("views/markdown.html")),
];

/// Directory under the views root whose files replace the built-ins
const VENDOR_DIR: &str = "vendor/markfolio";

/// Something that can render a named view with JSON data
pub trait ViewRenderer: Send + Sync {
    /// Whether a view with this name is registered
    fn has_view(&self, name: &str) -> bool;

    /// Render a view
    fn render(&self, name: &str, data: &serde_json::Value) -> Result<String>;

    /// Pick up changes to the view sources
    fn reload(&self) -> Result<()> {
        Ok(())
    }
}

/// Map a dotted layout name to its view name
///
/// `layouts.app` becomes `layouts/app.html`.
pub fn layout_view_name(layout: &str) -> String {
    format!("{}.html", layout.replace('.', "/"))
}

/// Tera-backed view renderer
pub struct TemplateRenderer {
    views_dir: Option<PathBuf>,
    tera: RwLock<Tera>,
}

impl TemplateRenderer {
    /// Create a renderer with the built-in views and every view under `views_dir`
    pub fn new(views_dir: impl Into<PathBuf>) -> Result<Self> {
        let views_dir = views_dir.into();
        let tera = build(Some(&views_dir))?;
        Ok(Self {
            views_dir: Some(views_dir),
            tera: RwLock::new(tera),
        })
    }

    /// Create a renderer with only the built-in views
    pub fn builtin() -> Result<Self> {
        Ok(Self {
            views_dir: None,
            tera: RwLock::new(build(None)?),
        })
    }

    /// Names of every registered view, sorted
    pub fn view_names(&self) -> Vec<String> {
        let mut names: Vec<String> = match self.tera.read() {
            Ok(tera) => tera.get_template_names().map(str::to_string).collect(),
            Err(_) => Vec::new(),
        };
        names.sort();
        names
    }
}

impl ViewRenderer for TemplateRenderer {
    fn has_view(&self, name: &str) -> bool {
        match self.tera.read() {
            Ok(tera) => tera.get_template_names().any(|n| n == name),
            Err(_) => false,
        }
    }

    fn render(&self, name: &str, data: &serde_json::Value) -> Result<String> {
        let context = Context::from_value(data.clone())?;
        let tera = self
            .tera
            .read()
            .map_err(|_| Error::Render("view registry lock poisoned".to_string()))?;
        Ok(tera.render(name, &context)?)
    }

    fn reload(&self) -> Result<()> {
        // a broken view keeps the previous set in place
        let fresh = build(self.views_dir.as_deref())?;
        let mut tera = self
            .tera
            .write()
            .map_err(|_| Error::Render("view registry lock poisoned".to_string()))?;
        *tera = fresh;
        tracing::debug!("Reloaded {} views", tera.get_template_names().count());
        Ok(())
    }
}

/// Assemble the template set: built-ins first, then views from disk
fn build(views_dir: Option<&Path>) -> Result<Tera> {
    let mut sources: BTreeMap<String, String> = BUILTIN_VIEWS
        .iter()
        .map(|(name, source)| (name.to_string(), source.to_string()))
        .collect();

    if let Some(dir) = views_dir {
        for (name, source) in read_views(dir)? {
            sources.insert(name, source);
        }
    }

    let mut tera = Tera::default();
    // added in one batch so layouts may extend each other
    tera.add_raw_templates(sources.iter().map(|(n, s)| (n.as_str(), s.as_str())))?;
    Ok(tera)
}

/// Read every `*.html` file below `dir`, keyed by view name
fn read_views(dir: &Path) -> Result<Vec<(String, String)>> {
    if !dir.is_dir() {
        tracing::debug!("Views directory {:?} does not exist", dir);
        return Ok(Vec::new());
    }

    let mut views = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Render(e.to_string()))?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().map_or(true, |e| e != "html") {
            continue;
        }
        let Ok(rel) = path.strip_prefix(dir) else {
            continue;
        };
        let name = view_name(rel);
        views.push((name, fs::read_to_string(path)?));
    }
    Ok(views)
}

fn view_name(rel: &Path) -> String {
    let name = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    match name.strip_prefix(VENDOR_DIR) {
        Some(rest) if rest.starts_with('/') => format!("markfolio{}", rest),
        _ => name,
    }
}
