//! Diagnostic report of paths, settings, documents and layouts

use anyhow::{bail, Result};
use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::content::FrontMatter;
use crate::templates::{layout_view_name, ViewRenderer};
use crate::Markfolio;

fn exists(path: &Path) -> &'static str {
    if path.exists() {
        "exists"
    } else {
        "missing"
    }
}

/// Build the report. With `file`, also dump that document's front matter,
/// raw body and rendered HTML.
pub fn report(app: &Markfolio, file: Option<&Path>) -> Result<String> {
    let views = app.views()?;
    let loader = app.loader();
    let mut out = String::new();

    writeln!(out, "Markfolio debug report")?;
    writeln!(out)?;
    writeln!(out, "Paths:")?;
    writeln!(out, "  base:    {}", app.base_dir.display())?;
    for (label, path) in [
        ("content", &app.content_dir),
        ("views", &app.views_dir),
        ("public", &app.public_dir),
    ] {
        writeln!(out, "  {:<8} {} ({})", format!("{}:", label), path.display(), exists(path))?;
    }

    writeln!(out)?;
    writeln!(out, "Settings:")?;
    match &app.config.default_layout {
        Some(layout) => writeln!(
            out,
            "  default layout: {} ({})",
            layout,
            layout_status(&views, layout)
        )?,
        None => writeln!(out, "  default layout: none")?,
    }
    writeln!(
        out,
        "  cache: {} (ttl {}s)",
        if app.config.cache.enabled { "enabled" } else { "disabled" },
        app.config.cache.ttl
    )?;
    writeln!(out, "  debug: {}", app.config.debug)?;

    let documents = markdown_files(&app.content_dir);
    writeln!(out)?;
    writeln!(out, "Documents ({}):", documents.len())?;
    for path in &documents {
        let rel = path.strip_prefix(&app.content_dir).unwrap_or(path);
        match loader.load(path) {
            Ok(page) => match page.layout.as_deref() {
                Some(layout) => writeln!(
                    out,
                    "  {}  layout {} ({})",
                    rel.display(),
                    layout,
                    layout_status(&views, layout)
                )?,
                None => writeln!(out, "  {}  no layout", rel.display())?,
            },
            Err(e) => writeln!(out, "  {}  ERROR: {}", rel.display(), e)?,
        }
    }

    if let Some(file) = file {
        let path = locate(app, file)?;
        let raw = fs::read_to_string(&path)?;
        let (front_matter, body) = FrontMatter::parse(&raw)?;

        writeln!(out)?;
        writeln!(out, "File: {}", path.display())?;
        writeln!(out)?;
        writeln!(out, "Front Matter:")?;
        writeln!(out, "{}", serde_yaml::to_string(&front_matter.meta)?.trim_end())?;
        writeln!(out)?;
        writeln!(out, "Content:")?;
        writeln!(out, "{}", body.trim_end())?;
        writeln!(out)?;
        writeln!(out, "Rendered HTML:")?;
        writeln!(out, "{}", loader.renderer().render(body).trim_end())?;
    }

    Ok(out)
}

fn layout_status(views: &dyn ViewRenderer, layout: &str) -> String {
    let view = layout_view_name(layout);
    if views.has_view(&view) {
        format!("{} found", view)
    } else {
        format!("{} missing", view)
    }
}

fn markdown_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().map_or(false, |ext| ext == "md"))
        .collect()
}

/// A file argument may be a path, or a path relative to the content root
fn locate(app: &Markfolio, file: &Path) -> Result<PathBuf> {
    if file.is_file() {
        return Ok(file.to_path_buf());
    }
    let in_content = app.content_dir.join(file);
    if in_content.is_file() {
        return Ok(in_content);
    }
    let with_ext = in_content.with_extension("md");
    if with_ext.is_file() {
        return Ok(with_ext);
    }
    bail!("File not found: {}", file.display())
}

/// Run the debug command
pub fn run(app: &Markfolio, file: Option<&Path>) -> Result<()> {
    print!("{}", report(app, file)?);
    Ok(())
}
