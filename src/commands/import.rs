//! Import content from HTML files, web pages, WordPress and CSV

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::content::Metadata;
use crate::import::CsvOptions;
use crate::Markfolio;

/// Import sources accepted by the CLI
#[derive(Debug, Clone)]
pub enum ImportSource {
    Html { file: PathBuf, path: String },
    Url { url: String, path: Option<String> },
    WordPress { site: String, dir: String, limit: usize },
    Csv { file: PathBuf, options: CsvOptions },
}

/// Run an import and report the files written
pub async fn run(app: &Markfolio, source: ImportSource) -> Result<Vec<PathBuf>> {
    let importer = app.importer();

    let files = match source {
        ImportSource::Html { file, path } => {
            let html = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            vec![importer.from_html(&html, &path, &Metadata::new())?]
        }
        ImportSource::Url { url, path } => {
            vec![importer.from_url(&url, path.as_deref(), &Metadata::new()).await?]
        }
        ImportSource::WordPress { site, dir, limit } => {
            importer.from_wordpress(&site, &dir, limit).await?
        }
        ImportSource::Csv { file, options } => importer.from_csv(&file, &options)?,
    };

    println!("Imported {} file(s):", files.len());
    for file in &files {
        println!("  {}", file.display());
    }
    // imported files should show up immediately in listings
    app.repository().clear_cache();

    Ok(files)
}
