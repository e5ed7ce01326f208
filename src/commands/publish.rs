//! Publish the default configuration and built-in views into a site

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{CONFIG_FILE, DEFAULT_CONFIG};
use crate::templates::BUILTIN_VIEWS;
use crate::Markfolio;

/// What to publish. With neither `config` nor `views` set, both are.
#[derive(Debug, Default, Clone, Copy)]
pub struct PublishOptions {
    pub config: bool,
    pub views: bool,
    pub force: bool,
}

impl PublishOptions {
    fn publish_config(&self) -> bool {
        self.config || !self.views
    }

    fn publish_views(&self) -> bool {
        self.views || !self.config
    }
}

/// Files written and skipped by [`publish`]
#[derive(Debug, Default)]
pub struct PublishReport {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub content_dir_created: bool,
}

/// Write `markfolio.yml` and the built-in views, then make sure the content
/// directory exists. Existing targets are replaced only with `force` or when
/// `confirm` agrees.
pub fn publish<F>(
    app: &Markfolio,
    options: &PublishOptions,
    mut confirm: F,
) -> Result<PublishReport>
where
    F: FnMut(&Path) -> bool,
{
    let mut report = PublishReport::default();
    let mut targets: Vec<(PathBuf, &str)> = Vec::new();

    if options.publish_config() {
        targets.push((app.base_dir.join(CONFIG_FILE), DEFAULT_CONFIG));
    }
    if options.publish_views() {
        for (name, source) in BUILTIN_VIEWS {
            // markfolio/markdown.html -> {views}/vendor/markfolio/markdown.html
            targets.push((app.views_dir.join("vendor").join(name), source));
        }
    }

    for (path, source) in targets {
        if path.exists() && !options.force && !confirm(&path) {
            report.skipped.push(path);
            continue;
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, source)?;
        report.written.push(path);
    }

    if !app.content_dir.is_dir() {
        fs::create_dir_all(&app.content_dir)?;
        report.content_dir_created = true;
    }

    Ok(report)
}

/// Run the publish command
pub fn run(app: &Markfolio, options: &PublishOptions) -> Result<()> {
    println!("Publishing Markfolio assets...");

    let report = publish(app, options, |path| {
        super::confirm(&format!(
            "The file {} already exists. Do you want to overwrite it?",
            path.display()
        ))
    })?;

    for path in &report.written {
        println!("  Published: {}", path.display());
    }
    for path in &report.skipped {
        println!("  Skipped:   {}", path.display());
    }
    if report.content_dir_created {
        println!("Created content directory: {}", app.content_dir.display());
    } else {
        println!("Content directory already exists: {}", app.content_dir.display());
    }

    Ok(())
}
