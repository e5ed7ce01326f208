//! Page loader - turns one Markdown file into view data

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use super::{FrontMatter, MarkdownRenderer, PageData};
use crate::config::MarkfolioConfig;
use crate::error::{Error, Result};

/// Loads a single document: front matter, rendered body, title and layout
#[derive(Clone)]
pub struct PageLoader {
    renderer: Arc<MarkdownRenderer>,
    default_layout: Option<String>,
}

impl PageLoader {
    /// Create a new page loader
    pub fn new(config: &MarkfolioConfig) -> Self {
        Self {
            renderer: Arc::new(MarkdownRenderer::from_config(&config.markdown)),
            default_layout: config.default_layout.clone(),
        }
    }

    /// Create a loader with an explicit renderer and default layout
    pub fn with_renderer(renderer: MarkdownRenderer, default_layout: Option<String>) -> Self {
        Self {
            renderer: Arc::new(renderer),
            default_layout,
        }
    }

    /// Load a document from disk
    pub fn load(&self, path: &Path) -> Result<PageData> {
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::FileNotFound(path.to_path_buf()),
            _ => Error::Io(e),
        })?;

        self.parse(&content).map_err(|e| e.with_path(path))
    }

    /// Build view data from raw document text
    pub fn parse(&self, content: &str) -> Result<PageData> {
        let (fm, body) = FrontMatter::parse(content)?;

        let title = fm.title();
        let layout = fm.layout().or_else(|| self.default_layout.clone());
        let content = self.renderer.render(body);

        Ok(PageData {
            title,
            content,
            meta: fm.meta,
            layout,
            path: None,
            url: None,
        })
    }

    /// The Markdown renderer used for page bodies
    pub fn renderer(&self) -> &MarkdownRenderer {
        &self.renderer
    }
}
