//! markfolio: serve a folder of Markdown documents as HTML pages
//!
//! Documents live under a content root and carry YAML front matter. A
//! request path maps to `{path}.md` or `{path}/index.md`, which is rendered
//! with pulldown-cmark and wrapped in an optional Tera layout.

pub mod cache;
pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod import;
pub mod server;
pub mod templates;

pub use error::{Error, Result};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use cache::{CacheStore, ContentCache, MemoryCache};
use config::{MarkfolioConfig, CONFIG_FILE};
use content::repository::LISTING_NAMESPACE;
use content::{ContentRepository, PageLoader};
use import::ContentImporter;
use server::{MarkdownHandler, RENDER_NAMESPACE};
use templates::TemplateRenderer;

/// The main Markfolio application
#[derive(Clone)]
pub struct Markfolio {
    /// Site configuration
    pub config: MarkfolioConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Markdown content root
    pub content_dir: PathBuf,
    /// Layout views
    pub views_dir: PathBuf,
    /// Static files served after Markdown routing
    pub public_dir: PathBuf,
    store: Arc<dyn CacheStore>,
}

impl Markfolio {
    /// Create a new instance from a directory, reading `markfolio.yml` when
    /// present and applying environment overrides
    pub fn new<P: AsRef<Path>>(base_dir: P) -> anyhow::Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join(CONFIG_FILE);

        let mut config = if config_path.exists() {
            MarkfolioConfig::load(&config_path)?
        } else {
            MarkfolioConfig::default()
        };
        config.apply_env();

        Ok(Self::with_config(base_dir, config))
    }

    /// Create an instance from an explicit configuration
    pub fn with_config<P: AsRef<Path>>(base_dir: P, config: MarkfolioConfig) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        let content_dir = base_dir.join(&config.content_directory);
        let views_dir = base_dir.join(&config.views_directory);
        let public_dir = base_dir.join(&config.public_directory);

        Self {
            config,
            base_dir,
            content_dir,
            views_dir,
            public_dir,
            store: Arc::new(MemoryCache::new()),
        }
    }

    /// Use another cache backend
    pub fn with_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.store = store;
        self
    }

    /// Page loader configured for this site
    pub fn loader(&self) -> PageLoader {
        PageLoader::new(&self.config)
    }

    /// Content repository over the content root
    pub fn repository(&self) -> ContentRepository {
        ContentRepository::new(
            &self.content_dir,
            self.loader(),
            self.cache(LISTING_NAMESPACE),
        )
    }

    /// Views from the views directory plus the built-ins
    pub fn views(&self) -> Result<TemplateRenderer> {
        TemplateRenderer::new(&self.views_dir)
    }

    /// Request handler for the content root
    pub fn handler(&self) -> Result<MarkdownHandler> {
        Ok(MarkdownHandler::new(
            &self.config,
            &self.content_dir,
            self.loader(),
            Arc::new(self.views()?),
            self.cache(RENDER_NAMESPACE),
        ))
    }

    /// Importer writing into the content root
    pub fn importer(&self) -> ContentImporter {
        ContentImporter::new(&self.content_dir, self.config.default_layout.clone())
    }

    fn cache(&self, namespace: &str) -> ContentCache {
        ContentCache::new(self.store.clone(), namespace, &self.config.cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_new_reads_config_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "content_directory: docs\ncache:\n  ttl: 5\n",
        )
        .unwrap();

        let app = Markfolio::new(dir.path()).unwrap();
        assert_eq!(app.content_dir, dir.path().join("docs"));
        assert_eq!(app.views_dir, dir.path().join("resources/views"));
        assert_eq!(app.config.cache.ttl, 5);
    }

    #[test]
    fn test_handler_and_repository_share_the_store() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryCache::new());
        let app = Markfolio::with_config(dir.path(), MarkfolioConfig::default())
            .with_store(store.clone());
        fs::create_dir_all(&app.content_dir).unwrap();
        fs::write(app.content_dir.join("index.md"), "# Home").unwrap();

        let response = app.handler().unwrap().handle("/").unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(app.repository().all(None, true).unwrap().len(), 1);
        // render entry, listing entry and one key index per namespace
        assert_eq!(store.len(), 4);

        app.repository().clear_cache();
        assert_eq!(store.len(), 2);
    }
}
