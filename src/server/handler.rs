//! Request path to Markdown file resolution and page rendering

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::{hash_content, ContentCache};
use crate::config::{MarkfolioConfig, RoutingConfig};
use crate::content::{Metadata, PageData, PageLoader};
use crate::error::{Error, Result};
use crate::templates::{layout_view_name, ViewRenderer, DIRECT_VIEW, WRAPPER_VIEW};

/// Cache namespace for rendered pages
pub const RENDER_NAMESPACE: &str = "markfolio";

pub(crate) const GENERIC_ERROR: &str = "Error rendering markdown";

/// Status and body of a handled request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResponse {
    pub status: u16,
    pub body: String,
}

impl PageResponse {
    pub fn ok(body: String) -> Self {
        Self { status: 200, body }
    }

    pub fn not_found() -> Self {
        Self {
            status: 404,
            body: "Not Found".to_string(),
        }
    }

    pub fn error(body: impl Into<String>) -> Self {
        Self {
            status: 500,
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Decides which request paths may map to Markdown documents
#[derive(Debug, Clone, Default)]
pub struct RoutePolicy {
    reserved: Vec<String>,
    excluded_prefixes: Vec<String>,
}

impl RoutePolicy {
    pub fn new(config: &RoutingConfig) -> Self {
        Self {
            reserved: config.reserved.clone(),
            excluded_prefixes: config.excluded_prefixes.clone(),
        }
    }

    /// Whether a decoded request path, without its leading slash, is a
    /// Markdown route. Anything with a dot looks like a static asset.
    pub fn accepts(&self, path: &str) -> bool {
        if path.contains(|c: char| matches!(c, '.' | '\\' | '\0')) {
            return false;
        }
        if self.reserved.iter().any(|r| r == path) {
            return false;
        }
        !self
            .excluded_prefixes
            .iter()
            .any(|p| !p.is_empty() && path.starts_with(p.as_str()))
    }
}

/// Data handed to a layout view
#[derive(Serialize)]
struct LayoutData<'a> {
    title: Option<&'a str>,
    description: String,
    content: String,
    meta: &'a Metadata,
    layout: &'a str,
}

/// Data handed to the layout-free view
#[derive(Serialize)]
struct DirectData<'a> {
    title: Option<&'a str>,
    description: String,
    content: &'a str,
}

/// Resolves request paths to documents and renders them
#[derive(Clone)]
pub struct MarkdownHandler {
    content_dir: PathBuf,
    loader: PageLoader,
    views: Arc<dyn ViewRenderer>,
    cache: ContentCache,
    policy: RoutePolicy,
    debug: bool,
}

impl MarkdownHandler {
    pub fn new(
        config: &MarkfolioConfig,
        content_dir: impl Into<PathBuf>,
        loader: PageLoader,
        views: Arc<dyn ViewRenderer>,
        cache: ContentCache,
    ) -> Self {
        Self {
            content_dir: content_dir.into(),
            loader,
            views,
            cache,
            policy: RoutePolicy::new(&config.routing),
            debug: config.debug,
        }
    }

    pub fn views(&self) -> &Arc<dyn ViewRenderer> {
        &self.views
    }

    /// Files a request path may resolve to, in the order they are tried
    pub fn candidates(&self, path: &str) -> Vec<PathBuf> {
        let path = path.trim_matches('/');
        if path.is_empty() {
            return vec![self.content_dir.join("index.md")];
        }
        vec![
            self.content_dir.join(format!("{}.md", path)),
            self.content_dir.join(path).join("index.md"),
        ]
    }

    /// The document a request path resolves to, if any
    pub fn resolve(&self, path: &str) -> Option<PathBuf> {
        let path = path.trim_start_matches('/');
        if !self.policy.accepts(path) {
            tracing::debug!("Skipping non-markdown path: /{}", path);
            return None;
        }

        let found = self.candidates(path).into_iter().find(|c| c.is_file());
        match &found {
            Some(file) => tracing::debug!("Resolved /{} to {:?}", path, file),
            None => tracing::debug!("No markdown file for /{}", path),
        }
        found
    }

    /// Handle a decoded request path. `None` means the path is not ours and
    /// the request should continue down the chain.
    pub fn handle(&self, path: &str) -> Option<PageResponse> {
        let file = self.resolve(path)?;

        if !self.cache.is_enabled() {
            return Some(self.render_file(&file));
        }

        let hash = hash_content(&file.to_string_lossy());
        let key = self.cache.key(&[hash.as_str()]);
        let response = self
            .cache
            .remember_if(&key, || Ok(self.render_file(&file)), PageResponse::is_ok)
            .unwrap_or_else(|e| {
                tracing::warn!("Render cache unavailable for {:?}: {}", file, e);
                self.render_file(&file)
            });
        Some(response)
    }

    /// Forget every cached render
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    fn render_file(&self, file: &Path) -> PageResponse {
        let result = self
            .loader
            .load(file)
            .and_then(|page| self.render_page(&page));

        match result {
            Ok(html) => PageResponse::ok(html),
            // removed between resolution and load
            Err(Error::FileNotFound(_)) => PageResponse::not_found(),
            Err(e) => self.error_response(file, e),
        }
    }

    /// Render a loaded document with its layout, or without one
    pub fn render_page(&self, page: &PageData) -> Result<String> {
        let Some(layout) = page.layout.as_deref() else {
            return self.render_direct(page);
        };

        let view = layout_view_name(layout);
        if !self.views.has_view(&view) {
            if self.debug {
                return Err(Error::LayoutMissing(layout.to_string()));
            }
            tracing::debug!("Layout {} not found, rendering without layout", layout);
            return self.render_direct(page);
        }

        tracing::debug!("Rendering with layout {}", layout);
        let wrapper = serde_json::json!({ "content": page.content });
        let content = self.views.render(WRAPPER_VIEW, &wrapper)?;
        let data = LayoutData {
            title: page.title.as_deref(),
            description: page.description(),
            content,
            meta: &page.meta,
            layout,
        };
        self.views.render(&view, &serde_json::to_value(&data)?)
    }

    fn render_direct(&self, page: &PageData) -> Result<String> {
        let data = DirectData {
            title: page.title.as_deref(),
            description: page.description(),
            content: &page.content,
        };
        self.views.render(DIRECT_VIEW, &serde_json::to_value(&data)?)
    }

    fn error_response(&self, file: &Path, err: Error) -> PageResponse {
        tracing::error!("Failed to render {:?}: {}", file, err);
        if self.debug {
            match err {
                Error::LayoutMissing(_) => PageResponse::error(err.to_string()),
                other => PageResponse::error(format!("{}: {}", GENERIC_ERROR, other)),
            }
        } else {
            PageResponse::error(GENERIC_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheStore, MemoryCache};
    use crate::config::CacheConfig;
    use crate::content::MarkdownRenderer;
    use crate::templates::TemplateRenderer;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Counts renders and knows a single layout
    struct CountingViews {
        renders: AtomicUsize,
    }

    impl ViewRenderer for CountingViews {
        fn has_view(&self, name: &str) -> bool {
            name == DIRECT_VIEW || name == WRAPPER_VIEW || name == "layouts/app.html"
        }

        fn render(&self, name: &str, data: &serde_json::Value) -> Result<String> {
            self.renders.fetch_add(1, Ordering::SeqCst);
            Ok(format!("[{}]{}", name, data["content"].as_str().unwrap_or_default()))
        }
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn handler_with(
        root: &Path,
        views: Arc<dyn ViewRenderer>,
        debug: bool,
        cache: bool,
    ) -> MarkdownHandler {
        let mut config = MarkfolioConfig::default();
        config.debug = debug;
        config.cache = CacheConfig {
            enabled: cache,
            ttl: 60,
        };
        let store: Arc<dyn CacheStore> = Arc::new(MemoryCache::new());
        MarkdownHandler::new(
            &config,
            root,
            PageLoader::with_renderer(MarkdownRenderer::new(), None),
            views,
            ContentCache::new(store, RENDER_NAMESPACE, &config.cache),
        )
    }

    fn handler(root: &Path, debug: bool) -> MarkdownHandler {
        let views_dir = root.join("views");
        write(
            &views_dir,
            "layouts/app.html",
            "<main>{{ title }}|{{ meta.author }}|{{ content | safe }}</main>",
        );
        let views = Arc::new(TemplateRenderer::new(views_dir).unwrap());
        handler_with(&root.join("content"), views, debug, true)
    }

    #[test]
    fn test_route_policy() {
        let policy = RoutePolicy::new(&RoutingConfig::default());
        assert!(policy.accepts(""));
        assert!(policy.accepts("blog/post"));
        assert!(!policy.accepts("css/app.css"));
        assert!(!policy.accepts("favicon.ico"));
        assert!(!policy.accepts("_debugbar/open"));
        assert!(!policy.accepts("../secret"));
    }

    #[test]
    fn test_candidates_order() {
        let dir = TempDir::new().unwrap();
        let h = handler(dir.path(), false);
        let root = dir.path().join("content");
        assert_eq!(
            h.candidates("/blog/post"),
            vec![root.join("blog/post.md"), root.join("blog/post").join("index.md")]
        );
        assert_eq!(h.candidates("/"), vec![root.join("index.md")]);
    }

    #[test]
    fn test_hello_renders_without_layout() {
        let dir = TempDir::new().unwrap();
        write(
            &dir.path().join("content"),
            "hello.md",
            "---\ntitle: Hello\n---\n\n# Hello\n\nWorld",
        );

        let response = handler(dir.path(), false).handle("/hello").unwrap();
        assert_eq!(response.status, 200);
        assert!(response.body.contains("<h1>Hello</h1>"));
        assert!(response.body.contains("World"));
        assert!(response.body.contains("<title>Hello</title>"));
    }

    #[test]
    fn test_missing_file_is_unhandled() {
        let dir = TempDir::new().unwrap();
        let h = handler(dir.path(), false);
        assert!(h.handle("/missing").is_none());
        assert!(h.handle("/style.css").is_none());
    }

    #[test]
    fn test_direct_file_beats_index() {
        let dir = TempDir::new().unwrap();
        let content = dir.path().join("content");
        write(&content, "blog/post.md", "direct");
        write(&content, "blog/post/index.md", "index");

        let h = handler(dir.path(), false);
        let body = h.handle("/blog/post").unwrap().body;
        assert!(body.contains("<p>direct</p>"));

        write(&content, "docs/index.md", "docs index");
        let body = h.handle("/docs").unwrap().body;
        assert!(body.contains("<p>docs index</p>"));
    }

    #[test]
    fn test_root_serves_index() {
        let dir = TempDir::new().unwrap();
        write(&dir.path().join("content"), "index.md", "home");
        let response = handler(dir.path(), false).handle("/").unwrap();
        assert!(response.body.contains("<p>home</p>"));
    }

    #[test]
    fn test_layout_wraps_content() {
        let dir = TempDir::new().unwrap();
        write(
            &dir.path().join("content"),
            "about.md",
            "---\ntitle: About\nlayout: layouts.app\nauthor: Ann\n---\n\nHi",
        );

        let response = handler(dir.path(), false).handle("/about").unwrap();
        assert_eq!(response.status, 200);
        assert!(response.body.starts_with("<main>About|Ann|"));
        assert!(response.body.contains("<div class=\"markfolio-content\">"));
        assert!(response.body.contains("<p>Hi</p>"));
    }

    #[test]
    fn test_missing_layout_falls_back() {
        let dir = TempDir::new().unwrap();
        write(
            &dir.path().join("content"),
            "page.md",
            "---\ntitle: Page\nlayout: nonexistent.layout\n---\n\nBody",
        );

        let response = handler(dir.path(), false).handle("/page").unwrap();
        assert_eq!(response.status, 200);
        assert!(response.body.contains("<p>Body</p>"));
        assert!(response.body.contains("<!DOCTYPE html>"));
    }

    #[test]
    fn test_missing_layout_in_debug_mode() {
        let dir = TempDir::new().unwrap();
        write(
            &dir.path().join("content"),
            "page.md",
            "---\nlayout: nonexistent.layout\n---\n\nBody",
        );

        let response = handler(dir.path(), true).handle("/page").unwrap();
        assert_eq!(response.status, 500);
        assert_eq!(response.body, "Layout does not exist: nonexistent.layout");
    }

    #[test]
    fn test_parse_error_is_500() {
        let dir = TempDir::new().unwrap();
        write(
            &dir.path().join("content"),
            "broken.md",
            "---\ntitle: [oops\n---\n\nBody",
        );

        let response = handler(dir.path(), false).handle("/broken").unwrap();
        assert_eq!(response.status, 500);
        assert_eq!(response.body, GENERIC_ERROR);

        let response = handler(dir.path(), true).handle("/broken").unwrap();
        assert_eq!(response.status, 500);
        assert!(response.body.contains("broken.md"));
    }

    #[test]
    fn test_render_error_is_500() {
        let dir = TempDir::new().unwrap();
        let views_dir = dir.path().join("views");
        write(&views_dir, "layouts/bad.html", "{{ missing_variable }}");
        let views = Arc::new(TemplateRenderer::new(views_dir).unwrap());
        let content = dir.path().join("content");
        write(&content, "page.md", "---\nlayout: layouts.bad\n---\n\nBody");

        let response = handler_with(&content, views.clone(), false, true)
            .handle("/page")
            .unwrap();
        assert_eq!(response.status, 500);
        assert_eq!(response.body, GENERIC_ERROR);

        let response = handler_with(&content, views, true, true)
            .handle("/page")
            .unwrap();
        assert!(response.body.starts_with("Error rendering markdown: Render error"));
    }

    #[test]
    fn test_render_cache_is_transparent() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "hello.md", "---\ntitle: Hello\n---\n\n# Hello\n\nWorld");
        let views = Arc::new(CountingViews {
            renders: AtomicUsize::new(0),
        });
        let h = handler_with(dir.path(), views.clone(), false, true);

        let first = h.handle("/hello").unwrap();
        let second = h.handle("/hello").unwrap();
        assert_eq!(first, second);
        assert_eq!(views.renders.load(Ordering::SeqCst), 1);

        h.clear_cache();
        let third = h.handle("/hello").unwrap();
        assert_eq!(first, third);
        assert_eq!(views.renders.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_disabled_cache_renders_every_time() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "hello.md", "Hi");
        let views = Arc::new(CountingViews {
            renders: AtomicUsize::new(0),
        });
        let h = handler_with(dir.path(), views.clone(), false, false);

        h.handle("/hello").unwrap();
        h.handle("/hello").unwrap();
        assert_eq!(views.renders.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "page.md", "---\ntitle: [oops\n---\n\nBody");
        let views = Arc::new(CountingViews {
            renders: AtomicUsize::new(0),
        });
        let h = handler_with(dir.path(), views, false, true);

        assert_eq!(h.handle("/page").unwrap().status, 500);
        fs::write(dir.path().join("page.md"), "---\ntitle: Fixed\n---\n\nBody").unwrap();
        assert_eq!(h.handle("/page").unwrap().status, 200);
    }
}
