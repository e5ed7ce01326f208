//! Content repository - listings, filters and term indexes over the content root

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_yaml::Value;
use walkdir::WalkDir;

use super::meta::{compare_values, loose_eq, merge_unique, normalize_terms};
use super::{Metadata, PageData, PageLoader};
use crate::cache::{hash_content, ContentCache};
use crate::error::Result;

/// Cache namespace for aggregate listings
pub const LISTING_NAMESPACE: &str = "markfolio_all";

/// Sort direction for [`ContentRepository::sort_by`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("unknown sort direction: {}", other)),
        }
    }
}

/// Queries over every document under the content root
///
/// Listing order is the directory walk order (file names sorted within each
/// directory). Callers that need another order use [`sort_by`](Self::sort_by).
#[derive(Clone)]
pub struct ContentRepository {
    content_dir: PathBuf,
    loader: PageLoader,
    cache: ContentCache,
}

impl ContentRepository {
    /// Create a new repository
    pub fn new(content_dir: impl Into<PathBuf>, loader: PageLoader, cache: ContentCache) -> Self {
        Self {
            content_dir: content_dir.into(),
            loader,
            cache,
        }
    }

    /// Content root this repository reads from
    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }

    /// All documents under the root, or under `directory` inside it
    pub fn all(&self, directory: Option<&str>, recursive: bool) -> Result<Vec<PageData>> {
        // the root scope has no `dir:` prefix, so no directory can share its key
        let scope = match directory.map(|d| d.trim_matches('/')) {
            Some(dir) if !dir.is_empty() => format!("dir:{}", dir),
            _ => "root".to_string(),
        };
        let hash = hash_content(&scope);
        let key = self
            .cache
            .key(&[hash.as_str(), if recursive { "r" } else { "nr" }]);

        self.cache
            .remember(&key, || Ok(self.scan(directory, recursive)))
    }

    /// Find a document by its root-relative path, without extension.
    /// Only `{path}.md` is tried; index fallback belongs to the request handler.
    pub fn find(&self, path: &str) -> Result<Option<PageData>> {
        let path = path.trim_matches('/');
        let file = self.content_dir.join(format!("{}.md", path));

        if !file.is_file() {
            return Ok(None);
        }

        self.load_file(&file).map(Some)
    }

    /// Documents whose metadata loosely equals every criterion
    pub fn where_meta(
        &self,
        criteria: &Metadata,
        directory: Option<&str>,
    ) -> Result<Vec<PageData>> {
        Ok(self
            .all(directory, true)?
            .into_iter()
            .filter(|page| matches_criteria(page, criteria))
            .collect())
    }

    /// Documents sorted by a metadata field. The sort is stable and a missing
    /// field sorts as null.
    pub fn sort_by(
        &self,
        field: &str,
        direction: SortDirection,
        directory: Option<&str>,
    ) -> Result<Vec<PageData>> {
        let mut pages = self.all(directory, true)?;
        pages.sort_by(|a, b| {
            let ord = compare_values(a.meta.get(field), b.meta.get(field));
            match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });
        Ok(pages)
    }

    /// Documents tagged with any of `tags`
    pub fn with_tags<S: AsRef<str>>(
        &self,
        tags: &[S],
        directory: Option<&str>,
    ) -> Result<Vec<PageData>> {
        Ok(self
            .all(directory, true)?
            .into_iter()
            .filter(|page| {
                let page_tags = normalize_terms(page.meta.get("tags"));
                tags.iter().any(|tag| page_tags.iter().any(|t| t == tag.as_ref()))
            })
            .collect())
    }

    /// Documents with `status: published` together with documents that have
    /// no status at all. Each document appears once, in listing order.
    pub fn published(&self, directory: Option<&str>) -> Result<Vec<PageData>> {
        let published = Value::String("published".to_string());
        Ok(self
            .all(directory, true)?
            .into_iter()
            .filter(|page| match page.meta.get("status") {
                None | Some(Value::Null) => true,
                Some(status) => loose_eq(status, &published),
            })
            .collect())
    }

    /// Documents with `status: draft`
    pub fn drafts(&self, directory: Option<&str>) -> Result<Vec<PageData>> {
        let mut criteria = Metadata::new();
        criteria.insert("status".to_string(), Value::String("draft".to_string()));
        self.where_meta(&criteria, directory)
    }

    /// Every distinct tag, in first-seen order
    pub fn tags(&self, directory: Option<&str>) -> Result<Vec<String>> {
        let mut tags = Vec::new();
        for page in self.all(directory, true)? {
            merge_unique(&mut tags, normalize_terms(page.meta.get("tags")));
        }
        Ok(tags)
    }

    /// Every distinct category, in first-seen order. Falls back to the
    /// singular `category` key when `categories` is absent.
    pub fn categories(&self, directory: Option<&str>) -> Result<Vec<String>> {
        let mut categories = Vec::new();
        for page in self.all(directory, true)? {
            let value = page
                .meta
                .get("categories")
                .filter(|v| !v.is_null())
                .or_else(|| page.meta.get("category"));
            merge_unique(&mut categories, normalize_terms(value));
        }
        Ok(categories)
    }

    /// Forget cached listings
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Walk the directory and load every Markdown file.
    /// Files that fail to load are logged and left out.
    fn scan(&self, directory: Option<&str>, recursive: bool) -> Vec<PageData> {
        let root = match directory {
            Some(dir) => self.content_dir.join(dir.trim_matches('/')),
            None => self.content_dir.clone(),
        };

        if !root.is_dir() {
            tracing::debug!("Content directory {:?} does not exist", root);
            return Vec::new();
        }

        let mut walker = WalkDir::new(&root).follow_links(true).sort_by_file_name();
        if !recursive {
            walker = walker.max_depth(1);
        }

        let mut pages = Vec::new();
        for entry in walker.into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !entry.file_type().is_file() || !is_markdown_file(path) {
                continue;
            }

            match self.load_file(path) {
                Ok(page) => pages.push(page),
                Err(e) => tracing::warn!("Skipping {:?}: {}", path, e),
            }
        }

        tracing::debug!("Loaded {} documents from {:?}", pages.len(), root);
        pages
    }

    /// Load a file and attach its path and URL
    fn load_file(&self, path: &Path) -> Result<PageData> {
        let mut page = self.loader.load(path)?;
        let relative = relative_path(&self.content_dir, path);
        page.url = Some(format!("/{}", relative));
        page.path = Some(relative);
        Ok(page)
    }
}

/// Root-relative path with forward slashes and no `.md` extension
fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path).with_extension("");
    relative
        .to_string_lossy()
        .replace('\\', "/")
        .trim_matches('/')
        .to_string()
}

/// Check if a file is a markdown file
fn is_markdown_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("md")
}

fn matches_criteria(page: &PageData, criteria: &Metadata) -> bool {
    criteria.iter().all(|(key, expected)| match page.meta.get(key) {
        None | Some(Value::Null) => false,
        Some(actual) => loose_eq(actual, expected),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheStore, MemoryCache};
    use crate::config::CacheConfig;
    use crate::content::MarkdownRenderer;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn repository(root: &Path, cache_enabled: bool) -> ContentRepository {
        let store: Arc<dyn CacheStore> = Arc::new(MemoryCache::new());
        let cache = ContentCache::new(
            store,
            LISTING_NAMESPACE,
            &CacheConfig {
                enabled: cache_enabled,
                ttl: 3600,
            },
        );
        let loader = PageLoader::with_renderer(MarkdownRenderer::new(), None);
        ContentRepository::new(root, loader, cache)
    }

    fn paths(pages: &[PageData]) -> Vec<&str> {
        pages.iter().map(|p| p.key()).collect()
    }

    fn site() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "about.md", "---\ntitle: About\norder: 3\n---\n\nAbout us");
        write(
            root,
            "blog/first.md",
            "---\ntitle: First\nstatus: published\ntags: \"x,y\"\norder: 1\ncategories: news\n---\n\nFirst post",
        );
        write(
            root,
            "blog/second.md",
            "---\ntitle: Second\nstatus: draft\ntags: [y, z]\norder: 2\ncategory: notes\n---\n\nSecond post",
        );
        write(root, "blog/archive/old.md", "---\ntitle: Old\n---\n\nOld post");
        write(root, "notes.txt", "not markdown");
        dir
    }

    #[test]
    fn test_all_attaches_path_and_url() {
        let dir = site();
        let repo = repository(dir.path(), false);
        let pages = repo.all(None, true).unwrap();

        assert_eq!(
            paths(&pages),
            vec!["about", "blog/archive/old", "blog/first", "blog/second"]
        );
        let first = pages.iter().find(|p| p.key() == "blog/first").unwrap();
        assert_eq!(first.url.as_deref(), Some("/blog/first"));
        assert!(first.content.contains("First post"));
    }

    #[test]
    fn test_all_in_subdirectory() {
        let dir = site();
        let repo = repository(dir.path(), false);

        let recursive = repo.all(Some("blog"), true).unwrap();
        assert_eq!(recursive.len(), 3);

        let flat = repo.all(Some("/blog/"), false).unwrap();
        assert_eq!(paths(&flat), vec!["blog/first", "blog/second"]);

        assert!(repo.all(Some("missing"), true).unwrap().is_empty());
    }

    #[test]
    fn test_all_skips_broken_files() {
        let dir = site();
        write(dir.path(), "broken.md", "---\ntitle: [oops\n---\n\nBody");
        let repo = repository(dir.path(), false);
        let pages = repo.all(None, true).unwrap();
        assert_eq!(pages.len(), 4);
        assert!(repo.find("broken").is_err());
    }

    #[test]
    fn test_find() {
        let dir = site();
        let repo = repository(dir.path(), false);

        let page = repo.find("/blog/first/").unwrap().unwrap();
        assert_eq!(page.title.as_deref(), Some("First"));
        assert_eq!(page.key(), "blog/first");

        assert!(repo.find("blog/missing").unwrap().is_none());
        // no index fallback
        write(dir.path(), "guide/index.md", "# Guide");
        assert!(repo.find("guide").unwrap().is_none());
    }

    #[test]
    fn test_where_meta_loose_equality() {
        let dir = site();
        let repo = repository(dir.path(), false);

        let mut criteria = Metadata::new();
        criteria.insert("order".to_string(), Value::String("2".to_string()));
        let pages = repo.where_meta(&criteria, None).unwrap();
        assert_eq!(paths(&pages), vec!["blog/second"]);

        criteria.insert("status".to_string(), Value::String("published".to_string()));
        assert!(repo.where_meta(&criteria, None).unwrap().is_empty());
    }

    #[test]
    fn test_sort_by() {
        let dir = site();
        let repo = repository(dir.path(), false);

        let asc = repo.sort_by("order", SortDirection::Asc, None).unwrap();
        // the document without `order` sorts first
        assert_eq!(
            paths(&asc),
            vec!["blog/archive/old", "blog/first", "blog/second", "about"]
        );

        let desc = repo.sort_by("order", "desc".parse().unwrap(), None).unwrap();
        assert_eq!(
            paths(&desc),
            vec!["about", "blog/second", "blog/first", "blog/archive/old"]
        );
    }

    #[test]
    fn test_with_tags_across_encodings() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "list.md", "---\ntags: [\"a\", \"b\"]\n---\n\nx");
        write(root, "json.md", "---\ntags: '[\"a\",\"b\"]'\n---\n\nx");
        write(root, "comma.md", "---\ntags: \"a, b\"\n---\n\nx");
        write(root, "other.md", "---\ntags: c\n---\n\nx");
        write(root, "none.md", "x");

        let repo = repository(root, false);
        let expected = vec!["comma", "json", "list"];
        assert_eq!(paths(&repo.with_tags(&["a"], None).unwrap()), expected);
        assert_eq!(paths(&repo.with_tags(&["b"], None).unwrap()), expected);
        assert_eq!(
            paths(&repo.with_tags(&["zzz", "c"], None).unwrap()),
            vec!["other"]
        );
    }

    #[test]
    fn test_published_and_drafts() {
        let dir = site();
        let repo = repository(dir.path(), false);

        let published = repo.published(None).unwrap();
        assert_eq!(
            paths(&published),
            vec!["about", "blog/archive/old", "blog/first"]
        );

        let drafts = repo.drafts(None).unwrap();
        assert_eq!(paths(&drafts), vec!["blog/second"]);
    }

    #[test]
    fn test_tags_first_seen_order() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "a.md", "---\ntags: \"x,y\"\n---\n\none");
        write(root, "b.md", "---\ntags: [y, z]\n---\n\ntwo");
        write(root, "c.md", "---\ntitle: untagged\n---\n\nthree");

        let repo = repository(root, false);
        assert_eq!(repo.tags(None).unwrap(), vec!["x", "y", "z"]);
    }

    #[test]
    fn test_categories_fallback_to_singular() {
        let dir = site();
        let repo = repository(dir.path(), false);
        assert_eq!(repo.categories(None).unwrap(), vec!["news", "notes"]);
    }

    #[test]
    fn test_listing_cache_and_clear() {
        let dir = site();
        let repo = repository(dir.path(), true);
        assert_eq!(repo.all(None, true).unwrap().len(), 4);

        write(dir.path(), "new.md", "# New");
        // served from cache until cleared
        assert_eq!(repo.all(None, true).unwrap().len(), 4);
        // other scopes have their own entries
        assert_eq!(repo.all(None, false).unwrap().len(), 2);

        repo.clear_cache();
        assert_eq!(repo.all(None, true).unwrap().len(), 5);
    }

    #[test]
    fn test_root_named_directory_has_its_own_listing() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "top.md", "# Top");
        write(dir.path(), "root/inner.md", "# Inner");
        let repo = repository(dir.path(), true);

        assert_eq!(paths(&repo.all(None, true).unwrap()), vec!["root/inner", "top"]);
        assert_eq!(paths(&repo.all(Some("root"), true).unwrap()), vec!["root/inner"]);
        // and the other way round on a fresh cache
        let repo = repository(dir.path(), true);
        assert_eq!(paths(&repo.all(Some("root"), true).unwrap()), vec!["root/inner"]);
        assert_eq!(paths(&repo.all(None, true).unwrap()), vec!["root/inner", "top"]);
    }

    #[test]
    fn test_cached_listing_keeps_yaml_values() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "odd.md",
            "---\nscore: .inf\nnested:\n  1: one\nodd: !custom x\n---\n\nBody",
        );
        let cached = repository(dir.path(), true);
        let uncached = repository(dir.path(), false);

        let expected = uncached.all(None, true).unwrap();
        assert_eq!(cached.all(None, true).unwrap(), expected);
        assert_eq!(cached.all(None, true).unwrap(), expected);
        assert_eq!(
            paths(&cached.sort_by("score", SortDirection::Desc, None).unwrap()),
            vec!["odd"]
        );
    }

    #[test]
    fn test_cached_listing_matches_uncached() {
        let dir = site();
        let cached = repository(dir.path(), true);
        let uncached = repository(dir.path(), false);

        let first = cached.all(None, true).unwrap();
        let second = cached.all(None, true).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, uncached.all(None, true).unwrap());
    }

    #[test]
    fn test_sort_direction_parse() {
        assert_eq!("ASC".parse::<SortDirection>().unwrap(), SortDirection::Asc);
        assert_eq!("desc".parse::<SortDirection>().unwrap(), SortDirection::Desc);
        assert!("sideways".parse::<SortDirection>().is_err());
    }
}
