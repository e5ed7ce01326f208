//! Content importer - writes Markdown documents from HTML, web pages,
//! WordPress sites and CSV files into the content root

mod html;

pub use html::{
    decode_entities, extract_main_content, extract_title, html_to_markdown, looks_like_html,
};

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use serde_yaml::Value;

use crate::content::Metadata;
use crate::error::{Error, Result};

/// Column layout of a CSV import
#[derive(Debug, Clone)]
pub struct CsvOptions {
    pub delimiter: u8,
    pub title_column: String,
    pub content_column: String,
    pub path_column: String,
    pub has_header: bool,
    /// Directory under the content root that receives the files
    pub directory: Option<String>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            title_column: "title".to_string(),
            content_column: "content".to_string(),
            path_column: "path".to_string(),
            has_header: true,
            directory: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Rendered {
    #[serde(default)]
    rendered: String,
}

/// The subset of a WordPress REST API post that gets imported
#[derive(Debug, Deserialize)]
struct WordPressPost {
    id: u64,
    #[serde(default)]
    slug: String,
    title: Option<Rendered>,
    content: Option<Rendered>,
    date: Option<String>,
    status: Option<String>,
    categories: Option<serde_json::Value>,
    tags: Option<serde_json::Value>,
}

/// Writes imported documents into a content root
pub struct ContentImporter {
    content_dir: PathBuf,
    default_layout: Option<String>,
    client: reqwest::Client,
}

impl ContentImporter {
    pub fn new(content_dir: impl Into<PathBuf>, default_layout: Option<String>) -> Self {
        Self {
            content_dir: content_dir.into(),
            default_layout,
            client: reqwest::Client::new(),
        }
    }

    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }

    /// Convert an HTML fragment and save it at `path`
    pub fn from_html(&self, html: &str, path: &str, metadata: &Metadata) -> Result<PathBuf> {
        let markdown = html_to_markdown(html);
        self.save_markdown_file(path, &markdown, metadata)
    }

    /// Fetch a web page, extract its main content and save it.
    ///
    /// The title comes from `<title>` unless given in `metadata`; the path is
    /// derived from the URL unless given.
    pub async fn from_url(
        &self,
        url: &str,
        path: Option<&str>,
        metadata: &Metadata,
    ) -> Result<PathBuf> {
        tracing::info!("Fetching {}", url);
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(Error::Import(format!(
                "Failed to fetch content from URL: {} ({})",
                url,
                response.status()
            )));
        }
        let html = response.text().await?;

        let mut metadata = metadata.clone();
        if !metadata.contains_key("title") {
            let title = extract_title(&html).unwrap_or_else(|| url_basename(url));
            metadata.insert("title".to_string(), Value::String(title));
        }

        let path = match path {
            Some(path) => path.to_string(),
            None => path_from_url(url),
        };

        self.from_html(&extract_main_content(&html), &path, &metadata)
    }

    /// Import posts from a WordPress site's REST API into `target_dir`
    pub async fn from_wordpress(
        &self,
        site: &str,
        target_dir: &str,
        limit: usize,
    ) -> Result<Vec<PathBuf>> {
        let url = format!(
            "{}/wp-json/wp/v2/posts?per_page={}",
            site.trim_end_matches('/'),
            limit
        );
        tracing::info!("Fetching WordPress posts from {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Error::Import(format!(
                "Failed to fetch WordPress posts from: {} ({})",
                site,
                response.status()
            )));
        }
        let posts: Vec<WordPressPost> = response.json().await?;

        let mut imported = Vec::with_capacity(posts.len());
        for post in posts {
            let title = post
                .title
                .map(|t| decode_entities(&t.rendered))
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Untitled".to_string());
            let slug = if post.slug.is_empty() {
                slug::slugify(&title)
            } else {
                post.slug
            };
            let created_at = post
                .date
                .unwrap_or_else(|| chrono::Local::now().to_rfc3339());

            let mut metadata = Metadata::new();
            metadata.insert("title".to_string(), Value::String(title));
            metadata.insert("created_at".to_string(), Value::String(created_at));
            metadata.insert("wordpress_id".to_string(), Value::Number(post.id.into()));
            if let Some(status) = post.status {
                metadata.insert("status".to_string(), Value::String(status));
            }
            if let Some(categories) = post.categories {
                metadata.insert("categories".to_string(), serde_yaml::to_value(categories)?);
            }
            if let Some(tags) = post.tags {
                metadata.insert("tags".to_string(), serde_yaml::to_value(tags)?);
            }

            let content = post.content.map(|c| c.rendered).unwrap_or_default();
            let path = format!("{}/{}", target_dir.trim_matches('/'), slug);
            imported.push(self.from_html(&content, &path, &metadata)?);
        }

        Ok(imported)
    }

    /// Import one document per CSV row
    pub fn from_csv(&self, csv_path: &Path, options: &CsvOptions) -> Result<Vec<PathBuf>> {
        if !csv_path.is_file() {
            return Err(Error::FileNotFound(csv_path.to_path_buf()));
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .has_headers(options.has_header)
            .flexible(true)
            .from_path(csv_path)?;

        let headers: Vec<String> = if options.has_header {
            reader.headers()?.iter().map(str::to_string).collect()
        } else {
            Vec::new()
        };

        let (title_idx, content_idx, path_idx) = if options.has_header {
            let find = |name: &str| headers.iter().position(|h| h == name);
            match (find(&options.title_column), find(&options.content_column)) {
                (Some(title), Some(content)) => (title, content, find(&options.path_column)),
                _ => {
                    return Err(Error::Import(
                        "Required columns not found in CSV headers".to_string(),
                    ))
                }
            }
        } else {
            (0, 1, Some(2))
        };

        let mut imported = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let title = record.get(title_idx).unwrap_or_default().trim();
            let content = record.get(content_idx).unwrap_or_default();

            let mut path = path_idx
                .and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| slug::slugify(title));
            if path.is_empty() {
                return Err(Error::Import(format!("CSV row {} has no title or path", row + 1)));
            }
            if let Some(dir) = options.directory.as_deref().filter(|d| !d.is_empty()) {
                path = format!("{}/{}", dir.trim_end_matches('/'), path);
            }

            let mut metadata = Metadata::new();
            metadata.insert("title".to_string(), Value::String(title.to_string()));
            for (i, header) in headers.iter().enumerate() {
                if i == content_idx || i == title_idx || Some(i) == path_idx {
                    continue;
                }
                let value = record.get(i).unwrap_or_default();
                metadata.insert(header.clone(), Value::String(value.to_string()));
            }

            let file = if looks_like_html(content) {
                self.from_html(content, &path, &metadata)?
            } else {
                self.save_markdown_file(&path, content, &metadata)?
            };
            imported.push(file);
        }

        Ok(imported)
    }

    /// Write a document with front matter under the content root.
    ///
    /// `title` defaults to the file's base name and `layout` to the
    /// configured default layout when the metadata has none.
    pub fn save_markdown_file(
        &self,
        path: &str,
        content: &str,
        metadata: &Metadata,
    ) -> Result<PathBuf> {
        let rel = path.trim_start_matches('/');
        let rel = Path::new(rel);
        if rel.as_os_str().is_empty()
            || rel
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(Error::Import(format!("Invalid document path: {}", path)));
        }

        let mut file = self.content_dir.join(rel);
        if file.extension().map_or(true, |e| e != "md") {
            let mut name = file.as_os_str().to_os_string();
            name.push(".md");
            file = PathBuf::from(name);
        }

        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut front_matter = String::from("---\n");
        for (key, value) in metadata {
            front_matter.push_str(&format!("{}: {}\n", key, yaml_value(value)?));
        }
        if !metadata.contains_key("title") {
            let title = file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            front_matter.push_str(&format!("title: {}\n", yaml_value(&Value::String(title))?));
        }
        if !metadata.contains_key("layout") {
            if let Some(layout) = &self.default_layout {
                front_matter.push_str(&format!(
                    "layout: {}\n",
                    yaml_value(&Value::String(layout.clone()))?
                ));
            }
        }
        front_matter.push_str("---\n\n");

        fs::write(&file, front_matter + content)?;
        tracing::info!("Imported {:?}", file);
        Ok(file)
    }
}

/// One front-matter value. Lists and maps are written as inline JSON, which
/// YAML reads back as flow collections.
fn yaml_value(value: &Value) -> Result<String> {
    match value {
        Value::Sequence(_) | Value::Mapping(_) => Ok(serde_json::to_string(value)?),
        other => Ok(serde_yaml::to_string(other)?.trim_end().to_string()),
    }
}

/// Document path for a URL: its path with the extension and surrounding
/// slashes removed, or `index` for the site root
pub fn path_from_url(url: &str) -> String {
    let raw = match reqwest::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };

    let trimmed = raw.trim_matches('/');
    let without_ext = match trimmed.rsplit_once('.') {
        Some((stem, ext))
            if !ext.is_empty()
                && !ext.contains('/')
                && ext.chars().all(|c| c.is_alphanumeric() || c == '_') =>
        {
            stem
        }
        _ => trimmed,
    };

    let path = without_ext.trim_matches('/');
    if path.is_empty() {
        "index".to_string()
    } else {
        path.to_string()
    }
}

fn url_basename(url: &str) -> String {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(url)
        .to_string()
}
