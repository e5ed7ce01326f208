//! Content module - documents, front matter, rendering and listings

mod frontmatter;
pub mod loader;
mod markdown;
pub mod meta;
mod page;
pub mod repository;

pub use frontmatter::{scalar_to_string, FrontMatter, Metadata};
pub use loader::PageLoader;
pub use markdown::MarkdownRenderer;
pub use page::PageData;
pub use repository::{ContentRepository, SortDirection};
