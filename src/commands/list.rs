//! List site content

use anyhow::{bail, Result};
use std::fmt::Write;

use crate::content::PageData;
use crate::Markfolio;

fn write_pages(out: &mut String, heading: &str, pages: &[PageData]) -> Result<()> {
    writeln!(out, "{} ({}):", heading, pages.len())?;
    for page in pages {
        writeln!(
            out,
            "  {} - {} [{}]",
            page.url.as_deref().unwrap_or_default(),
            page.title.as_deref().unwrap_or("(untitled)"),
            page.status().unwrap_or_else(|| "published".to_string())
        )?;
    }
    Ok(())
}

/// Build the listing for a content type, optionally under `directory`
pub fn report(app: &Markfolio, content_type: &str, directory: Option<&str>) -> Result<String> {
    let repository = app.repository();
    let mut out = String::new();

    match content_type {
        "page" | "pages" => write_pages(&mut out, "Pages", &repository.all(directory, true)?)?,
        "published" => write_pages(&mut out, "Published", &repository.published(directory)?)?,
        "draft" | "drafts" => write_pages(&mut out, "Drafts", &repository.drafts(directory)?)?,
        "tag" | "tags" => {
            let tags = repository.tags(directory)?;
            writeln!(out, "Tags ({}):", tags.len())?;
            for tag in tags {
                let count = repository.with_tags(&[tag.as_str()], directory)?.len();
                writeln!(out, "  {} ({})", tag, count)?;
            }
        }
        "category" | "categories" => {
            let categories = repository.categories(directory)?;
            writeln!(out, "Categories ({}):", categories.len())?;
            for category in categories {
                writeln!(out, "  {}", category)?;
            }
        }
        _ => bail!(
            "Unknown type: {}. Available: pages, published, drafts, tags, categories",
            content_type
        ),
    }

    Ok(out)
}

/// List site content by type
pub fn run(app: &Markfolio, content_type: &str, directory: Option<&str>) -> Result<()> {
    print!("{}", report(app, content_type, directory)?);
    Ok(())
}
