//! CLI entry point for markfolio

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use markfolio::commands::import::ImportSource;
use markfolio::commands::new::NewPage;
use markfolio::commands::publish::PublishOptions;
use markfolio::import::CsvOptions;

#[derive(Parser)]
#[command(name = "markfolio")]
#[command(version)]
#[command(about = "Serve a folder of Markdown documents as HTML pages", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a local server
    #[command(alias = "s")]
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,

        /// Clear caches, reload views and refresh browsers on file changes
        #[arg(short, long)]
        watch: bool,
    },

    /// Create a new Markdown page
    New {
        /// Page path relative to the content directory, e.g. docs/intro
        path: String,

        /// Page title (defaults to the title-cased file name)
        #[arg(short, long)]
        title: Option<String>,

        /// Layout to use
        #[arg(short, long)]
        layout: Option<String>,

        /// Overwrite an existing file without asking
        #[arg(short, long)]
        force: bool,
    },

    /// Publish the default config and views
    Publish {
        /// Publish the config file
        #[arg(long)]
        config: bool,

        /// Publish the view files
        #[arg(long)]
        views: bool,

        /// Publish everything
        #[arg(long)]
        all: bool,

        /// Overwrite existing files without asking
        #[arg(short, long)]
        force: bool,
    },

    /// Show resolved paths, settings and documents
    Debug {
        /// A document to dump in detail
        file: Option<PathBuf>,
    },

    /// List site content
    List {
        /// Type of content to list (pages, published, drafts, tags, categories)
        #[arg(default_value = "pages")]
        r#type: String,

        /// Restrict to a directory under the content root
        #[arg(long)]
        dir: Option<String>,
    },

    /// Import content into the content directory
    Import {
        #[command(subcommand)]
        source: ImportCommand,
    },

    /// Display version information
    Version,
}

#[derive(Subcommand)]
enum ImportCommand {
    /// Convert a local HTML file
    Html {
        /// HTML file to convert
        file: PathBuf,

        /// Target page path
        path: String,
    },

    /// Fetch and convert a web page
    Url {
        url: String,

        /// Target page path (derived from the URL by default)
        path: Option<String>,
    },

    /// Import posts from a WordPress site
    Wordpress {
        /// Site root, e.g. https://example.com
        site: String,

        /// Target directory under the content root
        #[arg(long, default_value = "blog")]
        dir: String,

        /// Number of posts to fetch
        #[arg(long, default_value = "100")]
        limit: usize,
    },

    /// Import one page per CSV row
    Csv {
        file: PathBuf,

        #[arg(long, default_value = ",")]
        delimiter: char,

        #[arg(long, default_value = "title")]
        title_column: String,

        #[arg(long, default_value = "content")]
        content_column: String,

        #[arg(long, default_value = "path")]
        path_column: String,

        /// The first row is data, columns are title, content, path
        #[arg(long)]
        no_header: bool,

        /// Target directory under the content root
        #[arg(long)]
        dir: Option<String>,
    },
}

impl ImportCommand {
    fn into_source(self) -> Result<ImportSource> {
        Ok(match self {
            ImportCommand::Html { file, path } => ImportSource::Html { file, path },
            ImportCommand::Url { url, path } => ImportSource::Url { url, path },
            ImportCommand::Wordpress { site, dir, limit } => {
                ImportSource::WordPress { site, dir, limit }
            }
            ImportCommand::Csv {
                file,
                delimiter,
                title_column,
                content_column,
                path_column,
                no_header,
                dir,
            } => {
                let delimiter = u8::try_from(delimiter)
                    .ok()
                    .filter(u8::is_ascii)
                    .context("CSV delimiter must be a single ASCII character")?;
                ImportSource::Csv {
                    file,
                    options: CsvOptions {
                        delimiter,
                        title_column,
                        content_column,
                        path_column,
                        has_header: !no_header,
                        directory: dir,
                    },
                }
            }
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    // Version needs no site
    if let Commands::Version = cli.command {
        println!("markfolio version {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let app = markfolio::Markfolio::new(&base_dir)?;

    // Initialize logging
    let filter = if cli.debug || app.config.debug {
        "markfolio=debug,info"
    } else {
        "markfolio=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Serve { port, ip, watch } => {
            tracing::info!("Starting server at http://{}:{}", ip, port);
            markfolio::server::start(&app, &ip, port, watch).await?;
        }

        Commands::New {
            path,
            title,
            layout,
            force,
        } => {
            let options = NewPage {
                title,
                layout,
                force,
            };
            markfolio::commands::new::run(&app, &path, &options)?;
        }

        Commands::Publish {
            config,
            views,
            all,
            force,
        } => {
            let options = PublishOptions {
                config: config || all,
                views: views || all,
                force,
            };
            markfolio::commands::publish::run(&app, &options)?;
        }

        Commands::Debug { file } => {
            markfolio::commands::debug::run(&app, file.as_deref())?;
        }

        Commands::List { r#type, dir } => {
            markfolio::commands::list::run(&app, &r#type, dir.as_deref())?;
        }

        Commands::Import { source } => {
            markfolio::commands::import::run(&app, source.into_source()?).await?;
        }

        // printed before the site was loaded
        Commands::Version => {}
    }

    Ok(())
}
