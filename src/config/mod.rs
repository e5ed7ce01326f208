//! Configuration module

mod settings;

pub use settings::{
    CacheConfig, MarkdownConfig, MarkfolioConfig, RoutingConfig, CONFIG_FILE, DEFAULT_CONFIG,
};
