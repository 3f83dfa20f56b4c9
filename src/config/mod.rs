//! Configuration module for Agent-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, and overlaying values taken from `.env` and the process environment.
//!
//! # Example
//!
//! ```no_run
//! use agent_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Crawling pages {}..={}", config.crawl.start_page, config.crawl.max_page);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlConfig, HttpConfig, LoggingConfig, OutputConfig, ParserStrategy, RetryConfig,
    SinkKind, SiteConfig, WarehouseConfig,
};

// Re-export parser functions
pub use parser::{
    apply_env_overrides, load_config, load_config_with_env, ENV_CREDENTIALS, ENV_DATASET,
    ENV_PROJECT, ENV_PROXY, ENV_TABLE,
};
pub use validation::validate;
