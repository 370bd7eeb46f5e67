//! Configuration module for Shelf-Scraper
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key has a default, so the crawler also runs without any file.
//!
//! # Example
//!
//! ```no_run
//! use shelf_scraper::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("scraper.toml")).unwrap();
//! println!("Detail workers: {}", config.crawler.max_concurrent_details);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, OutputConfig, UserAgentConfig, DEFAULT_DATASET_PATH, DEFAULT_ROOT_URL,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, read_config, read_config_with_hash, validate_config,
};
