//! Configuration types for Scenery loading.
//!
//! All types implement [`serde::Deserialize`] so they can be read from a
//! TOML file. Every section is optional.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration combining the loader and schema sections.
//! - [`LoaderConfig`] - Limits applied while reading scene files.
//! - [`Schema`] - The element vocabulary; empty means the built-in one.
//!
//! # Example
//!
//! ```
//! # use scenery::config::AppConfig;
//! let config = AppConfig::default();
//! assert_eq!(config.loader().max_include_depth(), 16);
//! ```

use serde::Deserialize;

use scenery_parser::DEFAULT_MAX_INCLUDE_DEPTH;

use crate::schema::Schema;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    loader: LoaderConfig,

    #[serde(default)]
    schema: Schema,
}

impl AppConfig {
    pub fn new(loader: LoaderConfig, schema: Schema) -> Self {
        Self { loader, schema }
    }

    pub fn loader(&self) -> &LoaderConfig {
        &self.loader
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

/// Limits applied while reading scene files.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoaderConfig {
    /// How deeply `Include` elements may nest.
    #[serde(default = "default_max_include_depth")]
    max_include_depth: usize,
}

fn default_max_include_depth() -> usize {
    DEFAULT_MAX_INCLUDE_DEPTH
}

impl LoaderConfig {
    pub fn new(max_include_depth: usize) -> Self {
        Self { max_include_depth }
    }

    pub fn max_include_depth(&self) -> usize {
        self.max_include_depth
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_INCLUDE_DEPTH)
    }
}
