//! Error types for Scenery operations.
//!
//! [`SceneError`] wraps everything that can stop a scene from loading.

use std::{io, path::PathBuf};

use thiserror::Error;

use scenery_parser::ParseError;

/// The main error type for Scenery operations.
///
/// # Diagnostic Variants
///
/// `Parse` carries every diagnostic of a failed load together with the
/// directory that the file names in those diagnostics are relative to, so
/// callers can show the offending source lines.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{err}")]
    Parse { err: ParseError, root_dir: PathBuf },
}

impl SceneError {
    /// Create a new `Parse` error for a load rooted in `root_dir`.
    pub fn new_parse_error(err: ParseError, root_dir: impl Into<PathBuf>) -> Self {
        Self::Parse {
            err,
            root_dir: root_dir.into(),
        }
    }
}
