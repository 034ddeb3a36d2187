//! Where scene files are read from.

use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};

/// Supplies the text of scene files by path.
pub trait SourceProvider {
    fn read(&self, path: &Path) -> io::Result<String>;
}

/// Reads scene files from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSystem;

impl SourceProvider for FileSystem {
    fn read(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }
}

/// Serves scene files from memory, keyed by path.
#[derive(Debug, Clone, Default)]
pub struct InMemorySources {
    files: HashMap<PathBuf, String>,
}

impl InMemorySources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        self.insert(path, source);
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, source: impl Into<String>) {
        self.files.insert(normalize(&path.into()), source.into());
    }
}

impl SourceProvider for InMemorySources {
    fn read(&self, path: &Path) -> io::Result<String> {
        self.files.get(&normalize(path)).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            )
        })
    }
}

/// Drop `.` components so that `a/./b.scn` and `a/b.scn` compare equal.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    path.components().collect()
}
