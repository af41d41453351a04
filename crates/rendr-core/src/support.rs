//! Layout/template files loaded once at startup.
//!
//! Layouts are small, so the whole directory is read eagerly into memory and
//! never touched again. Lookups are exact, case-sensitive file-name matches.

use crate::error::SupportError;
use std::path::Path;

/// One layout document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportFile {
    /// File name including extension (e.g. `main.html`)
    pub name: String,
    /// Full UTF-8 contents
    pub body: String,
}

/// Immutable set of layout documents.
#[derive(Debug, Clone, Default)]
pub struct SupportFiles {
    files: Vec<SupportFile>,
}

impl SupportFiles {
    /// Empty set, used when no layout directory is configured.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a set from already-loaded files.
    pub fn from_files(mut files: Vec<SupportFile>) -> Self {
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Self { files }
    }

    /// Read every regular file directly inside `dir`.
    ///
    /// Subdirectories are skipped, not recursed into.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be listed or any file is not readable
    /// UTF-8. Callers treat both as fatal: serving with a partial layout set
    /// is not allowed.
    pub fn load(dir: &Path) -> Result<Self, SupportError> {
        let read_dir = |source| SupportError::ReadDir {
            path: dir.to_path_buf(),
            source,
        };

        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(read_dir)? {
            let entry = entry.map_err(read_dir)?;
            let path = entry.path();

            // Follows symlinks, so a linked layout counts as a file
            if !path.is_file() {
                continue;
            }

            let body = std::fs::read_to_string(&path).map_err(|source| {
                SupportError::ReadFile {
                    path: path.clone(),
                    source,
                }
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();

            tracing::debug!("Loaded layout {} ({} bytes)", name, body.len());
            files.push(SupportFile { name, body });
        }

        Ok(Self::from_files(files))
    }

    /// Find a file by exact name.
    pub fn find(&self, name: &str) -> Option<&SupportFile> {
        self.files.iter().find(|file| file.name == name)
    }

    /// Body of the file named by `selector`, if any.
    pub fn resolve(&self, selector: Option<&str>) -> Option<&str> {
        selector
            .and_then(|name| self.find(name))
            .map(|file| file.body.as_str())
    }

    /// Names of every loaded file, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|file| file.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
