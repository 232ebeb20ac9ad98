//! JSON-backed storage for the progress history.
//!
//! The file holds a single JSON array of [`ProgressEntry`] records. Reading
//! returns the full history; appending reads the history, pushes one record
//! and rewrites the whole file.

use std::path::{Path, PathBuf};

use crate::{ProgressEntry, ProgressError, Result};

/// Append-only progress log stored as a JSON array on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressLog {
    path: PathBuf,
}

impl ProgressLog {
    /// Creates a log backed by the file at `path`.
    ///
    /// The file is not touched until the first [`ProgressLog::load`] or
    /// [`ProgressLog::append`].
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the full history.
    ///
    /// A missing or empty file is an empty history.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressError::Io`] if the file cannot be read.
    /// Returns [`ProgressError::Corrupted`] if the file is not a JSON array of entries.
    pub fn load(&self) -> Result<Vec<ProgressEntry>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ProgressError::Io(e)),
        };

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&contents).map_err(|e| ProgressError::Corrupted {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    /// Appends one entry and rewrites the file.
    ///
    /// Parent directories are created when missing. Returns the number of
    /// entries in the history after the append.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`ProgressLog::load`], plus
    /// [`ProgressError::Serialization`] or [`ProgressError::Io`] if writing fails.
    pub fn append(&self, entry: ProgressEntry) -> Result<usize> {
        let mut history = self.load()?;
        history.push(entry);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(&history)?;
        std::fs::write(&self.path, json)?;

        Ok(history.len())
    }
}
