//! Error types for file load and save.
//!
//! The `Display` text of each variant is what the editor shows in its
//! notification area, so it is written for the user.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// A failed file load or save.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("File '{}' not found!", .path.display())]
    NotFound { path: PathBuf },

    #[error("File '{}' is not valid UTF-8", .path.display())]
    InvalidUtf8 { path: PathBuf },

    #[error("Failed to open file '{}'! ({source})", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to save file '{}'! ({source})", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No file name to save to")]
    NoPath,
}

impl FileError {
    /// Classify an error from reading `path`.
    #[must_use]
    pub fn from_read(path: &Path, source: io::Error) -> Self {
        let path = path.to_path_buf();
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path },
            io::ErrorKind::InvalidData => Self::InvalidUtf8 { path },
            _ => Self::Read { path, source },
        }
    }

    /// Wrap an error from writing `path`.
    #[must_use]
    pub fn from_write(path: &Path, source: io::Error) -> Self {
        Self::Write {
            path: path.to_path_buf(),
            source,
        }
    }

    /// True when the file simply doesn't exist yet.
    #[inline]
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
