//! Error types for the presence engine.

use std::path::PathBuf;
use thiserror::Error;

/// Presence engine error type.
#[derive(Error, Debug)]
pub enum Error {
    /// The log directory is missing or is not a directory.
    #[error("Log directory {} does not exist", .0.display())]
    Configuration(PathBuf),

    /// No file in the log directory matches the pattern.
    #[error("No log file matching '{pattern}' in {}", .dir.display())]
    SourceUnavailable { dir: PathBuf, pattern: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The filesystem watcher could not be installed.
    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
