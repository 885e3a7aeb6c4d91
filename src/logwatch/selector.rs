//! Active log file detection
//!
//! Teams rotates its log into numbered files; the one being written is the newest.

use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;
use wildmatch::WildMatch;

use crate::error::{Error, Result};

/// Default file name pattern for the Teams client log
pub const DEFAULT_FILE_PATTERN: &str = "MSTeams_*.log";

/// Pick the most recently modified file in `dir` whose name matches `pattern`.
///
/// Ties keep the first file encountered.
pub fn select_newest(dir: &Path, pattern: &str) -> Result<PathBuf> {
    if !dir.is_dir() {
        return Err(Error::Configuration(dir.to_path_buf()));
    }

    let matcher = WildMatch::new(pattern);
    let mut newest: Option<(PathBuf, SystemTime)> = None;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        let name_matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| matcher.matches(n))
            .unwrap_or(false);
        if !name_matches {
            continue;
        }

        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified()?;
        debug!("Candidate log file: {}", path.display());

        if newest.as_ref().map(|(_, t)| modified > *t).unwrap_or(true) {
            newest = Some((path, modified));
        }
    }

    newest.map(|(path, _)| path).ok_or_else(|| Error::SourceUnavailable {
        dir: dir.to_path_buf(),
        pattern: pattern.to_string(),
    })
}
