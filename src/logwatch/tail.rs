//! Incremental reading of a file another process keeps appending to

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::signal::{GrowthSignal, Wake};
use crate::error::Result;

/// Follows one log file from a byte offset, yielding complete lines only
#[derive(Debug)]
pub struct TailReader {
    path: PathBuf,
    file: File,
    /// Bytes consumed from the file so far; never moves backwards
    offset: u64,
    /// Trailing bytes not yet terminated by a newline
    partial: Vec<u8>,
    signal: Arc<GrowthSignal>,
}

impl TailReader {
    /// Open `path` read-only and position the cursor at the current end of file.
    ///
    /// `File::open` never takes an exclusive lock, and on Windows std opens with
    /// read, write and delete sharing, so Teams can keep appending.
    pub fn open_at_end(path: &Path, signal: Arc<GrowthSignal>) -> Result<Self> {
        let mut file = File::open(path)?;
        let offset = file.seek(SeekFrom::End(0))?;
        debug!("Tailing {} from offset {}", path.display(), offset);

        Ok(Self {
            path: path.to_path_buf(),
            file,
            offset,
            partial: Vec::new(),
            signal,
        })
    }

    /// Open `path` with the cursor at the start, for replaying a whole file.
    pub fn open_from_start(path: &Path, signal: Arc<GrowthSignal>) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            offset: 0,
            partial: Vec::new(),
            signal,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// All complete lines appended since the previous call.
    ///
    /// A trailing line without its newline stays buffered until it is finished.
    /// Fails if the file was removed or truncated below the cursor.
    pub fn read_new_lines(&mut self) -> Result<Vec<String>> {
        let len = std::fs::metadata(&self.path)?.len();
        if len < self.offset {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "{} shrank to {} bytes below read offset {}",
                    self.path.display(),
                    len,
                    self.offset
                ),
            )
            .into());
        }

        self.file.seek(SeekFrom::Start(self.offset))?;
        let read = self.file.read_to_end(&mut self.partial)?;
        self.offset += read as u64;

        Ok(self.take_complete_lines())
    }

    fn take_complete_lines(&mut self) -> Vec<String> {
        let Some(last_newline) = self.partial.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };

        let rest = self.partial.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.partial, rest);

        complete[..last_newline]
            .split(|b| *b == b'\n')
            .map(|raw| {
                let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
                String::from_utf8_lossy(raw).into_owned()
            })
            .collect()
    }

    /// Hand out the unterminated trailing line, if any. Used when no more data is coming.
    pub fn take_partial(&mut self) -> Option<String> {
        if self.partial.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.partial);
        let raw = raw.strip_suffix(b"\r").unwrap_or(&raw);
        Some(String::from_utf8_lossy(raw).into_owned())
    }

    /// Block until the watcher reports growth, the engine stops, or `timeout` passes.
    pub fn wait_for_growth(&self, timeout: Duration) -> Wake {
        self.signal.wait(timeout)
    }
}
