//! Filesystem notifications for the tailed log file

use notify::event::EventKind;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::Arc;
use tracing::{trace, warn};

use super::signal::GrowthSignal;
use crate::error::Result;

/// Keeps the OS watcher alive; dropping it stops notifications
pub struct ChangeWatcher {
    _watcher: RecommendedWatcher,
}

impl ChangeWatcher {
    /// Watch the parent directory of `file` and mark `signal` whenever `file` changes.
    pub fn install(file: &Path, signal: Arc<GrowthSignal>) -> Result<Self> {
        signal.watch_path(file.to_path_buf());

        let mut watcher =
            notify::recommended_watcher(move |res: std::result::Result<notify::Event, notify::Error>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        warn!("Log watcher error: {}", e);
                        signal.mark();
                        return;
                    }
                };

                match event.kind {
                    EventKind::Modify(_) | EventKind::Create(_) => {
                        let hit = signal.mark_if_watched(event.paths.iter().map(|p| p.as_path()));
                        trace!(paths = ?event.paths, hit, "Log directory changed");
                    }
                    // Details were dropped by the backend; read anyway
                    EventKind::Other => signal.mark(),
                    _ => {}
                }
            })?;

        let watch_dir = file.parent().unwrap_or(file);
        watcher.watch(watch_dir, RecursiveMode::NonRecursive)?;

        Ok(Self { _watcher: watcher })
    }
}
