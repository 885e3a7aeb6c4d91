//! Wake-up signal shared by the change watcher and the streaming loop
//!
//! A persistent dirty flag behind one mutex: the watcher sets it, the reader
//! consumes it before draining. A write landing mid-read leaves the flag set,
//! so the next wait returns immediately and no growth is lost.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Why a wait returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// The tailed file changed
    Growth,
    /// Poll interval elapsed without a signal
    Timeout,
    /// Stop was requested
    Stopped,
}

#[derive(Debug, Default)]
struct SignalState {
    watched: Option<PathBuf>,
    dirty: bool,
    stopped: bool,
}

#[derive(Debug, Default)]
pub struct GrowthSignal {
    state: Mutex<SignalState>,
    cond: Condvar,
}

impl GrowthSignal {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SignalState> {
        // The state is a pair of flags; a panicked holder cannot leave it inconsistent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Set the file whose changes should wake the reader.
    pub fn watch_path(&self, path: PathBuf) {
        self.lock().watched = Some(path);
    }

    /// Mark dirty unconditionally.
    pub fn mark(&self) {
        let mut state = self.lock();
        state.dirty = true;
        self.cond.notify_all();
    }

    /// Mark dirty if any of `paths` is the watched file.
    ///
    /// The path check runs under the same lock the reader consumes the flag with.
    pub fn mark_if_watched<'a, I>(&self, paths: I) -> bool
    where
        I: IntoIterator<Item = &'a Path>,
    {
        let mut state = self.lock();
        let hit = match state.watched.as_deref() {
            Some(watched) => paths.into_iter().any(|p| same_file(p, watched)),
            None => false,
        };
        if hit {
            state.dirty = true;
            self.cond.notify_all();
        }
        hit
    }

    pub fn stop(&self) {
        let mut state = self.lock();
        state.stopped = true;
        self.cond.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }

    /// Block until marked, stopped, or `timeout` elapses. Consumes the dirty flag.
    pub fn wait(&self, timeout: Duration) -> Wake {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();

        loop {
            if state.stopped {
                return Wake::Stopped;
            }
            if state.dirty {
                state.dirty = false;
                return Wake::Growth;
            }

            let now = Instant::now();
            if now >= deadline {
                return Wake::Timeout;
            }

            state = match self.cond.wait_timeout(state, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }
}

fn same_file(candidate: &Path, watched: &Path) -> bool {
    if candidate == watched {
        return true;
    }
    // Backends may report a differently spelled path (symlinked temp dirs on macOS)
    candidate.file_name() == watched.file_name()
        && std::fs::canonicalize(candidate)
            .map(|c| c == watched)
            .unwrap_or(false)
}

/// Cloneable handle that stops a running engine
#[derive(Debug, Clone)]
pub struct StopHandle {
    signal: Arc<GrowthSignal>,
}

impl StopHandle {
    pub(crate) fn new(signal: Arc<GrowthSignal>) -> Self {
        Self { signal }
    }

    /// Ask the streaming loop to exit at the top of its next iteration.
    pub fn stop(&self) {
        self.signal.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.signal.is_stopped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_times_out() {
        let signal = GrowthSignal::new();
        let started = Instant::now();
        assert_eq!(signal.wait(Duration::from_millis(20)), Wake::Timeout);
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_mark_persists_until_consumed() {
        let signal = GrowthSignal::new();
        signal.mark();
        signal.mark();
        assert_eq!(signal.wait(Duration::from_millis(10)), Wake::Growth);
        // both marks collapse into one wake-up
        assert_eq!(signal.wait(Duration::from_millis(10)), Wake::Timeout);
    }

    #[test]
    fn test_mark_if_watched_filters_paths() {
        let signal = GrowthSignal::new();
        signal.watch_path(PathBuf::from("/logs/MSTeams_1.log"));

        assert!(!signal.mark_if_watched([Path::new("/logs/MSTeams_0.log")]));
        assert_eq!(signal.wait(Duration::from_millis(10)), Wake::Timeout);

        assert!(signal.mark_if_watched([
            Path::new("/logs/other.log"),
            Path::new("/logs/MSTeams_1.log"),
        ]));
        assert_eq!(signal.wait(Duration::from_millis(10)), Wake::Growth);
    }

    #[test]
    fn test_wakes_waiting_thread() {
        let signal = Arc::new(GrowthSignal::new());
        let waiter = {
            let signal = Arc::clone(&signal);
            std::thread::spawn(move || signal.wait(Duration::from_secs(10)))
        };
        std::thread::sleep(Duration::from_millis(20));
        signal.mark();
        assert_eq!(waiter.join().unwrap(), Wake::Growth);
    }

    #[test]
    fn test_stop_wins_over_growth() {
        let signal = Arc::new(GrowthSignal::new());
        let handle = StopHandle::new(Arc::clone(&signal));
        signal.mark();
        handle.stop();
        assert!(handle.is_stopped());
        assert_eq!(signal.wait(Duration::from_secs(10)), Wake::Stopped);
    }
}
