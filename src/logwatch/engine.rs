//! Presence engine: select the active log, follow it, and publish changes
//!
//! ## Lifecycle
//! - `PresenceEngine::start` runs the initializing phase synchronously: select the
//!   newest log file, open it at end of file, install the watcher. Any failure is
//!   returned to the caller before the loop exists.
//! - `RunningEngine::run` is the streaming loop. It returns `Ok(())` when stopped
//!   through a `StopHandle` and `Err` on the first read failure.
//!
//! ## Emission policy
//! Changes seen during the first `throttle` after start update state silently.
//! When that window expires the full snapshot is published once; from then on
//! every field change is published as soon as its line is read.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{debug, info, trace};

use super::extractor::{PartialUpdate, PatternExtractor};
use super::schema::{PresenceEvent, PresenceSnapshot};
use super::selector::{select_newest, DEFAULT_FILE_PATTERN};
use super::signal::{GrowthSignal, StopHandle, Wake};
use super::tail::TailReader;
use super::watcher::ChangeWatcher;
use crate::error::Result;

/// Engine settings
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory holding the rotating log files
    pub log_dir: PathBuf,
    /// Glob matched against file names in `log_dir`
    pub file_pattern: String,
    /// Initial quiet window before the first snapshot
    pub throttle: Duration,
    /// Fallback wake-up in case a notification is missed
    pub poll_interval: Duration,
    /// Events buffered per subscriber before it starts lagging
    pub event_buffer: usize,
}

impl EngineConfig {
    pub fn new(log_dir: PathBuf) -> Self {
        Self {
            log_dir,
            file_pattern: DEFAULT_FILE_PATTERN.to_string(),
            throttle: Duration::from_secs(2),
            poll_interval: Duration::from_millis(100),
            event_buffer: 64,
        }
    }
}

/// State owned by the streaming loop
#[derive(Debug, Clone)]
pub struct EngineState {
    snapshot: PresenceSnapshot,
    has_emitted_once: bool,
    started_at: Instant,
    throttle: Duration,
}

impl EngineState {
    pub fn new(started_at: Instant, throttle: Duration) -> Self {
        Self {
            snapshot: PresenceSnapshot::default(),
            has_emitted_once: false,
            started_at,
            throttle,
        }
    }

    pub fn snapshot(&self) -> &PresenceSnapshot {
        &self.snapshot
    }

    pub fn has_emitted_once(&self) -> bool {
        self.has_emitted_once
    }

    /// Whether changes are currently being held back
    pub fn is_throttled(&self) -> bool {
        !self.has_emitted_once
    }

    /// Close the initial window if it has expired, returning the snapshot to publish.
    pub fn tick(&mut self, now: Instant) -> Vec<PresenceEvent> {
        if self.has_emitted_once || now.duration_since(self.started_at) < self.throttle {
            return Vec::new();
        }
        self.has_emitted_once = true;
        self.snapshot.to_events()
    }

    /// Fold one line's update into the state.
    ///
    /// Returns the change events to publish: empty while throttled, otherwise one
    /// event per field whose value actually changed (status, count, activity).
    pub fn apply(&mut self, update: PartialUpdate) -> Vec<PresenceEvent> {
        let mut changes = Vec::new();

        if let Some(status) = update.status {
            if status != self.snapshot.status {
                self.snapshot.status = status;
                changes.push(PresenceEvent::StatusChanged(status));
            }
        }
        if let Some(count) = update.notification_count {
            if count != self.snapshot.notification_count {
                changes.push(PresenceEvent::NotificationChanged(count.clone()));
                self.snapshot.notification_count = count;
            }
        }
        if let Some(activity) = update.activity {
            if activity != self.snapshot.activity {
                self.snapshot.activity = activity;
                changes.push(PresenceEvent::ActivityChanged(activity));
            }
        }

        if self.is_throttled() {
            if !changes.is_empty() {
                trace!(held = changes.len(), "Change held inside throttle window");
            }
            return Vec::new();
        }
        changes
    }
}

/// Presence engine before start
pub struct PresenceEngine {
    config: EngineConfig,
    extractor: PatternExtractor,
    events: broadcast::Sender<PresenceEvent>,
    signal: Arc<GrowthSignal>,
}

impl PresenceEngine {
    pub fn new(config: EngineConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_buffer.max(1));
        Self {
            config,
            extractor: PatternExtractor::new(),
            events,
            signal: Arc::new(GrowthSignal::new()),
        }
    }

    /// Receive every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<PresenceEvent> {
        self.events.subscribe()
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle::new(Arc::clone(&self.signal))
    }

    /// Initialize: pick the log file, open it at end of file, and start watching it.
    pub fn start(self) -> Result<RunningEngine> {
        let selected = select_newest(&self.config.log_dir, &self.config.file_pattern)?;
        let path = std::fs::canonicalize(&selected)?;
        info!("Tailing Teams log: {}", path.display());

        let tail = TailReader::open_at_end(&path, Arc::clone(&self.signal))?;
        let watcher = ChangeWatcher::install(&path, Arc::clone(&self.signal))?;

        Ok(RunningEngine {
            tail,
            _watcher: watcher,
            extractor: self.extractor,
            events: self.events,
            signal: self.signal,
            state: EngineState::new(Instant::now(), self.config.throttle),
            poll_interval: self.config.poll_interval,
        })
    }
}

/// Presence engine in the streaming phase
pub struct RunningEngine {
    tail: TailReader,
    _watcher: ChangeWatcher,
    extractor: PatternExtractor,
    events: broadcast::Sender<PresenceEvent>,
    signal: Arc<GrowthSignal>,
    state: EngineState,
    poll_interval: Duration,
}

impl RunningEngine {
    /// Path of the tailed file
    pub fn log_path(&self) -> &Path {
        self.tail.path()
    }

    /// Run the streaming loop until stopped or a read fails.
    pub fn run(mut self) -> Result<()> {
        info!("Presence engine streaming");

        loop {
            if self.signal.is_stopped() {
                break;
            }
            if self.tail.wait_for_growth(self.poll_interval) == Wake::Stopped {
                break;
            }
            if let Err(e) = self.step(Instant::now()) {
                tracing::error!("Presence engine stopped on read failure: {}", e);
                return Err(e);
            }
        }

        info!("Presence engine stopped");
        Ok(())
    }

    /// One loop iteration after the wait: throttle check, then drain new lines.
    pub fn step(&mut self, now: Instant) -> Result<()> {
        let snapshot = self.state.tick(now);
        if !snapshot.is_empty() {
            debug!("Throttle window closed, publishing snapshot");
            self.publish(snapshot);
        }

        for line in self.tail.read_new_lines()? {
            let update = self.extractor.extract(&line);
            if update.is_empty() {
                continue;
            }
            let changes = self.state.apply(update);
            self.publish(changes);
        }

        Ok(())
    }

    fn publish(&self, events: Vec<PresenceEvent>) {
        for event in events {
            debug!(?event, "Publishing presence event");
            // No subscribers is fine
            let _ = self.events.send(event);
        }
    }
}

/// Run every line of `path` through the extractor from the beginning, unthrottled.
pub fn replay(path: &Path) -> Result<PresenceSnapshot> {
    let extractor = PatternExtractor::new();
    let mut tail = TailReader::open_from_start(path, Arc::new(GrowthSignal::new()))?;
    let mut state = EngineState::new(Instant::now(), Duration::ZERO);
    state.tick(Instant::now());

    let mut lines = tail.read_new_lines()?;
    lines.extend(tail.take_partial());
    for line in lines {
        state.apply(extractor.extract(&line));
    }

    Ok(state.snapshot().clone())
}
