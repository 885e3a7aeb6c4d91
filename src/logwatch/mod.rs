//! Teams log tailing and presence extraction
//!
//! This module follows the newest Teams client log file, extracts presence,
//! call and notification state from known line patterns, and publishes changes.

pub mod engine;
pub mod extractor;
pub mod schema;
pub mod selector;
pub mod signal;
pub mod tail;
pub mod watcher;

pub use engine::{replay, EngineConfig, EngineState, PresenceEngine, RunningEngine};
pub use extractor::{PartialUpdate, PatternExtractor};
pub use schema::{CallActivity, PresenceEvent, PresenceSnapshot, PresenceStatus};
pub use selector::{select_newest, DEFAULT_FILE_PATTERN};
pub use signal::{GrowthSignal, StopHandle, Wake};
pub use tail::TailReader;
pub use watcher::ChangeWatcher;
