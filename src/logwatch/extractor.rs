//! Pattern matching over individual Teams log lines
//!
//! Only three shapes of line carry presence information; everything else is ignored.

use regex::Regex;
use tracing::debug;

use super::schema::{CallActivity, PresenceStatus};

const STATUS_PATTERN: &str = r"(?m)availability: (\w+), unread notification count: ([0-9]+)";
const CALL_START_PATTERN: &str = r"(?m)HfpVoipCallCoordinatorImpl: NotifyCallActive";
const CALL_END_PATTERN: &str =
    r"(?m)HfpVoipCallCoordinatorImpl: HfpVoipCallCoordinatorImpl:reportCallEnded";

/// Status word Teams logs for activity-feed updates; not a real availability
const ACTIVITY_SENTINEL: &str = "NewActivity";

/// Fields learned from a single line. `None` means the line said nothing about it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PartialUpdate {
    pub status: Option<PresenceStatus>,
    /// Unread count exactly as logged
    pub notification_count: Option<String>,
    pub activity: Option<CallActivity>,
}

impl PartialUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.notification_count.is_none() && self.activity.is_none()
    }
}

/// Compiled line patterns
#[derive(Debug, Clone)]
pub struct PatternExtractor {
    status: Regex,
    call_start: Regex,
    call_end: Regex,
}

impl Default for PatternExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternExtractor {
    pub fn new() -> Self {
        Self {
            status: Regex::new(STATUS_PATTERN).expect("status pattern is valid"),
            call_start: Regex::new(CALL_START_PATTERN).expect("call start pattern is valid"),
            call_end: Regex::new(CALL_END_PATTERN).expect("call end pattern is valid"),
        }
    }

    /// Extract whatever the line says about status, count and call activity.
    ///
    /// Every occurrence is applied in order, so the last one wins per field.
    /// A call-end marker is evaluated after call-start on the same line.
    pub fn extract(&self, line: &str) -> PartialUpdate {
        let mut update = PartialUpdate::default();

        for caps in self.status.captures_iter(line) {
            let word = &caps[1];
            if word != ACTIVITY_SENTINEL {
                match PresenceStatus::from_log_word(word) {
                    Some(status) => update.status = Some(status),
                    None => debug!(word, "Ignoring unrecognized availability"),
                }
            }

            update.notification_count = Some(caps[2].to_string());
        }

        if self.call_start.is_match(line) {
            update.activity = Some(CallActivity::InCall);
        }
        if self.call_end.is_match(line) {
            update.activity = Some(CallActivity::NotInCall);
        }

        update
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CALL_START: &str = "2024-05-02T09:14:01.123Z 0x1 <INFO> HfpVoipCallCoordinatorImpl: NotifyCallActive, callId: 8f3c";
    const CALL_END: &str = "2024-05-02T09:40:12.456Z 0x1 <INFO> HfpVoipCallCoordinatorImpl: HfpVoipCallCoordinatorImpl:reportCallEnded callId: 8f3c";

    #[test]
    fn test_unrelated_line_is_empty() {
        let extractor = PatternExtractor::new();
        let line = "2024-05-02T09:14:01.123Z 0x1 <INFO> WebViewWindowWin: focus changed";
        for _ in 0..3 {
            let update = extractor.extract(line);
            assert!(update.is_empty());
        }
        assert!(extractor.extract("").is_empty());
    }

    #[test]
    fn test_status_and_count() {
        let extractor = PatternExtractor::new();
        let update = extractor.extract(
            "<INFO> TaskbarBadgeServiceLegacy: Badge update: availability: Busy, unread notification count: 12",
        );
        assert_eq!(update.status, Some(PresenceStatus::Busy));
        assert_eq!(update.notification_count, Some("12".to_string()));
        assert_eq!(update.activity, None);
    }

    #[test]
    fn test_sentinel_only_updates_count() {
        let extractor = PatternExtractor::new();
        let update = extractor.extract("availability: NewActivity, unread notification count: 2");
        assert_eq!(update.status, None);
        assert_eq!(update.notification_count, Some("2".to_string()));
    }

    #[test]
    fn test_unrecognized_word_only_updates_count() {
        let extractor = PatternExtractor::new();
        let update = extractor.extract("availability: Sleeping, unread notification count: 5");
        assert_eq!(update.status, None);
        assert_eq!(update.notification_count, Some("5".to_string()));
    }

    #[test]
    fn test_call_markers() {
        let extractor = PatternExtractor::new();
        assert_eq!(extractor.extract(CALL_START).activity, Some(CallActivity::InCall));
        assert_eq!(extractor.extract(CALL_END).activity, Some(CallActivity::NotInCall));
    }

    #[test]
    fn test_end_marker_wins_on_same_line() {
        let extractor = PatternExtractor::new();
        let line = format!("{} | {}", CALL_END, CALL_START);
        assert_eq!(extractor.extract(&line).activity, Some(CallActivity::NotInCall));
    }

    #[test]
    fn test_last_status_occurrence_wins() {
        let extractor = PatternExtractor::new();
        let update = extractor.extract(
            "availability: Away, unread notification count: 1; availability: Available, unread notification count: 0",
        );
        assert_eq!(update.status, Some(PresenceStatus::Available));
        assert_eq!(update.notification_count, Some("0".to_string()));
    }

    #[test]
    fn test_status_and_call_on_same_line() {
        let extractor = PatternExtractor::new();
        let line = format!("availability: InAMeeting, unread notification count: 0 {}", CALL_START);
        let update = extractor.extract(&line);
        assert_eq!(update.status, Some(PresenceStatus::InAMeeting));
        assert_eq!(update.activity, Some(CallActivity::InCall));
    }

    #[test]
    fn test_count_kept_verbatim() {
        let extractor = PatternExtractor::new();
        let update = extractor.extract(
            "availability: Away, unread notification count: 99999999999999999999999",
        );
        assert_eq!(update.status, Some(PresenceStatus::Away));
        assert_eq!(
            update.notification_count.as_deref(),
            Some("99999999999999999999999")
        );

        let update = extractor.extract("availability: Away, unread notification count: 007");
        assert_eq!(update.notification_count.as_deref(), Some("007"));
    }

    #[test]
    fn test_count_requires_ascii_digits() {
        let extractor = PatternExtractor::new();
        let update = extractor.extract("availability: Away, unread notification count: \u{663}");
        assert!(update.is_empty());
    }
}
