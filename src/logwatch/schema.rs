//! Presence vocabulary and published events

use serde::{Deserialize, Serialize};

/// Availability as reported by Teams itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PresenceStatus {
    Available,
    Busy,
    OnThePhone,
    Away,
    BeRightBack,
    DoNotDisturb,
    Presenting,
    Focusing,
    InAMeeting,
    Offline,
    /// Nothing observed yet
    #[default]
    Unknown,
}

impl PresenceStatus {
    /// Map a status word from the log by exact variant name.
    ///
    /// An unrecognized word yields `None`.
    pub fn from_log_word(word: &str) -> Option<Self> {
        match word {
            "Available" => Some(PresenceStatus::Available),
            "Busy" => Some(PresenceStatus::Busy),
            "OnThePhone" => Some(PresenceStatus::OnThePhone),
            "Away" => Some(PresenceStatus::Away),
            "BeRightBack" => Some(PresenceStatus::BeRightBack),
            "DoNotDisturb" => Some(PresenceStatus::DoNotDisturb),
            "Presenting" => Some(PresenceStatus::Presenting),
            "Focusing" => Some(PresenceStatus::Focusing),
            "InAMeeting" => Some(PresenceStatus::InAMeeting),
            "Offline" => Some(PresenceStatus::Offline),
            "Unknown" => Some(PresenceStatus::Unknown),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PresenceStatus::Available => "Available",
            PresenceStatus::Busy => "Busy",
            PresenceStatus::OnThePhone => "OnThePhone",
            PresenceStatus::Away => "Away",
            PresenceStatus::BeRightBack => "BeRightBack",
            PresenceStatus::DoNotDisturb => "DoNotDisturb",
            PresenceStatus::Presenting => "Presenting",
            PresenceStatus::Focusing => "Focusing",
            PresenceStatus::InAMeeting => "InAMeeting",
            PresenceStatus::Offline => "Offline",
            PresenceStatus::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a call is currently active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CallActivity {
    InCall,
    #[default]
    NotInCall,
}

impl CallActivity {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallActivity::InCall => "InCall",
            CallActivity::NotInCall => "NotInCall",
        }
    }
}

impl std::fmt::Display for CallActivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Change notification published to subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "value", rename_all = "snake_case")]
pub enum PresenceEvent {
    StatusChanged(PresenceStatus),
    ActivityChanged(CallActivity),
    /// Unread notification count, decimal encoded
    NotificationChanged(String),
}

/// Point-in-time view of everything learned from the log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceSnapshot {
    pub status: PresenceStatus,
    pub activity: CallActivity,
    /// Unread count as logged ("0" until the first status line)
    pub notification_count: String,
}

impl Default for PresenceSnapshot {
    fn default() -> Self {
        Self {
            status: PresenceStatus::default(),
            activity: CallActivity::default(),
            notification_count: "0".to_string(),
        }
    }
}

impl PresenceSnapshot {
    /// All three values as events, in publication order.
    pub fn to_events(&self) -> Vec<PresenceEvent> {
        vec![
            PresenceEvent::StatusChanged(self.status),
            PresenceEvent::ActivityChanged(self.activity),
            PresenceEvent::NotificationChanged(self.notification_count.clone()),
        ]
    }
}
