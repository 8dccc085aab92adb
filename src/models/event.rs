use serde::{Deserialize, Serialize};

/// One bound of a remote event. The remote format sends exactly one of
/// `dateTime` (RFC3339 with offset) or `date` (calendar date, used by
/// all-day events, end date exclusive).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventTime {
    #[serde(rename = "dateTime", skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(rename = "timeZone", skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventTime {
    pub fn timed(stamp: impl Into<String>, time_zone: impl Into<String>) -> Self {
        Self {
            date_time: Some(stamp.into()),
            date: None,
            time_zone: Some(time_zone.into()),
        }
    }

    pub fn all_day(date: impl Into<String>) -> Self {
        Self {
            date_time: None,
            date: Some(date.into()),
            time_zone: None,
        }
    }
}

/// Read-only snapshot of an existing calendar entry, as returned by the
/// remote query. Never cached; each conflict check fetches afresh.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub start: EventTime,
    #[serde(default)]
    pub end: EventTime,
}

#[derive(Debug, Deserialize)]
pub struct EventListing {
    #[serde(default)]
    pub items: Vec<RemoteEvent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReminderOverride {
    pub method: String,
    pub minutes: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventReminders {
    #[serde(rename = "useDefault")]
    pub use_default: bool,
    pub overrides: Vec<ReminderOverride>,
}

/// Insert body submitted by the calendar writer.
#[derive(Debug, Clone, Serialize)]
pub struct EventPayload {
    pub summary: String,
    pub description: String,
    pub start: EventTime,
    pub end: EventTime,
    pub attendees: Vec<serde_json::Value>,
    pub reminders: EventReminders,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InsertedEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "htmlLink", default)]
    pub html_link: Option<String>,
}
