use serde::{Deserialize, Serialize};

/// Intent classes produced by the upstream extractor. Anything it does not
/// recognize comes through as Unknown rather than failing the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    BookAppointment,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub intent: Intent,
    pub date: Option<String>,
    pub time: Option<String>,
    pub service_label: Option<String>,
    pub raw_text: String,
}

impl BookingRequest {
    /// Neutral request substituted when intent extraction is unavailable
    /// or fails. Carries the original text so nothing is lost downstream.
    pub fn unknown(raw_text: &str) -> Self {
        Self {
            intent: Intent::Unknown,
            date: None,
            time: None,
            service_label: None,
            raw_text: raw_text.to_string(),
        }
    }

    pub fn summary(&self) -> &str {
        self.service_label
            .as_deref()
            .filter(|label| !label.trim().is_empty())
            .unwrap_or("Appointment")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    MissingInput,
    InvalidDatetimeFormat,
    ConfigurationError,
    DatetimeLocalizationError,
    ConflictDetected,
    NoConflict,
    CalendarAgentError,
}

/// Decision gate output. Constructed once per request, never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    pub approved: bool,
    pub reason: ReasonCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl Verdict {
    pub fn approved() -> Self {
        Self {
            approved: true,
            reason: ReasonCode::NoConflict,
            details: None,
        }
    }

    pub fn rejected(reason: ReasonCode, details: Option<String>) -> Self {
        Self {
            approved: false,
            reason,
            details,
        }
    }
}

/// Structured result of the calendar writer.
#[derive(Debug, Clone, Serialize)]
pub struct BookingReport {
    pub success: bool,
    pub message: String,
    pub event_id: Option<String>,
    pub event_link: Option<String>,
}

impl BookingReport {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            event_id: None,
            event_link: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Booked,
    Rejected,
    BookingFailed,
    Error,
}

/// Terminal artifact returned to the caller, also the webhook reply body.
#[derive(Debug, Clone, Serialize)]
pub struct BookingOutcome {
    pub status: BookingStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ReasonCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_link: Option<String>,
}

impl BookingOutcome {
    pub fn rejected(verdict: Verdict) -> Self {
        let message = verdict.details.clone().unwrap_or_else(|| match verdict.reason {
            ReasonCode::ConflictDetected => {
                "The requested time slot is already booked or conflicts with another event."
                    .to_string()
            }
            _ => "Booking request was not approved.".to_string(),
        });
        Self {
            status: BookingStatus::Rejected,
            message,
            reason: Some(verdict.reason),
            details: verdict.details,
            event_id: None,
            event_link: None,
        }
    }

    pub fn booked(report: BookingReport) -> Self {
        Self {
            status: BookingStatus::Booked,
            message: report.message,
            reason: None,
            details: None,
            event_id: report.event_id,
            event_link: report.event_link,
        }
    }

    pub fn booking_failed(report: BookingReport) -> Self {
        Self {
            status: BookingStatus::BookingFailed,
            message: report.message,
            reason: None,
            details: None,
            event_id: None,
            event_link: None,
        }
    }

    pub fn error(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            status: BookingStatus::Error,
            message: message.into(),
            reason: None,
            details: Some(details.into()),
            event_id: None,
            event_link: None,
        }
    }
}
