use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::clients::calendar_client::CalendarApiError;
use crate::models::booking::{BookingReport, BookingRequest};
use crate::models::event::{EventPayload, EventReminders, EventTime, InsertedEvent, ReminderOverride};
use crate::service::conflict_service::ConflictSource;
use crate::service::slot::{BookingPolicy, Slot, SlotError, proposed_slot};

/// Remote event creation. The calendar writer is the only component that
/// goes through this seam; everything else is read-only.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn insert_event(&self, payload: &EventPayload) -> Result<InsertedEvent, CalendarApiError>;
}

#[async_trait]
pub trait AppointmentWriter: Send + Sync {
    async fn book_appointment(
        &self,
        request: &BookingRequest,
    ) -> Result<BookingReport, Box<dyn std::error::Error + Send + Sync>>;
}

pub struct CalendarWriter {
    sink: Option<Arc<dyn EventSink>>,
    conflicts: Arc<dyn ConflictSource>,
    policy: BookingPolicy,
}

impl CalendarWriter {
    pub fn new(
        sink: Option<Arc<dyn EventSink>>,
        conflicts: Arc<dyn ConflictSource>,
        policy: BookingPolicy,
    ) -> Self {
        Self { sink, conflicts, policy }
    }
}

pub(crate) fn event_payload(request: &BookingRequest, slot: &Slot) -> EventPayload {
    let zone = slot.start.timezone().name().to_string();
    EventPayload {
        summary: request.summary().to_string(),
        description: format!("Booked via API. Original request: {}", request.raw_text),
        start: EventTime::timed(slot.start.to_rfc3339(), zone.clone()),
        end: EventTime::timed(slot.end.to_rfc3339(), zone),
        attendees: Vec::new(),
        reminders: EventReminders {
            use_default: false,
            overrides: vec![
                ReminderOverride { method: "email".to_string(), minutes: 24 * 60 },
                ReminderOverride { method: "popup".to_string(), minutes: 15 },
            ],
        },
    }
}

#[async_trait]
impl AppointmentWriter for CalendarWriter {
    async fn book_appointment(
        &self,
        request: &BookingRequest,
    ) -> Result<BookingReport, Box<dyn std::error::Error + Send + Sync>> {
        let Some(sink) = &self.sink else {
            error!("Attempted to book an appointment, but no calendar connection is configured.");
            return Ok(BookingReport::failure(
                "Calendar service not available. Please check server logs.",
            ));
        };

        let (Some(date), Some(time)) = (request.date.as_deref(), request.time.as_deref()) else {
            warn!("Booking attempt failed: missing date or time in request.");
            return Ok(BookingReport::failure("Missing date or time for the appointment."));
        };

        // The slot is derived from the raw strings again rather than
        // trusting anything cached from the decision gate, and conflicts
        // are re-checked right before the write: the store may have
        // changed since the gate approved. There is no lock between the
        // two checks, so the window is narrowed, not closed.
        let slot = match proposed_slot(date, time, &self.policy) {
            Ok(slot) => slot,
            Err(SlotError::MissingInput | SlotError::InvalidFormat(_)) => {
                warn!("Booking attempt failed: invalid date/time '{date} {time}'.");
                return Ok(BookingReport::failure(
                    "Invalid date/time format. Use YYYY-MM-DD HH:MM or YYYY-MM-DD hh:mm AM/PM.",
                ));
            }
            Err(err) => {
                warn!("Booking attempt failed: {err}");
                return Ok(BookingReport::failure(format!(
                    "Could not schedule the appointment: {err}"
                )));
            }
        };

        let conflict = self.conflicts.has_conflict(&slot).await.unwrap_or(true);
        if conflict {
            info!("Booking attempt failed: conflict detected for {}", slot.start.to_rfc3339());
            return Ok(BookingReport::failure(
                "The requested time slot is already booked or conflicts with another event.",
            ));
        }

        let payload = event_payload(request, &slot);
        match sink.insert_event(&payload).await {
            Ok(created) => {
                info!(
                    "Appointment '{}' booked successfully. Event id: {:?}, from {} to {}",
                    payload.summary,
                    created.id,
                    slot.start.to_rfc3339(),
                    slot.end.to_rfc3339(),
                );
                Ok(BookingReport {
                    success: true,
                    message: format!(
                        "{} successfully booked for {} at {}.",
                        payload.summary, date, time
                    ),
                    event_id: created.id,
                    event_link: created.html_link,
                })
            }
            Err(CalendarApiError::Api { status, message }) => {
                error!("Calendar API error during booking: status {status}, details: {message}");
                Ok(BookingReport::failure(format!(
                    "Failed to book appointment due to a calendar service error (Code: {status}). \
                     Please try again later."
                )))
            }
            Err(err) => {
                error!("An unexpected error occurred during booking: {err}");
                Ok(BookingReport::failure(format!("An unexpected error occurred: {err}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::booking::Intent;
    use std::sync::Mutex;

    struct StubConflicts {
        outcome: Option<bool>,
    }

    #[async_trait]
    impl ConflictSource for StubConflicts {
        async fn has_conflict(
            &self,
            _proposed: &Slot,
        ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
            match self.outcome {
                Some(conflict) => Ok(conflict),
                None => Err("Simulated conflict check failure".into()),
            }
        }
    }

    struct FakeSink {
        response: Result<InsertedEvent, u16>,
        inserted: Mutex<Vec<EventPayload>>,
    }

    impl FakeSink {
        fn succeeding() -> Self {
            Self {
                response: Ok(InsertedEvent {
                    id: Some("test_event_id".to_string()),
                    html_link: Some("http://cal.example.com/test_event_id".to_string()),
                }),
                inserted: Mutex::new(Vec::new()),
            }
        }

        fn failing(status: u16) -> Self {
            Self { response: Err(status), inserted: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl EventSink for FakeSink {
        async fn insert_event(
            &self,
            payload: &EventPayload,
        ) -> Result<InsertedEvent, CalendarApiError> {
            self.inserted.lock().unwrap().push(payload.clone());
            match &self.response {
                Ok(created) => Ok(InsertedEvent {
                    id: created.id.clone(),
                    html_link: created.html_link.clone(),
                }),
                Err(status) => Err(CalendarApiError::Api {
                    status: *status,
                    message: "Forbidden".to_string(),
                }),
            }
        }
    }

    fn writer(sink: Option<Arc<FakeSink>>, conflict: Option<bool>) -> CalendarWriter {
        CalendarWriter::new(
            sink.map(|s| s as Arc<dyn EventSink>),
            Arc::new(StubConflicts { outcome: conflict }),
            BookingPolicy::new("America/New_York", 60),
        )
    }

    fn request(date: Option<&str>, time: Option<&str>) -> BookingRequest {
        BookingRequest {
            intent: Intent::BookAppointment,
            date: date.map(str::to_string),
            time: time.map(str::to_string),
            service_label: Some("Client Meeting".to_string()),
            raw_text: "Book a meeting".to_string(),
        }
    }

    #[tokio::test]
    async fn successful_booking_builds_the_expected_payload() {
        let sink = Arc::new(FakeSink::succeeding());
        let writer = writer(Some(sink.clone()), Some(false));

        let report = writer
            .book_appointment(&request(Some("2024-07-15"), Some("02:00 PM")))
            .await
            .unwrap();

        assert!(report.success);
        assert_eq!(report.event_id.as_deref(), Some("test_event_id"));
        assert!(report.message.contains("Client Meeting successfully booked"));

        let inserted = sink.inserted.lock().unwrap();
        assert_eq!(inserted.len(), 1);
        let payload = &inserted[0];
        assert_eq!(payload.summary, "Client Meeting");
        assert_eq!(payload.description, "Booked via API. Original request: Book a meeting");
        // 14:00 EDT on 2024-07-15, one hour long.
        assert_eq!(payload.start.date_time.as_deref(), Some("2024-07-15T14:00:00-04:00"));
        assert_eq!(payload.end.date_time.as_deref(), Some("2024-07-15T15:00:00-04:00"));
        assert_eq!(payload.start.time_zone.as_deref(), Some("America/New_York"));
        assert_eq!(payload.reminders.overrides[0].minutes, 24 * 60);
        assert_eq!(payload.reminders.overrides[1].minutes, 15);
        assert!(!payload.reminders.use_default);
    }

    #[tokio::test]
    async fn missing_date_fails_without_touching_the_sink() {
        let sink = Arc::new(FakeSink::succeeding());
        let writer = writer(Some(sink.clone()), Some(false));

        let report = writer.book_appointment(&request(None, Some("10:00 AM"))).await.unwrap();
        assert!(!report.success);
        assert_eq!(report.message, "Missing date or time for the appointment.");
        assert!(sink.inserted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_datetime_fails_with_a_format_hint() {
        let writer = writer(Some(Arc::new(FakeSink::succeeding())), Some(false));
        let report = writer
            .book_appointment(&request(Some("2024-13-01"), Some("99:00 AM")))
            .await
            .unwrap();
        assert!(!report.success);
        assert!(report.message.contains("Invalid date/time format"));
    }

    #[tokio::test]
    async fn conflict_detected_at_write_time_fails_the_booking() {
        let sink = Arc::new(FakeSink::succeeding());
        let writer = writer(Some(sink.clone()), Some(true));

        let report = writer
            .book_appointment(&request(Some("2024-07-15"), Some("02:00 PM")))
            .await
            .unwrap();
        assert!(!report.success);
        assert!(report.message.contains("already booked"));
        assert!(sink.inserted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn conflict_check_error_is_fail_safe_at_write_time() {
        let sink = Arc::new(FakeSink::succeeding());
        let writer = writer(Some(sink.clone()), None);

        let report = writer
            .book_appointment(&request(Some("2024-07-15"), Some("02:00 PM")))
            .await
            .unwrap();
        assert!(!report.success);
        assert!(sink.inserted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unavailable_sink_reports_service_unavailable() {
        let writer = writer(None, Some(false));
        let report = writer
            .book_appointment(&request(Some("2024-07-15"), Some("02:00 PM")))
            .await
            .unwrap();
        assert!(!report.success);
        assert!(report.message.contains("Calendar service not available"));
    }

    #[tokio::test]
    async fn api_error_embeds_the_status_code() {
        let writer = writer(Some(Arc::new(FakeSink::failing(403))), Some(false));
        let report = writer
            .book_appointment(&request(Some("2024-07-15"), Some("02:00 PM")))
            .await
            .unwrap();
        assert!(!report.success);
        assert!(report.message.contains("(Code: 403)"));
    }
}
