use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, error, info, warn};

use crate::clients::calendar_client::CalendarApiError;
use crate::models::event::{EventTime, RemoteEvent};
use crate::service::slot::{BookingPolicy, Slot, SlotError, localize};

pub const BUSINESS_DAY_START_HOUR: u32 = 9;
pub const BUSINESS_DAY_END_HOUR: u32 = 17;

/// Remote event query. Implementations return candidates overlapping the
/// UTC window, recurring instances expanded into single occurrences,
/// ordered by start time.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn events_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<RemoteEvent>, CalendarApiError>;
}

/// The one-method seam the decision gate and the calendar writer depend
/// on. The production detector never returns Err; the error side exists
/// for callers to map unexpected dependency failures.
#[async_trait]
pub trait ConflictSource: Send + Sync {
    async fn has_conflict(
        &self,
        proposed: &Slot,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;
}

pub struct ConflictDetector {
    source: Option<Arc<dyn EventSource>>,
    policy: BookingPolicy,
}

impl ConflictDetector {
    pub fn new(source: Option<Arc<dyn EventSource>>, policy: BookingPolicy) -> Self {
        Self { source, policy }
    }

    /// Fail-safe conflict check: any inability to determine the answer
    /// (no connection, query failure, unreadable candidate) reports a
    /// conflict rather than risking a double booking.
    async fn check(&self, proposed: &Slot) -> bool {
        let Some(source) = &self.source else {
            warn!("Conflict check attempted, but no calendar connection is configured. Assuming conflict.");
            return true;
        };
        let tz = match self.policy.timezone() {
            Ok(tz) => tz,
            Err(err) => {
                error!("Conflict check with a misconfigured timezone: {err}. Assuming conflict.");
                return true;
            }
        };

        let padding = self.policy.query_padding();
        let window_min = (proposed.start - padding).with_timezone(&Utc);
        let window_max = (proposed.end + padding).with_timezone(&Utc);
        debug!(
            "Checking conflicts for slot {} to {} (query window {} to {})",
            proposed.start.to_rfc3339(),
            proposed.end.to_rfc3339(),
            window_min.to_rfc3339(),
            window_max.to_rfc3339(),
        );

        let candidates = match source.events_between(window_min, window_max).await {
            Ok(candidates) => candidates,
            Err(err) => {
                error!("Calendar query failed during conflict check: {err}. Assuming conflict.");
                return true;
            }
        };

        for candidate in &candidates {
            let candidate_slot = match event_slot(candidate, tz) {
                Ok(slot) => slot,
                Err(err) => {
                    warn!(
                        "Could not interpret event {:?}: {err}. Assuming conflict.",
                        candidate.id
                    );
                    return true;
                }
            };
            if candidate_slot.overlaps(proposed) {
                info!(
                    "Conflict detected with event {:?} ({:?}) from {} to {}",
                    candidate.summary,
                    candidate.id,
                    candidate_slot.start.to_rfc3339(),
                    candidate_slot.end.to_rfc3339(),
                );
                return true;
            }
        }

        debug!("No conflicts found after checking {} events in the window.", candidates.len());
        false
    }

    /// List free business-hour start times on a date, using one windowed
    /// fetch for the whole local day.
    pub async fn available_slots(
        &self,
        date: &str,
    ) -> Result<Vec<String>, Box<dyn std::error::Error + Send + Sync>> {
        let Some(source) = &self.source else {
            return Err("Calendar service not available".into());
        };
        let tz = self.policy.timezone()?;
        let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| SlotError::InvalidFormat(date.to_string()))?;
        let next_day = day.succ_opt().ok_or("date out of range")?;

        let day_start = localize(day.and_time(NaiveTime::MIN), tz)?;
        let day_end = localize(next_day.and_time(NaiveTime::MIN), tz)?;
        let events = source
            .events_between(day_start.with_timezone(&Utc), day_end.with_timezone(&Utc))
            .await?;

        let mut free = Vec::new();
        for hour in BUSINESS_DAY_START_HOUR..BUSINESS_DAY_END_HOUR {
            let Some(naive) = day.and_hms_opt(hour, 0, 0) else {
                continue;
            };
            // Wall clocks swallowed by a DST transition are not offered.
            let Ok(start) = localize(naive, tz) else {
                continue;
            };
            let Ok(slot) = Slot::from_start(start, self.policy.duration()) else {
                continue;
            };
            let busy = events.iter().any(|event| match event_slot(event, tz) {
                Ok(candidate) => candidate.overlaps(&slot),
                Err(_) => true,
            });
            if !busy {
                free.push(start.format("%I:%M %p").to_string());
            }
        }
        Ok(free)
    }
}

#[async_trait]
impl ConflictSource for ConflictDetector {
    async fn has_conflict(
        &self,
        proposed: &Slot,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.check(proposed).await)
    }
}

fn bound(time: &EventTime, tz: Tz) -> Result<DateTime<Tz>, SlotError> {
    if let Some(stamp) = &time.date_time {
        let parsed = DateTime::parse_from_rfc3339(stamp)
            .map_err(|_| SlotError::InvalidFormat(stamp.clone()))?;
        return Ok(parsed.with_timezone(&tz));
    }
    if let Some(day) = &time.date {
        let date = NaiveDate::parse_from_str(day, "%Y-%m-%d")
            .map_err(|_| SlotError::InvalidFormat(day.clone()))?;
        // All-day bounds sit at local midnight; the end date is exclusive
        // per the remote format's convention.
        return localize(date.and_time(NaiveTime::MIN), tz);
    }
    Err(SlotError::MissingInput)
}

/// Normalize a candidate event into a zoned interval. Timed events keep
/// their explicit offset; all-day events span midnight to midnight in the
/// detector's timezone. Candidates are compared as-is, so a zero-length
/// event follows the same half-open rule as any other.
fn event_slot(event: &RemoteEvent, tz: Tz) -> Result<Slot, SlotError> {
    Ok(Slot {
        start: bound(&event.start, tz)?,
        end: bound(&event.end, tz)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FakeSource {
        events: Vec<RemoteEvent>,
        fail: bool,
        windows: Mutex<Vec<(DateTime<Utc>, DateTime<Utc>)>>,
    }

    impl FakeSource {
        fn with_events(events: Vec<RemoteEvent>) -> Self {
            Self { events, fail: false, windows: Mutex::new(Vec::new()) }
        }

        fn failing() -> Self {
            Self { events: Vec::new(), fail: true, windows: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl EventSource for FakeSource {
        async fn events_between(
            &self,
            from: DateTime<Utc>,
            to: DateTime<Utc>,
        ) -> Result<Vec<RemoteEvent>, CalendarApiError> {
            self.windows.lock().unwrap().push((from, to));
            if self.fail {
                return Err(CalendarApiError::Api {
                    status: 500,
                    message: "Server Error".to_string(),
                });
            }
            Ok(self.events.clone())
        }
    }

    fn timed(start: &str, end: &str) -> RemoteEvent {
        RemoteEvent {
            id: Some("evt".to_string()),
            summary: Some("Existing".to_string()),
            start: EventTime::timed(start, "America/New_York"),
            end: EventTime::timed(end, "America/New_York"),
        }
    }

    fn all_day(start: &str, end: &str) -> RemoteEvent {
        RemoteEvent {
            id: Some("evt".to_string()),
            summary: Some("Holiday".to_string()),
            start: EventTime::all_day(start),
            end: EventTime::all_day(end),
        }
    }

    fn ny_policy() -> BookingPolicy {
        BookingPolicy::new("America/New_York", 60)
    }

    fn detector(source: FakeSource) -> ConflictDetector {
        ConflictDetector::new(Some(Arc::new(source)), ny_policy())
    }

    fn ny_slot(date: &str, time: &str) -> Slot {
        crate::service::slot::proposed_slot(date, time, &ny_policy()).unwrap()
    }

    async fn check(detector: &ConflictDetector, slot: &Slot) -> bool {
        detector.has_conflict(slot).await.unwrap()
    }

    #[tokio::test]
    async fn empty_window_has_no_conflict() {
        let detector = detector(FakeSource::with_events(vec![]));
        assert!(!check(&detector, &ny_slot("2024-01-01", "10:00 AM")).await);
    }

    #[tokio::test]
    async fn identical_interval_conflicts() {
        let detector = detector(FakeSource::with_events(vec![timed(
            "2024-01-01T10:00:00-05:00",
            "2024-01-01T11:00:00-05:00",
        )]));
        assert!(check(&detector, &ny_slot("2024-01-01", "10:00 AM")).await);
    }

    #[tokio::test]
    async fn event_starting_before_and_ending_inside_conflicts() {
        let detector = detector(FakeSource::with_events(vec![timed(
            "2024-01-01T09:30:00-05:00",
            "2024-01-01T10:30:00-05:00",
        )]));
        assert!(check(&detector, &ny_slot("2024-01-01", "10:00 AM")).await);
    }

    #[tokio::test]
    async fn event_starting_inside_and_ending_after_conflicts() {
        let detector = detector(FakeSource::with_events(vec![timed(
            "2024-01-01T10:30:00-05:00",
            "2024-01-01T11:30:00-05:00",
        )]));
        assert!(check(&detector, &ny_slot("2024-01-01", "10:00 AM")).await);
    }

    #[tokio::test]
    async fn event_containing_the_slot_conflicts() {
        let detector = detector(FakeSource::with_events(vec![timed(
            "2024-01-01T09:00:00-05:00",
            "2024-01-01T12:00:00-05:00",
        )]));
        assert!(check(&detector, &ny_slot("2024-01-01", "10:00 AM")).await);
    }

    #[tokio::test]
    async fn slot_containing_a_shorter_event_conflicts() {
        let two_hour = ConflictDetector::new(
            Some(Arc::new(FakeSource::with_events(vec![timed(
                "2024-01-01T10:30:00-05:00",
                "2024-01-01T11:30:00-05:00",
            )]))),
            BookingPolicy::new("America/New_York", 120),
        );
        let slot = crate::service::slot::proposed_slot(
            "2024-01-01",
            "10:00 AM",
            &BookingPolicy::new("America/New_York", 120),
        )
        .unwrap();
        assert!(check(&two_hour, &slot).await);
    }

    #[tokio::test]
    async fn adjacent_events_do_not_conflict() {
        // Event ends exactly at the slot start, and another starts exactly
        // at the slot end. Half-open semantics: neither is a conflict.
        let detector = detector(FakeSource::with_events(vec![
            timed("2024-01-01T09:00:00-05:00", "2024-01-01T10:00:00-05:00"),
            timed("2024-01-01T11:00:00-05:00", "2024-01-01T12:00:00-05:00"),
        ]));
        assert!(!check(&detector, &ny_slot("2024-01-01", "10:00 AM")).await);
    }

    #[tokio::test]
    async fn all_day_event_conflicts_with_timed_slot_on_its_day() {
        let detector = detector(FakeSource::with_events(vec![all_day(
            "2024-01-01",
            "2024-01-02",
        )]));
        assert!(check(&detector, &ny_slot("2024-01-01", "10:00 AM")).await);
    }

    #[tokio::test]
    async fn all_day_event_ends_exclusively_at_its_end_date() {
        let detector = detector(FakeSource::with_events(vec![all_day(
            "2024-01-01",
            "2024-01-02",
        )]));
        assert!(!check(&detector, &ny_slot("2024-01-02", "10:00 AM")).await);
    }

    #[tokio::test]
    async fn query_failure_is_treated_as_conflict() {
        let detector = detector(FakeSource::failing());
        assert!(check(&detector, &ny_slot("2024-01-01", "10:00 AM")).await);
    }

    #[tokio::test]
    async fn unset_connection_is_treated_as_conflict() {
        let detector = ConflictDetector::new(None, ny_policy());
        assert!(check(&detector, &ny_slot("2024-01-01", "10:00 AM")).await);
    }

    #[tokio::test]
    async fn unreadable_candidate_is_treated_as_conflict() {
        let detector = detector(FakeSource::with_events(vec![RemoteEvent {
            id: Some("bad".to_string()),
            summary: None,
            start: EventTime::timed("not-a-timestamp", "America/New_York"),
            end: EventTime::timed("also-not", "America/New_York"),
        }]));
        assert!(check(&detector, &ny_slot("2024-01-01", "10:00 AM")).await);
    }

    #[tokio::test]
    async fn misconfigured_timezone_is_treated_as_conflict() {
        let detector = ConflictDetector::new(
            Some(Arc::new(FakeSource::with_events(vec![]))),
            BookingPolicy::new("Invalid/Timezone", 60),
        );
        assert!(check(&detector, &ny_slot("2024-01-01", "10:00 AM")).await);
    }

    #[tokio::test]
    async fn query_window_is_padded_and_converted_to_utc() {
        let source = Arc::new(FakeSource::with_events(vec![]));
        let detector = ConflictDetector::new(Some(source.clone()), ny_policy());
        let slot = ny_slot("2024-01-01", "10:00 AM");

        assert!(!detector.has_conflict(&slot).await.unwrap());

        let windows = source.windows.lock().unwrap();
        assert_eq!(windows.len(), 1);
        let (from, to) = windows[0];
        // 10:00 EST minus 8 hours of padding is 02:00 EST = 07:00 UTC.
        assert_eq!(from.to_rfc3339(), "2024-01-01T07:00:00+00:00");
        assert_eq!(to.to_rfc3339(), "2024-01-02T00:00:00+00:00");
    }

    #[tokio::test]
    async fn available_slots_skip_busy_hours() {
        let detector = detector(FakeSource::with_events(vec![timed(
            "2024-01-02T10:00:00-05:00",
            "2024-01-02T11:00:00-05:00",
        )]));
        let free = detector.available_slots("2024-01-02").await.unwrap();
        assert_eq!(free.len(), (BUSINESS_DAY_END_HOUR - BUSINESS_DAY_START_HOUR) as usize - 1);
        assert!(free.contains(&"09:00 AM".to_string()));
        assert!(!free.contains(&"10:00 AM".to_string()));
        assert!(free.contains(&"11:00 AM".to_string()));
    }

    #[tokio::test]
    async fn available_slots_require_a_calendar_connection() {
        let detector = ConflictDetector::new(None, ny_policy());
        assert!(detector.available_slots("2024-01-02").await.is_err());
    }
}
