use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_DURATION_MINUTES: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    #[error("Date or time not provided.")]
    MissingInput,
    #[error("Could not parse '{0}'. Use YYYY-MM-DD HH:MM or YYYY-MM-DD hh:mm AM/PM.")]
    InvalidFormat(String),
    #[error("'{0}' is not a known timezone.")]
    UnknownTimezone(String),
    #[error("{0} does not exist in {1} (skipped by a daylight saving transition).")]
    NonexistentLocalTime(NaiveDateTime, Tz),
    #[error("Slot must end after it starts.")]
    EmptySlot,
}

/// Scheduling settings handed to every component that derives slots.
/// The timezone is kept as a name and resolved where used so that a
/// misconfigured value surfaces as a reported error instead of a panic
/// at startup.
#[derive(Debug, Clone)]
pub struct BookingPolicy {
    timezone: String,
    duration_minutes: i64,
}

impl BookingPolicy {
    pub fn new(timezone: impl Into<String>, duration_minutes: i64) -> Self {
        let duration_minutes = if duration_minutes <= 0 {
            warn!(
                "Invalid default event duration '{duration_minutes}'. Must be a positive number. \
                 Defaulting to {DEFAULT_DURATION_MINUTES} minutes."
            );
            DEFAULT_DURATION_MINUTES
        } else {
            duration_minutes
        };
        Self {
            timezone: timezone.into(),
            duration_minutes,
        }
    }

    pub fn timezone(&self) -> Result<Tz, SlotError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| SlotError::UnknownTimezone(self.timezone.clone()))
    }

    pub fn duration(&self) -> Duration {
        Duration::minutes(self.duration_minutes)
    }

    /// Padding applied on both sides of the remote query window so that
    /// long events starting before or ending after the proposed slot are
    /// not missed by strict server-side start-time filtering.
    pub fn query_padding(&self) -> Duration {
        std::cmp::max(Duration::hours(8), self.duration() * 2)
    }
}

/// Half-open interval `[start, end)` of zoned instants. Touching
/// boundaries do not overlap, so back-to-back bookings are permitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl Slot {
    pub fn new(start: DateTime<Tz>, end: DateTime<Tz>) -> Result<Self, SlotError> {
        if end <= start {
            return Err(SlotError::EmptySlot);
        }
        Ok(Self { start, end })
    }

    pub fn from_start(start: DateTime<Tz>, duration: Duration) -> Result<Self, SlotError> {
        Slot::new(start, start + duration)
    }

    pub fn overlaps(&self, other: &Slot) -> bool {
        other.start < self.end && other.end > self.start
    }
}

/// Parse a date and a clock time into a naive local instant. The 12-hour
/// form with meridiem is tried first, then the 24-hour form.
pub fn parse_naive(date: &str, time: &str) -> Result<NaiveDateTime, SlotError> {
    if date.trim().is_empty() || time.trim().is_empty() {
        return Err(SlotError::MissingInput);
    }
    let joined = format!("{} {}", date.trim(), time.trim());
    NaiveDateTime::parse_from_str(&joined, "%Y-%m-%d %I:%M %p")
        .or_else(|_| NaiveDateTime::parse_from_str(&joined, "%Y-%m-%d %H:%M"))
        .map_err(|_| SlotError::InvalidFormat(joined))
}

/// Attach a timezone to a naive instant. A wall clock skipped by a
/// spring-forward transition is an error; a wall clock that occurs twice
/// during a fall-back transition resolves to the earlier occurrence.
pub fn localize(naive: NaiveDateTime, tz: Tz) -> Result<DateTime<Tz>, SlotError> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(instant) => Ok(instant),
        LocalResult::Ambiguous(earlier, _later) => Ok(earlier),
        LocalResult::None => Err(SlotError::NonexistentLocalTime(naive, tz)),
    }
}

/// Derive the proposed appointment slot `[start, start + duration)` from
/// the raw request strings.
pub fn proposed_slot(date: &str, time: &str, policy: &BookingPolicy) -> Result<Slot, SlotError> {
    let naive = parse_naive(date, time)?;
    let tz = policy.timezone()?;
    let start = localize(naive, tz)?;
    Slot::from_start(start, policy.duration())
}
