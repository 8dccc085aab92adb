use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::models::booking::{BookingRequest, ReasonCode, Verdict};
use crate::service::conflict_service::ConflictSource;
use crate::service::slot::{BookingPolicy, SlotError, proposed_slot};

/// Pre-approval seam consulted by the orchestrator before any write.
#[async_trait]
pub trait BookingGate: Send + Sync {
    async fn should_book(
        &self,
        request: &BookingRequest,
    ) -> Result<Verdict, Box<dyn std::error::Error + Send + Sync>>;
}

/// Thin policy boundary over the conflict detector: normalize, localize,
/// check, and map every failure to a reason code. Nothing escapes as a
/// raw error.
pub struct DecisionGate {
    conflicts: Arc<dyn ConflictSource>,
    policy: BookingPolicy,
}

impl DecisionGate {
    pub fn new(conflicts: Arc<dyn ConflictSource>, policy: BookingPolicy) -> Self {
        Self { conflicts, policy }
    }
}

fn reason_for(err: &SlotError) -> ReasonCode {
    match err {
        SlotError::MissingInput => ReasonCode::MissingInput,
        SlotError::InvalidFormat(_) => ReasonCode::InvalidDatetimeFormat,
        SlotError::UnknownTimezone(_) => ReasonCode::ConfigurationError,
        SlotError::NonexistentLocalTime(..) => ReasonCode::DatetimeLocalizationError,
        // A degenerate slot can only come from broken duration settings.
        SlotError::EmptySlot => ReasonCode::ConfigurationError,
    }
}

#[async_trait]
impl BookingGate for DecisionGate {
    async fn should_book(
        &self,
        request: &BookingRequest,
    ) -> Result<Verdict, Box<dyn std::error::Error + Send + Sync>> {
        let (Some(date), Some(time)) = (request.date.as_deref(), request.time.as_deref()) else {
            warn!(
                "Decision: not approved. Missing date or time in request: date={:?}, time={:?}",
                request.date, request.time
            );
            return Ok(Verdict::rejected(
                ReasonCode::MissingInput,
                Some("Date or time not provided.".to_string()),
            ));
        };

        let slot = match proposed_slot(date, time, &self.policy) {
            Ok(slot) => slot,
            Err(err) => {
                let reason = reason_for(&err);
                warn!("Decision: not approved. {err} (reason {reason:?})");
                return Ok(Verdict::rejected(reason, Some(err.to_string())));
            }
        };
        debug!(
            "Localized proposed slot {} to {}",
            slot.start.to_rfc3339(),
            slot.end.to_rfc3339()
        );

        match self.conflicts.has_conflict(&slot).await {
            Ok(true) => {
                info!("Decision: not approved. Conflict detected for {}.", slot.start.to_rfc3339());
                Ok(Verdict::rejected(ReasonCode::ConflictDetected, None))
            }
            Ok(false) => {
                info!("Decision: approved. No conflict found for {}.", slot.start.to_rfc3339());
                Ok(Verdict::approved())
            }
            Err(err) => {
                warn!("Decision: not approved. Error during conflict check: {err}");
                Ok(Verdict::rejected(
                    ReasonCode::CalendarAgentError,
                    Some(format!("Error during conflict check: {err}")),
                ))
            }
        }
    }
}
