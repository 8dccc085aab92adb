use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::models::booking::{BookingOutcome, BookingRequest};
use crate::service::booking_service::AppointmentWriter;
use crate::service::decision_service::BookingGate;

/// Sequences decision gate then calendar writer, short-circuiting on
/// rejection, and maps everything into one terminal BookingOutcome. Never
/// lets an error escape to its caller.
pub struct BookingFlow {
    gate: Arc<dyn BookingGate>,
    writer: Arc<dyn AppointmentWriter>,
}

impl BookingFlow {
    pub fn new(gate: Arc<dyn BookingGate>, writer: Arc<dyn AppointmentWriter>) -> Self {
        Self { gate, writer }
    }

    pub async fn handle(&self, request: &BookingRequest) -> BookingOutcome {
        debug!("Handling booking request: {:?}", request);

        let verdict = match self.gate.should_book(request).await {
            Ok(verdict) => verdict,
            Err(err) => {
                error!("Unexpected error while consulting the decision gate: {err}");
                return BookingOutcome::error(
                    "An unexpected error occurred while consulting the decision gate.",
                    err.to_string(),
                );
            }
        };
        info!(
            "Decision gate verdict: approved={} reason={:?}",
            verdict.approved, verdict.reason
        );

        if !verdict.approved {
            info!("Booking not approved by the decision gate.");
            return BookingOutcome::rejected(verdict);
        }

        info!("Decision gate approved booking. Proceeding with the calendar writer.");
        let report = match self.writer.book_appointment(request).await {
            Ok(report) => report,
            Err(err) => {
                error!("Unexpected error while booking with the calendar writer: {err}");
                return BookingOutcome::error(
                    "An unexpected error occurred while booking with the calendar writer.",
                    err.to_string(),
                );
            }
        };

        if report.success {
            info!("Booking successful with the calendar writer.");
            BookingOutcome::booked(report)
        } else {
            warn!("Booking failed with the calendar writer: {}", report.message);
            BookingOutcome::booking_failed(report)
        }
    }
}
