use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::clients::intent_client::IntentExtractor;
use crate::models::booking::BookingOutcome;
use crate::service::booking_flow::BookingFlow;

/// Conversational entry point shared by the webhook and the CLI prompt
/// mode: raw text goes through intent extraction, the structured request
/// through the booking flow.
pub struct MessageHandler {
    extractor: Arc<dyn IntentExtractor>,
    flow: Arc<BookingFlow>,
}

impl MessageHandler {
    pub fn new(extractor: Arc<dyn IntentExtractor>, flow: Arc<BookingFlow>) -> Self {
        Self { extractor, flow }
    }

    pub async fn handle(&self, raw_text: &str, session_id: Option<&str>) -> BookingOutcome {
        let request_id = Uuid::new_v4();
        info!("[{request_id}] Received message: '{raw_text}'");

        let request = self.extractor.extract(raw_text, session_id).await;
        debug!("[{request_id}] Structured request from intent extraction: {:?}", request);

        let outcome = self.flow.handle(&request).await;
        info!("[{request_id}] Outcome: {:?} - {}", outcome.status, outcome.message);
        outcome
    }
}
