use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::models::booking::{BookingRequest, Intent};

/// Intent extraction collaborator. Never fails the pipeline: when the
/// service is unreachable, misconfigured, or returns garbage, the
/// extractor substitutes a neutral UNKNOWN request carrying the raw text.
#[async_trait]
pub trait IntentExtractor: Send + Sync {
    async fn extract(&self, raw_text: &str, session_id: Option<&str>) -> BookingRequest;
}

pub struct HttpIntentExtractor {
    http: Client,
    endpoint: Option<String>,
    token: Option<String>,
}

#[derive(Debug, Serialize)]
struct IntentQuery<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
}

#[derive(Debug, Default, Deserialize)]
struct IntentEntities {
    date: Option<String>,
    time: Option<String>,
    service_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IntentResponse {
    intent: Option<String>,
    #[serde(default)]
    entities: IntentEntities,
}

impl HttpIntentExtractor {
    pub fn new(endpoint: Option<String>, token: Option<String>) -> Self {
        Self { http: Client::new(), endpoint, token }
    }

    async fn call(
        &self,
        endpoint: &str,
        token: &str,
        raw_text: &str,
        session_id: Option<&str>,
    ) -> Result<BookingRequest, Box<dyn std::error::Error + Send + Sync>> {
        let payload = IntentQuery { query: raw_text, session_id };
        debug!("Sending intent query: {:?}", payload);

        let response = self
            .http
            .post(endpoint)
            .bearer_auth(token)
            .json(&payload)
            .timeout(Duration::from_secs(10))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("intent service returned status {status}").into());
        }
        let parsed: IntentResponse = response.json().await?;
        info!("Received intent response: {:?}", parsed);

        let intent = match parsed.intent.as_deref() {
            Some("BOOK_APPOINTMENT") => Intent::BookAppointment,
            _ => Intent::Unknown,
        };
        Ok(BookingRequest {
            intent,
            date: parsed.entities.date,
            time: parsed.entities.time,
            service_label: parsed.entities.service_type,
            raw_text: raw_text.to_string(),
        })
    }
}

#[async_trait]
impl IntentExtractor for HttpIntentExtractor {
    async fn extract(&self, raw_text: &str, session_id: Option<&str>) -> BookingRequest {
        let (Some(endpoint), Some(token)) = (self.endpoint.as_deref(), self.token.as_deref())
        else {
            warn!("Intent extraction endpoint or token not configured. Using fallback extraction.");
            return BookingRequest::unknown(raw_text);
        };

        match self.call(endpoint, token, raw_text, session_id).await {
            Ok(request) => request,
            Err(err) => {
                error!("Intent extraction failed: {err}. Using fallback.");
                BookingRequest::unknown(raw_text)
            }
        }
    }
}
