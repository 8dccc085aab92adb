use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use crate::models::event::{EventListing, EventPayload, InsertedEvent, RemoteEvent};
use crate::service::booking_service::EventSink;
use crate::service::conflict_service::EventSource;

pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_CALENDAR_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

#[derive(Debug, Error)]
pub enum CalendarApiError {
    #[error("calendar API request failed with status {status}")]
    Api { status: u16, message: String },
    #[error("calendar API transport error: {0}")]
    Transport(String),
    #[error("Missing critical calendar API credentials (client id, client secret, refresh token).")]
    MissingCredentials,
}

impl From<reqwest::Error> for CalendarApiError {
    fn from(err: reqwest::Error) -> Self {
        // The reqwest error is stringified here so no transport internals
        // leak past this boundary.
        CalendarApiError::Transport(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct GoogleCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub calendar_id: String,
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    refresh_token: &'a str,
    grant_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Google Calendar v3 client over the OAuth refresh-token flow. The token
/// is refreshed per call; this layer performs no retries (a failure is
/// surfaced to the fail-safe logic above it).
pub struct GoogleCalendarClient {
    http: Client,
    credentials: GoogleCredentials,
    token_url: String,
    base_url: String,
}

impl GoogleCalendarClient {
    pub fn new(credentials: GoogleCredentials) -> Result<Self, CalendarApiError> {
        if credentials.client_id.is_empty()
            || credentials.client_secret.is_empty()
            || credentials.refresh_token.is_empty()
        {
            return Err(CalendarApiError::MissingCredentials);
        }
        Ok(Self {
            http: Client::new(),
            credentials,
            token_url: GOOGLE_TOKEN_URL.to_string(),
            base_url: GOOGLE_CALENDAR_BASE_URL.to_string(),
        })
    }

    /// Point the client at alternative endpoints (tests).
    pub fn with_endpoints(mut self, token_url: impl Into<String>, base_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self.base_url = base_url.into();
        self
    }

    async fn access_token(&self) -> Result<String, CalendarApiError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&TokenRequest {
                client_id: &self.credentials.client_id,
                client_secret: &self.credentials.client_secret,
                refresh_token: &self.credentials.refresh_token,
                grant_type: "refresh_token",
            })
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            error!("Token refresh failed with status {status}");
            return Err(CalendarApiError::Api { status: status.as_u16(), message: text });
        }
        let token: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| CalendarApiError::Transport(format!("failed to parse token response: {e}")))?;
        Ok(token.access_token)
    }

    fn events_url(&self) -> String {
        format!("{}/calendars/{}/events", self.base_url, self.credentials.calendar_id)
    }
}

#[async_trait]
impl EventSource for GoogleCalendarClient {
    async fn events_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<RemoteEvent>, CalendarApiError> {
        let token = self.access_token().await?;
        debug!(
            "Listing events on calendar '{}' between {} and {}",
            self.credentials.calendar_id,
            from.to_rfc3339(),
            to.to_rfc3339()
        );
        let response = self
            .http
            .get(self.events_url())
            .bearer_auth(&token)
            .query(&[
                ("timeMin", from.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ("timeMax", to.to_rfc3339_opts(SecondsFormat::Secs, true)),
                // Recurring events are expanded into single instances and
                // ordered; the conflict logic itself is order-independent.
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(CalendarApiError::Api { status: status.as_u16(), message: text });
        }
        let listing: EventListing = serde_json::from_str(&text)
            .map_err(|e| CalendarApiError::Transport(format!("failed to parse event listing: {e}")))?;
        Ok(listing.items)
    }
}

#[async_trait]
impl EventSink for GoogleCalendarClient {
    async fn insert_event(&self, payload: &EventPayload) -> Result<InsertedEvent, CalendarApiError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .post(self.events_url())
            .bearer_auth(&token)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(CalendarApiError::Api { status: status.as_u16(), message: text });
        }
        let created: InsertedEvent = serde_json::from_str(&text)
            .map_err(|e| CalendarApiError::Transport(format!("failed to parse created event: {e}")))?;
        Ok(created)
    }
}
