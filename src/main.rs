#![allow(non_snake_case)]

use std::env;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use bookingBot::cli;
use bookingBot::clients::calendar_client::GoogleCalendarClient;
use bookingBot::clients::intent_client::HttpIntentExtractor;
use bookingBot::config::{AppConfig, BookingConfig};
use bookingBot::handlers::message::MessageHandler;
use bookingBot::runtime;
use bookingBot::service::booking_flow::BookingFlow;
use bookingBot::service::booking_service::{CalendarWriter, EventSink};
use bookingBot::service::conflict_service::{ConflictDetector, EventSource};
use bookingBot::service::decision_service::DecisionGate;
use bookingBot::service::slot::BookingPolicy;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match env::var("CONFIG_FILE") {
        Ok(path) => AppConfig::from_file(&path).unwrap_or_default(),
        Err(_) => AppConfig::default(),
    };
    let settings = BookingConfig::from_app(&config);

    info!("Environment check:");
    info!(
        "- Google credentials: {}",
        if settings.credentials.is_some() { "Set" } else { "Missing" }
    );
    info!(
        "- Intent extraction endpoint: {}",
        settings.intent_endpoint.as_deref().unwrap_or("Not set")
    );
    info!("- Booking timezone: {}", settings.timezone);

    let calendar = match &settings.credentials {
        Some(credentials) => match GoogleCalendarClient::new(credentials.clone()) {
            Ok(client) => Some(Arc::new(client)),
            Err(err) => {
                error!("Failed to initialize the calendar client: {err}");
                None
            }
        },
        None => {
            warn!("Missing Google API credentials; calendar operations will be unavailable.");
            None
        }
    };
    let source = calendar.clone().map(|client| client as Arc<dyn EventSource>);
    let sink = calendar.map(|client| client as Arc<dyn EventSink>);

    let policy = BookingPolicy::new(settings.timezone.clone(), settings.duration_minutes);
    let detector = Arc::new(ConflictDetector::new(source, policy.clone()));
    let gate = Arc::new(DecisionGate::new(detector.clone(), policy.clone()));
    let writer = Arc::new(CalendarWriter::new(sink, detector.clone(), policy));
    let flow = Arc::new(BookingFlow::new(gate, writer));
    let extractor = Arc::new(HttpIntentExtractor::new(
        settings.intent_endpoint.clone(),
        settings.intent_token.clone(),
    ));
    let handler = Arc::new(MessageHandler::new(extractor, flow.clone()));

    match settings.run_mode.as_str() {
        "api" => runtime::run_api(handler, detector, settings.port).await,
        "cli" => cli::cli(flow, handler, detector).await,
        other => println!("Invalid run mode {other}"),
    }
}
