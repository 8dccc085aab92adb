use std::convert::Infallible;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::error;
use warp::Filter;

use crate::handlers::message::MessageHandler;
use crate::service::conflict_service::ConflictDetector;

#[derive(Debug, Default, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(default)]
    pub message: MessageBody,
    #[serde(default)]
    pub call: CallInfo,
}

#[derive(Debug, Default, Deserialize)]
pub struct MessageBody {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CallInfo {
    pub id: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct HealthReply {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct SlotsReply {
    date: String,
    available_slots: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ErrorReply {
    error: String,
}

pub fn routes(
    handler: Arc<MessageHandler>,
    detector: Arc<ConflictDetector>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let webhook = warp::path("webhook")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .and(with(handler))
        .and_then(handle_webhook);

    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| warp::reply::json(&HealthReply { status: "healthy" }));

    let slots = warp::path!("available-slots" / String)
        .and(warp::get())
        .and(with(detector))
        .and_then(handle_slots);

    webhook.or(health).or(slots)
}

fn with<T: Clone + Send>(value: T) -> impl Filter<Extract = (T,), Error = Infallible> + Clone {
    warp::any().map(move || value.clone())
}

async fn handle_webhook(
    envelope: WebhookEnvelope,
    handler: Arc<MessageHandler>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let session_id = envelope
        .call
        .session_id
        .as_deref()
        .or(envelope.call.id.as_deref());
    let outcome = handler.handle(&envelope.message.content, session_id).await;
    Ok(warp::reply::json(&outcome))
}

async fn handle_slots(
    date: String,
    detector: Arc<ConflictDetector>,
) -> Result<impl warp::Reply, warp::Rejection> {
    match detector.available_slots(&date).await {
        Ok(slots) => Ok(warp::reply::with_status(
            warp::reply::json(&SlotsReply { date, available_slots: slots }),
            warp::http::StatusCode::OK,
        )),
        Err(err) => {
            error!("Error getting available slots: {err}");
            Ok(warp::reply::with_status(
                warp::reply::json(&ErrorReply { error: err.to_string() }),
                warp::http::StatusCode::INTERNAL_SERVER_ERROR,
            ))
        }
    }
}
