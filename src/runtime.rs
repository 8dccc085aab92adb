use std::sync::Arc;

use tracing::info;

use crate::handlers::message::MessageHandler;
use crate::handlers::webhook;
use crate::service::conflict_service::ConflictDetector;

/// Serve the booking webhook until the process is stopped. Each request
/// is handled end-to-end by one task; there are no background loops.
pub async fn run_api(handler: Arc<MessageHandler>, detector: Arc<ConflictDetector>, port: u16) {
    let routes = webhook::routes(handler, detector);
    info!("Serving booking webhook on port {port}");
    warp::serve(routes).run(([0, 0, 0, 0], port)).await;
}
