//! Update intake: webhook router and long-polling loop.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{debug, info, warn};

use crate::dispatcher::Dispatcher;
use crate::telegram::{TelegramClient, Update};

const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";
/// Pause after a failed `getUpdates` before trying again.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(3);

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    /// When set, webhook calls must carry it in the secret-token header.
    pub webhook_secret: Option<String>,
}

pub fn router(state: AppState, request_timeout: Duration) -> Router {
    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .into_inner();

    Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
        .route("/webhook", post(webhook))
        .layer(axum::middleware::from_fn(add_request_id))
        .layer(middleware_stack)
        .with_state(state)
}

pub async fn health_check() -> &'static str {
    "ok"
}

/// Accepts a Telegram update and queues it; handling continues after the
/// response so slow syntheses never hold the connection open.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(update): Json<Update>,
) -> StatusCode {
    if let Some(secret) = &state.webhook_secret {
        let presented = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
        if presented != Some(secret.as_str()) {
            warn!(update_id = update.update_id, "webhook call with bad secret token");
            return StatusCode::UNAUTHORIZED;
        }
    }

    match update.into_event() {
        Some(event) => state.dispatcher.dispatch(event),
        None => debug!("ignoring update without a supported event"),
    }
    StatusCode::OK
}

async fn add_request_id(mut request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    // A v4 uuid is always a valid header value.
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        request.headers_mut().insert("x-request-id", value.clone());
        let mut response = next.run(request).await;
        response.headers_mut().insert("x-request-id", value);
        return response;
    }
    next.run(request).await
}

/// Long-poll Telegram forever, handing every update to the dispatcher.
pub async fn run_polling(
    telegram: Arc<TelegramClient>,
    dispatcher: Arc<Dispatcher>,
    poll_timeout: Duration,
) -> anyhow::Result<()> {
    telegram.delete_webhook().await?;
    info!("Polling for updates (timeout {}s)", poll_timeout.as_secs());

    let mut offset = 0;
    loop {
        match telegram.get_updates(offset, poll_timeout).await {
            Ok(updates) => {
                for update in updates {
                    offset = offset.max(update.update_id + 1);
                    if let Some(event) = update.into_event() {
                        dispatcher.dispatch(event);
                    }
                }
            }
            Err(e) => {
                warn!("getUpdates failed: {e}");
                tokio::time::sleep(POLL_RETRY_DELAY).await;
            }
        }
    }
}
