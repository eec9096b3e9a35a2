//! HTTP surface for the relay

use super::{Envelope, SyncEndpoint, SyncRequest};
use crate::config::RelayConfig;
use crate::store::MessageStore;
use crate::{Error, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Build the relay's routes: `POST /sync` and `GET /health`
pub fn router(endpoint: Arc<SyncEndpoint>) -> Router {
    Router::new()
        .route("/sync", post(handle_sync))
        .route("/health", get(handle_health))
        .with_state(endpoint)
}

/// Open the configured store and serve until the process is stopped
pub async fn serve(config: &RelayConfig) -> Result<()> {
    let store = Arc::new(MessageStore::open(&config.database)?);
    let endpoint = Arc::new(SyncEndpoint::new(store));
    let listener = TcpListener::bind(config.bind).await?;
    info!(
        addr = %config.bind,
        database = %config.database.display(),
        "Relay listening"
    );
    serve_on(listener, endpoint).await
}

/// Serve on an already bound listener
pub async fn serve_on(listener: TcpListener, endpoint: Arc<SyncEndpoint>) -> Result<()> {
    axum::serve(listener, router(endpoint)).await?;
    Ok(())
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn handle_sync(
    State(endpoint): State<Arc<SyncEndpoint>>,
    body: std::result::Result<Json<SyncRequest>, JsonRejection>,
) -> (StatusCode, Json<Envelope>) {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!("Rejected sync body: {}", rejection.body_text());
            return error_reply(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    // SQLite calls block; keep them off the async workers.
    let result = tokio::task::spawn_blocking(move || endpoint.handle(&request)).await;

    match result {
        Ok(Ok(data)) => (StatusCode::OK, Json(Envelope::Ok { data })),
        Ok(Err(e)) => {
            let status = status_for(&e);
            warn!(%status, "Sync failed: {}", e);
            error_reply(status, e.to_string())
        }
        Err(e) => {
            warn!("Sync task failed: {}", e);
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

fn status_for(error: &Error) -> StatusCode {
    if error.is_validation() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn error_reply(status: StatusCode, reason: String) -> (StatusCode, Json<Envelope>) {
    (status, Json(Envelope::Error { reason }))
}
