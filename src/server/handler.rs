//! HTTP handlers
//!
//! - `GET /ws`: admits a subscriber and streams snapshots over a WebSocket
//! - `POST /configure`: points the hub at a new source
//! - `GET /status`: hub summary
//!
//! Every response allows any origin. The relay is meant for a trusted LAN.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ws::WebSocketUpgrade, ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use serde::Deserialize;

use crate::registry::{HubError, HubStatus, TelemetryHub};
use crate::session::SessionError;
use crate::subscriber::{SubscriberSink, SubscriberStream};

#[derive(Debug, Deserialize)]
struct ConfigureRequest {
    ps5_ip: String,
}

/// Build the axum router
///
/// Must be served with `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn build_router(hub: Arc<TelemetryHub>) -> Router {
    Router::new()
        .route("/ws", get(handle_ws))
        .route("/configure", post(handle_configure))
        .route("/status", get(handle_status))
        .layer(middleware::from_fn(allow_any_origin))
        .with_state(hub)
}

async fn handle_ws(
    State(hub): State<Arc<TelemetryHub>>,
    ConnectInfo(peer_addr): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> Response {
    if !hub.is_configured().await {
        tracing::warn!(peer = %peer_addr, "Subscriber rejected: source not configured");
        return (StatusCode::SERVICE_UNAVAILABLE, "PS5 IP is not configured yet").into_response();
    }

    ws.on_failed_upgrade(move |e| {
        tracing::warn!(peer = %peer_addr, error = %e, "WebSocket upgrade failed");
    })
    .on_upgrade(move |socket| async move {
        // The source may have been cleared while the upgrade was in flight
        let subscription = match hub.admit(Some(peer_addr)).await {
            Ok(subscription) => subscription,
            Err(e) => {
                tracing::warn!(peer = %peer_addr, error = %e, "Subscriber rejected after upgrade");
                SubscriberSink::close(socket).await;
                return;
            }
        };

        let id = subscription.id;
        let reason = SubscriberStream::new(hub, socket, subscription).run().await;
        tracing::info!(
            subscriber = %id,
            peer = %peer_addr,
            reason = %reason,
            "Subscriber disconnected"
        );
    })
}

async fn handle_configure(
    State(hub): State<Arc<TelemetryHub>>,
    body: Bytes,
) -> (StatusCode, Json<serde_json::Value>) {
    let request: ConfigureRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected configure request");
            return error_response(StatusCode::BAD_REQUEST, format!("Invalid JSON: {}", e));
        }
    };

    tracing::info!(ps5_ip = %request.ps5_ip, "Configure request");

    match hub.configure(request.ps5_ip).await {
        Ok(outcome) => {
            tracing::debug!(outcome = ?outcome, "Configure applied");
            (
                StatusCode::OK,
                Json(serde_json::json!({ "status": "success" })),
            )
        }
        Err(e @ HubError::SessionStart(SessionError::InvalidAddress(_))) => {
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn handle_status(State(hub): State<Arc<TelemetryHub>>) -> Json<HubStatus> {
    Json(hub.status().await)
}

fn error_response(status: StatusCode, error: String) -> (StatusCode, Json<serde_json::Value>) {
    (
        status,
        Json(serde_json::json!({ "status": "error", "error": error })),
    )
}

/// Permissive CORS: any origin, simple methods, preflight answered directly
async fn allow_any_origin(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        apply_cors_headers(response.headers_mut());
        return response;
    }

    let mut response = next.run(request).await;
    apply_cors_headers(response.headers_mut());
    response
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, HEAD"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Origin, Accept, Content-Type, X-Requested-With"),
    );
}
