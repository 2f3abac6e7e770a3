//! HTTP/SSE transport for the gateway.
//!
//! Paths:
//! - `GET /sse` — establish a streaming session. Gated by the configured
//!   secret; extracts the target database and permission grant from query
//!   parameters. The first stream event names the message endpoint.
//! - `POST /messages` — deliver a JSON-RPC request to an existing session
//!   (gated by session id, not secret). The response is returned in the
//!   body and mirrored onto the session's stream.
//! - `GET /health` — unauthenticated liveness facts.
//!
//! CORS headers are attached to every response path uniformly.

use crate::error::GatewayError;
use crate::protocol::{JsonRpcRequest, RoutingContext, SseEvent};
use crate::server::McpServer;
use crate::session::{Session, SessionRegistry};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::KeepAlive;
use axum::response::{IntoResponse, Response, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use sqlgate_adapter_pg::{PoolRouter, display_target};
use sqlgate_core::config::GatewayConfig;
use sqlgate_core::permissions::Grant;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared transport state.
pub struct TransportState {
    pub config: GatewayConfig,
    pub registry: Arc<SessionRegistry>,
    pub server: McpServer,
    pub router: Arc<PoolRouter>,
}

/// Query parameters for session establishment.
#[derive(Debug, Deserialize)]
pub struct SseQuery {
    secret: Option<String>,
    db: Option<String>,
    permissions: Option<String>,
}

/// Query parameters for message delivery.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// Create the HTTP router for the gateway.
pub fn create_router(state: Arc<TransportState>) -> Router {
    Router::new()
        .route("/sse", get(handle_sse))
        .route("/messages", post(handle_message))
        .route("/health", get(handle_health))
        .fallback(handle_not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn error_response(err: GatewayError) -> Response {
    (err.status(), Json(json!({ "error": err.to_string() }))).into_response()
}

/// Handle GET /sse: authenticate, resolve routing, open a session.
async fn handle_sse(
    State(state): State<Arc<TransportState>>,
    Query(query): Query<SseQuery>,
) -> Response {
    match establish_session(&state, query).await {
        Ok(response) => response,
        Err(err) => error_response(err),
    }
}

async fn establish_session(
    state: &Arc<TransportState>,
    query: SseQuery,
) -> Result<Response, GatewayError> {
    let configured = state
        .config
        .secret
        .as_deref()
        .ok_or(GatewayError::SecretNotConfigured)?;
    match query.secret.as_deref() {
        Some(secret) if secret == configured => {}
        _ => return Err(GatewayError::Unauthorized),
    }

    let database_url = query
        .db
        .or_else(|| state.config.default_database_url.clone())
        .ok_or(GatewayError::NoTarget)?;
    let grant = match &query.permissions {
        Some(raw) => Grant::parse(raw).map_err(GatewayError::InvalidGrant)?,
        None => Grant::default(),
    };

    // Bring the pool up before the session becomes addressable.
    state.router.ensure_target(&database_url).await?;

    let (event_tx, mut event_rx) = mpsc::channel::<SseEvent>(100);
    let session_id = state
        .registry
        .open(database_url.clone(), grant.clone(), event_tx)
        .await;
    tracing::info!(
        session_id = %session_id,
        target_db = %display_target(&database_url),
        grant = %grant,
        "session established"
    );

    let endpoint = format!("/messages?sessionId={session_id}");
    let guard = SessionCloseGuard {
        session_id,
        registry: state.registry.clone(),
    };

    let stream = async_stream::stream! {
        let _guard = guard;
        yield Ok::<_, Infallible>(
            axum::response::sse::Event::default()
                .event("endpoint")
                .data(endpoint),
        );
        while let Some(event) = event_rx.recv().await {
            let data = serde_json::to_string(&event.data).unwrap_or_default();
            yield Ok(axum::response::sse::Event::default()
                .event(event.event)
                .data(data));
        }
    };

    Ok(Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(30))
                .text("ping"),
        )
        .into_response())
}

/// Removes the session exactly once when its stream is dropped.
struct SessionCloseGuard {
    session_id: String,
    registry: Arc<SessionRegistry>,
}

impl Drop for SessionCloseGuard {
    fn drop(&mut self) {
        let registry = self.registry.clone();
        let session_id = std::mem::take(&mut self.session_id);
        tokio::spawn(async move {
            registry.close(&session_id).await;
            tracing::info!(session_id = %session_id, "session closed");
        });
    }
}

/// Handle POST /messages: resolve the session, dispatch under its context.
async fn handle_message(
    State(state): State<Arc<TransportState>>,
    Query(query): Query<MessageQuery>,
    Json(request): Json<JsonRpcRequest>,
) -> Response {
    let session = match resolve_session(&state, query.session_id.as_deref()).await {
        Ok(session) => session,
        Err(err) => return error_response(err),
    };

    let ctx = RoutingContext::new(session.database_url.clone(), session.grant.clone());
    let response = state.server.handle_request(request, &ctx).await;

    // Mirror the response onto the session's stream for SSE-first clients.
    if let Ok(data) = serde_json::to_value(&response) {
        let _ = session
            .events
            .try_send(SseEvent {
                event: "message".to_string(),
                data,
            });
    }

    (StatusCode::OK, Json(response)).into_response()
}

async fn resolve_session(
    state: &Arc<TransportState>,
    session_id: Option<&str>,
) -> Result<Session, GatewayError> {
    match session_id {
        Some(id) => state
            .registry
            .resolve(id)
            .await
            .ok_or_else(|| GatewayError::SessionNotFound(id.to_string())),
        None => {
            let id = state
                .registry
                .first_available()
                .await
                .ok_or(GatewayError::NoSessions)?;
            tracing::warn!(
                session_id = %id,
                "no sessionId supplied; falling back to an arbitrary open session"
            );
            state
                .registry
                .resolve(&id)
                .await
                .ok_or(GatewayError::NoSessions)
        }
    }
}

/// Handle GET /health: process-wide liveness facts, no auth.
async fn handle_health(State(state): State<Arc<TransportState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "hasDatabase": state.router.has_pool().await,
        "activeConnections": state.registry.len().await,
        "secretRequired": state.config.secret_required(),
    }))
}

async fn handle_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "not found" })),
    )
        .into_response()
}

/// HTTP server for the gateway transport.
pub struct HttpServer {
    state: Arc<TransportState>,
}

impl HttpServer {
    pub fn new(state: TransportState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    pub async fn run(self) -> Result<(), GatewayError> {
        let addr = self.state.config.bind_addr();
        let app = create_router(self.state.clone());

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!(%addr, "sqlgate HTTP transport listening");

        axum::serve(listener, app).await?;
        Ok(())
    }
}
