//! HTTP server setup and routing

use crate::error::Result;
use crate::playback::SessionController;
use axum::{
    routing::{delete, get, post},
    Router,
};
use roundtable_common::events::EventBus;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub controller: Arc<SessionController>,
    pub events: EventBus,
}

impl AppContext {
    pub fn new(controller: Arc<SessionController>) -> Self {
        let events = controller.events().clone();
        Self { controller, events }
    }
}

/// Build the router with every control endpoint
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(super::handlers::health))

        // Session lifecycle
        .route("/sessions", get(super::handlers::list_sessions))
        .route("/sessions", post(super::handlers::create_session))
        .route("/sessions/:guild_id", get(super::handlers::get_session))
        .route("/sessions/:guild_id", delete(super::handlers::destroy_session))

        // Submissions and queue control
        .route("/sessions/:guild_id/queue", post(super::handlers::submit))
        .route("/sessions/:guild_id/skip", post(super::handlers::skip))
        .route(
            "/sessions/:guild_id/participants/:participant_id",
            delete(super::handlers::clear_participant),
        )

        // Voice credentials from the gateway bridge
        .route("/sessions/:guild_id/voice", post(super::handlers::update_voice))

        // Audio node lifecycle callbacks
        .route("/backend/events", post(super::handlers::backend_event))

        // SSE event stream
        .route("/events", get(super::sse::event_stream))

        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Run the HTTP server until `shutdown` resolves
pub async fn run(
    addr: SocketAddr,
    ctx: AppContext,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = create_router(ctx);

    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
