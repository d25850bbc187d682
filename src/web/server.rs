//! HTTP server for the quiz UI.

use crate::client::ChatModel;
use crate::models::{Config, QuizError, Result};
use crate::pipeline::QuizPipeline;
use crate::session::SessionStore;
use crate::web::routes;
use axum::extract::DefaultBodyLimit;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// How often idle sessions are swept.
const EVICTION_INTERVAL: Duration = Duration::from_secs(60);

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub pipeline: QuizPipeline,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: Config, model: Arc<dyn ChatModel>) -> Self {
        Self {
            pipeline: QuizPipeline::from_config(model, &config),
            sessions: SessionStore::from_config(&config),
            config,
        }
    }
}

/// Build the router with all routes and layers.
pub fn router(state: Arc<AppState>) -> Router {
    let max_body = state.config.server.max_upload_bytes;

    Router::new()
        .merge(routes::page_routes())
        .merge(routes::document_routes())
        .merge(routes::question_routes())
        .merge(routes::session_routes())
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body))
        .layer(TraceLayer::new_for_http())
}

/// Periodically drop idle sessions.
fn spawn_eviction(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(EVICTION_INTERVAL);
        loop {
            ticker.tick().await;
            state.sessions.evict_idle();
        }
    });
}

/// Run the HTTP server
pub async fn run(state: AppState, bind: &str) -> Result<()> {
    let state = Arc::new(state);
    spawn_eviction(state.clone());

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| QuizError::io(format!("binding {bind}"), e))?;
    info!(addr = %bind, "Listening on http://{}", bind);

    axum::serve(listener, app)
        .await
        .map_err(|e| QuizError::io("serving HTTP", e))?;
    Ok(())
}
