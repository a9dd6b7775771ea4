//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::errors::DashboardError;
use crate::server::handlers::{
    chat_handler, deploy_handler, deploy_stdin_handler, deploy_stream_handler, health_handler,
    model_delete_handler, model_details_handler, model_lookup_handler, model_start_handler,
    model_stop_handler, models_handler, runtime_health_handler, system_handler, version_handler,
};
use crate::server::state::ServerState;

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), DashboardError>>, DashboardError> {
    let app = Router::new()
        // Service health and version
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        // Deployment pipeline
        .route("/api/deploy", post(deploy_handler))
        .route("/api/deploy/stream", get(deploy_stream_handler))
        .route("/api/deploy/stdin", post(deploy_stdin_handler))
        // Installed models
        .route("/api/models", get(models_handler))
        .route("/api/models/lookup", get(model_lookup_handler))
        .route(
            "/api/models/{name}",
            get(model_details_handler).delete(model_delete_handler),
        )
        .route("/api/models/{name}/start", post(model_start_handler))
        .route("/api/models/{name}/stop", post(model_stop_handler))
        // Chat proxy
        .route("/api/chat", post(chat_handler))
        // Host and runtime status
        .route("/api/system", get(system_handler))
        .route("/api/health", get(runtime_health_handler))
        // State and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| DashboardError::ServerError(e.to_string()))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| DashboardError::ServerError(e.to_string()))
    });

    Ok(handle)
}
