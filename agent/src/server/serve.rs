//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::errors::AgentError;
use crate::server::auth::require_bearer;
use crate::server::handlers::{
    database_status, deploy_status, health_handler, submit_database_reset, submit_deploy,
};
use crate::server::state::ServerState;

/// Build the application router.
pub fn router(state: Arc<ServerState>) -> Router {
    let protected = Router::new()
        // Deploy
        .route("/deploy", post(submit_deploy))
        .route("/deploy/{job_id}", get(deploy_status))
        // Database reset
        .route("/database", delete(submit_database_reset))
        .route("/database/{job_id}", get(database_status))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_bearer,
        ));

    Router::new()
        .route("/health", get(health_handler))
        .merge(protected)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server
pub async fn serve(
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), AgentError>>, AgentError> {
    let addr = format!(
        "{}:{}",
        state.settings.bind_host, state.settings.bind_port
    );
    let app = router(state);

    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AgentError::ServerError(e.to_string()))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| AgentError::ServerError(e.to_string()))
    });

    Ok(handle)
}
