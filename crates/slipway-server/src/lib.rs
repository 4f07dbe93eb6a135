pub mod auth;
pub mod error;
pub mod pipeline;
pub mod processors;
pub mod routes;
pub mod state;
pub mod supervisor;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use state::AppState;
use tower_http::trace::TraceLayer;

/// Build the axum Router with all control-plane routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/services", post(routes::services::create_service))
        .route("/v1/services", get(routes::services::list_services))
        .route("/v1/services/{name}", get(routes::services::get_service))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve the control plane until `shutdown` flips.
pub async fn serve(
    state: AppState,
    port: u16,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "control plane listening");
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        })
        .await?;
    Ok(())
}
