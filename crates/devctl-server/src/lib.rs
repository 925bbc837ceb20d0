pub mod auth;
pub mod error;
pub mod ratelimit;
pub mod routes;
pub mod state;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let protected = Router::new()
        // System
        .route("/api/system", get(routes::system::system_info))
        .route("/api/metrics", get(routes::system::metrics))
        // Containers
        .route("/api/containers", get(routes::containers::list_containers))
        .route("/api/containers/manage", post(routes::containers::manage))
        .route(
            "/api/containers/{name}/logs",
            get(routes::containers::logs),
        )
        .route(
            "/api/containers/{name}/{action}",
            post(routes::containers::manage_by_path),
        )
        // Backups
        .route(
            "/api/backups",
            get(routes::backups::list_backups).post(routes::backups::backup_restore),
        )
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            auth::auth_middleware,
        ));

    Router::new()
        .route("/api/health", get(routes::system::health))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Serve the API until the process is stopped.
pub async fn serve(app_state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve_on(app_state, listener).await
}

/// Serve on a pre-bound listener, so the caller can read the actual port
/// first (useful when binding port 0).
pub async fn serve_on(app_state: AppState, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let app = build_router(app_state);
    tracing::info!("devctl API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
