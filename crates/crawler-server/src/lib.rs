pub mod auth;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::AdminAuth;
use crate::state::AppState;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(app_state: AppState) -> Router {
    let auth = Arc::new(AdminAuth {
        token: app_state.config.server.admin_token.clone(),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let guarded = Router::new()
        // Pipeline control
        .route(
            "/api/admin/pipeline",
            get(routes::pipeline::get_pipeline).post(routes::pipeline::post_pipeline),
        )
        // Crawl queue
        .route("/api/crawl/queue", get(routes::crawl::get_queue))
        .route("/api/crawl/retry-failed", post(routes::crawl::retry_failed))
        .route("/api/crawl/seed", post(routes::crawl::seed))
        .route("/api/crawl/process", post(routes::crawl::process))
        .route_layer(middleware::from_fn_with_state(
            auth,
            auth::admin_auth_middleware,
        ));

    Router::new()
        .route("/api/health", get(routes::health::health))
        .merge(guarded)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Start the control server on `port`.
pub async fn serve(app_state: AppState, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(app_state, listener).await
}

/// Start the control server on a pre-bound listener.
///
/// Unlike `serve`, this accepts a `TcpListener` that was already bound so the
/// caller can read the actual port before starting (useful when `port = 0` and
/// the OS picks a free port). On Ctrl-C the server stops accepting requests
/// and the pipeline loop is drained before returning.
pub async fn serve_on(
    app_state: AppState,
    listener: tokio::net::TcpListener,
) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let orchestrator = app_state.orchestrator.clone();
    let app = build_router(app_state);

    tracing::info!("crawler control server listening on http://localhost:{actual_port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await?;

    let state = orchestrator.stop_and_wait().await?;
    tracing::info!(cycles = state.cycles, "pipeline drained");
    Ok(())
}
