pub mod handlers;
pub mod state;
pub mod types;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    body::Body,
    http::Request,
    middleware::{Next, from_fn},
    response::Response,
    routing::{get, post},
};
use tokio::net::TcpListener;

use state::AppState;

/// Log every request with its outcome.
async fn request_log_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    if response.status().is_server_error() {
        tracing::warn!(%method, %uri, status, elapsed_ms, "Request failed");
    } else {
        tracing::info!(%method, %uri, status, elapsed_ms, "Request handled");
    }
    response
}

/// Build the API router
pub fn router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/accounts", post(handlers::open_account))
        .route("/accounts/{id}", get(handlers::get_account))
        .route(
            "/accounts/{id}/transfers",
            get(handlers::get_account_transfers),
        )
        .route("/transfers", post(handlers::create_transfer));

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(from_fn(request_log_middleware))
        .with_state(state)
}

/// Start HTTP Gateway server. Returns after Ctrl-C.
pub async fn run_server(host: &str, port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);

    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to bind to {}: {} (port {} may already be in use)",
            addr,
            e,
            port
        )
    })?;

    tracing::info!(%addr, "Gateway listening");
    println!("🚀 Gateway listening on http://{}", addr);
    println!("📂 API: /api/v1/accounts, /api/v1/transfers");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
