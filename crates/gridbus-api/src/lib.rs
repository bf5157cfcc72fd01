pub mod handlers;

use std::future::Future;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

pub use handlers::ApiState;

/// Routes under `/api`, with CORS and the configured body limit.
pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = state.max_body_bytes;
    let api_routes = Router::new()
        .route("/status", get(handlers::handle_status))
        .route(
            "/bus/{*address}",
            post(handlers::handle_bus_send).layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state);

    Router::new().nest("/api", api_routes).layer(cors)
}

/// Bind 127.0.0.1:`port` and serve until `shutdown` resolves.
pub async fn serve<F>(state: ApiState, port: u16, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    serve_on(listener, state, shutdown).await
}

/// Serve on an already-bound listener.
pub async fn serve_on<F>(listener: TcpListener, state: ApiState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!(port = addr.port(), "API listening on 127.0.0.1");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
