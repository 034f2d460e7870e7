pub mod error;
pub mod handlers;
pub mod middleware;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

pub use error::ApiError;
pub use handlers::ApiState;

/// Build the full application: `/api` routes, host check and CORS.
pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let protected = Router::new()
        .route("/process/", post(handlers::handle_process))
        .route("/task-status/{task_id}/", get(handlers::handle_task_status))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    let api_routes = Router::new()
        .route("/register/", post(handlers::handle_register))
        .route("/login/", post(handlers::handle_login))
        .route("/health/", get(handlers::handle_health))
        .merge(protected)
        .with_state(state.clone());

    Router::new()
        .nest("/api", api_routes)
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::check_host,
        ))
        .layer(cors)
}

pub async fn serve(state: ApiState, bind_addr: &str, port: u16) -> anyhow::Result<()> {
    let listener = TcpListener::bind((bind_addr, port)).await?;
    tracing::info!(bind_addr, port, "API listening");
    serve_on(listener, state).await
}

/// Serve on an already-bound listener.
pub async fn serve_on(listener: TcpListener, state: ApiState) -> anyhow::Result<()> {
    axum::serve(listener, router(state)).await?;
    Ok(())
}
