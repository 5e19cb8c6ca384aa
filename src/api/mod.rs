mod error;
pub mod models;
pub mod server;
pub mod services;
pub mod state;
mod validation;

use axum::{
    routing::{delete, get, post},
    Router,
};
use state::AppState;
use tower_http::trace::TraceLayer;

/// Build the HTTP router. Split out of `server::run` so tests can drive
/// it without binding a socket.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(services::health))
        .route("/tasks", post(services::create_task))
        .route("/tasks/{task_id}", get(services::get_task))
        .route("/tasks/{task_id}", delete(services::delete_task))
        .route("/tasks/{task_id}/archive", get(services::get_task_archive))
        .route("/results/{result_id}/file", get(services::get_result_file))
        .route("/events", get(services::events))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
