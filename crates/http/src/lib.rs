//! HTTP API server (axum).

mod api_error;
pub mod api_types;
mod extract;
mod handlers;

use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use quill_agent::{AgentRuntime, TemplateProvider};
use quill_auth::AuthService;
use quill_storage::Store;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

pub use api_error::ApiError;
pub use extract::AuthUser;

/// Process-wide dependencies, built once at startup and injected here so
/// tests can assemble the same router around stubs.
pub struct AppState {
    pub store: Store,
    pub auth: AuthService,
    pub runtime: AgentRuntime,
    pub templates: Arc<TemplateProvider>,
}

/// Build the v1 router.
pub fn create_router(state: Arc<AppState>, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/me", get(handlers::auth::me))
        .route(
            "/sessions",
            post(handlers::sessions::create_session).get(handlers::sessions::list_sessions),
        )
        .route("/sessions/:session_id/messages", get(handlers::sessions::list_messages))
        .route("/agent/chat/:session_id", post(handlers::agent::chat))
        .route(
            "/user/preferences",
            get(handlers::users::get_preferences).post(handlers::users::update_preferences),
        )
        .route(
            "/user/template",
            get(handlers::users::get_template).post(handlers::users::update_template),
        )
        .route("/journal-entries", get(handlers::entries::list_entries))
        .route("/journal-entries/:entry_id", get(handlers::entries::get_entry))
        .route("/tasks", get(handlers::tasks::list_tasks).post(handlers::tasks::create_task))
        .route("/tasks/reorder", post(handlers::tasks::reorder_tasks))
        .route(
            "/tasks/:task_id",
            put(handlers::tasks::update_task).delete(handlers::tasks::delete_task),
        )
        .route("/tasks/:task_id/complete", post(handlers::tasks::complete_task))
        .layer(cors)
        .with_state(state)
}

/// CORS layer for the configured origins. An empty list (dev convenience)
/// allows any origin.
#[must_use]
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let parsed: Vec<HeaderValue> =
        origins.iter().filter_map(|o| o.parse::<HeaderValue>().ok()).collect();
    layer.allow_origin(AllowOrigin::list(parsed))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "healthy"}))
}
