pub mod ai_chat;
pub mod auth;
pub mod dashboard;
pub mod health;
pub mod insights;
pub mod projects;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full API router.
///
/// Every route except `/health` and the two `/auth` routes verifies the
/// caller through the `Session` extractor, so there is no separate auth
/// middleware layer.
pub fn router() -> Router<AppState> {
    let public = Router::new()
        .route("/health", get(health::health))
        .route("/auth/sign-in", post(auth::sign_in))
        .route("/auth/signout", post(auth::sign_out));

    let protected = Router::new()
        // AI record pipeline
        .route("/ai/chat", post(ai_chat::chat))
        .route("/ai/chat/summary", post(ai_chat::summary))
        .route(
            "/ai/insights",
            get(insights::list).post(insights::generate),
        )
        // Dashboard
        .route("/dashboard", get(dashboard::dashboard))
        // Projects
        .route(
            "/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route("/projects/:id", get(projects::get_project))
        .route(
            "/projects/:id/tasks",
            get(projects::list_tasks).post(projects::create_task),
        )
        .route(
            "/projects/:id/documents",
            get(projects::list_documents).post(projects::create_document),
        )
        .route("/projects/:id/photos", post(projects::queue_photo));

    public.merge(protected)
}

/// The router bound to its state with request tracing. Transport layers
/// (CORS, concurrency, rate limiting) are added by the binary.
pub fn app(state: AppState) -> Router {
    router().layer(TraceLayer::new_for_http()).with_state(state)
}
