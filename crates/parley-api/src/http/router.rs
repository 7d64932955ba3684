//! Axum router configuration with middleware.
//!
//! All routes live under `/api/`, plus the `/health` liveness probe. Each
//! route is registered with and without its trailing slash.
//! Middleware: CORS, tracing.

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::routing::{MethodRouter, get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::error::AppError;
use crate::http::handlers::{self, ai, auth, message, persona, session};
use crate::state::AppState;

/// Request body ceiling for audio uploads. The transcription client enforces
/// the configured per-file limit itself.
const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Register `method` at `path` both with and without a trailing slash.
fn both(router: Router<AppState>, path: &str, method: MethodRouter<AppState>) -> Router<AppState> {
    let bare = path.trim_end_matches('/');
    router
        .route(bare, method.clone())
        .route(&format!("{bare}/"), method)
}

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let routes: [(&str, MethodRouter<AppState>); 22] = [
        // Accounts
        ("/api/auth/register", post(auth::register)),
        ("/api/auth/login", post(auth::login)),
        ("/api/auth/refresh", post(auth::refresh)),
        ("/api/auth/logout", post(auth::logout)),
        (
            "/api/auth/profile",
            get(auth::profile)
                .put(auth::replace_profile)
                .patch(auth::patch_profile),
        ),
        ("/api/auth/change-password", post(auth::change_password)),
        // Personas
        (
            "/api/personas",
            get(persona::list_personas).post(persona::create_persona),
        ),
        ("/api/personas/my_personas", get(persona::my_personas)),
        (
            "/api/personas/{id}",
            get(persona::get_persona)
                .put(persona::replace_persona)
                .patch(persona::patch_persona)
                .delete(persona::delete_persona),
        ),
        ("/api/personas/{id}/stats", get(persona::persona_stats)),
        // Sessions
        (
            "/api/sessions",
            get(session::list_sessions).post(session::create_session),
        ),
        (
            "/api/sessions/{id}",
            get(session::get_session)
                .put(session::update_session)
                .patch(session::update_session)
                .delete(session::delete_session),
        ),
        ("/api/sessions/{id}/end", post(session::end_session)),
        ("/api/sessions/{id}/abandon", post(session::abandon_session)),
        ("/api/sessions/{id}/add_message", post(session::add_message)),
        ("/api/sessions/{id}/messages", get(session::session_messages)),
        ("/api/sessions/{id}/reply", post(session::reply)),
        // Messages
        ("/api/messages", get(message::list_messages)),
        // AI
        ("/api/ai/chat", post(ai::chat)),
        ("/api/ai/chat/stream", post(ai::chat_stream)),
        ("/api/ai/health", get(ai::ai_health)),
        (
            "/api/ai/transcribe",
            post(ai::transcribe).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        ),
    ];

    let router = routes
        .into_iter()
        .fold(Router::new(), |router, (path, method)| both(router, path, method));

    router
        .route("/health", get(handlers::health))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn not_found() -> AppError {
    AppError::Status(StatusCode::NOT_FOUND)
}

async fn method_not_allowed() -> AppError {
    AppError::Status(StatusCode::METHOD_NOT_ALLOWED)
}
