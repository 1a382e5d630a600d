//! HTTP route table

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;
use super::{files, health, session, upload};

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::handle_health))
        .route(
            "/api/auth/session",
            post(session::create_session).delete(session::delete_session),
        )
        .route("/api/upload", post(upload::upload_file))
        .route("/api/files", get(files::list_files))
}
