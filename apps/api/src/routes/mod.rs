pub mod auth;
pub mod generate;
pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// Router body cap for multipart uploads. Deliberately above the 5 MiB
/// business rule so oversized files reach validation and get the uniform
/// envelope instead of a bare transport rejection.
const BODY_LIMIT_BYTES: usize = 16 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/ai/generate-article", post(generate::generate_article))
        .route(
            "/api/ai/generate-blog-title",
            post(generate::generate_blog_title),
        )
        .route("/api/ai/generate-image", post(generate::generate_image))
        .route("/api/ai/remove-background", post(generate::remove_background))
        .route("/api/ai/remove-object", post(generate::remove_object))
        .route("/api/ai/review-resume", post(generate::review_resume))
        .route("/api/ai/creations", get(generate::list_creations))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .with_state(state)
}
