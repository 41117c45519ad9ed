pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::recommend::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Recommendation API
        .route(
            "/api/v1/recommendations",
            post(handlers::handle_recommend),
        )
        // Similarity index management
        .route("/api/v1/index", get(handlers::handle_index_info))
        .route("/api/v1/index/rebuild", post(handlers::handle_rebuild_index))
        .route(
            "/api/v1/skills/:skill_id/similar",
            get(handlers::handle_similar_skills),
        )
        // Async job hand-off (development-plan creation)
        .route(
            "/api/v1/jobs/recommendations",
            post(handlers::handle_enqueue_job),
        )
        .route(
            "/api/v1/jobs/recommendations/:job_id",
            get(handlers::handle_job_status),
        )
        .with_state(state)
}
