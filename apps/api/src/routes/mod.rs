pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::generation::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/resume/enhance", post(handlers::handle_enhance))
        .route(
            "/api/v1/interview/questions",
            post(handlers::handle_interview_questions),
        )
        .with_state(state)
}
