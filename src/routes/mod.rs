mod health;
mod quiz;
mod words;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;

use crate::response::json_error;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/v1/app/words/q", get(words::list_word_ids))
        .route("/api/v1/app/words", get(words::list_words))
        .route("/api/v1/app/words/:id", get(words::read_word))
        .route("/api/v1/app/quiz/results", post(quiz::process_quiz_results))
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "route not found").into_response()
}
