use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::response::{json_error, AppError};
use crate::services::quiz::WordQuizResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResults {
    /// Present in the wire format for compatibility; the authoritative
    /// user id comes from the verified token.
    #[serde(default)]
    pub user_id: Option<String>,
    pub results: Vec<WordQuizResult>,
}

pub async fn process_quiz_results(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<QuizResults>,
) -> Response {
    let user_id = match crate::auth::require_user_id(&headers, &state.config().jwt_secret) {
        Ok(user_id) => user_id,
        Err(err) => {
            return json_error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", err.to_string())
                .into_response()
        }
    };

    let Some(services) = state.services() else {
        return json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            "database unavailable",
        )
        .into_response();
    };

    match services.quiz.process_quiz_results(&user_id, &body.results).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}
