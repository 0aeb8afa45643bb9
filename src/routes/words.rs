use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::db::words::CandidateFilter;
use crate::response::{json_error, AppError};
use crate::services::word_dto::DEFAULT_LANG;
use crate::state::AppState;

const DEFAULT_SELECTION_SIZE: usize = 30;

#[derive(Serialize)]
struct WordIdsList {
    ids: Vec<Uuid>,
}

/// GET /api/v1/app/words/q
///
/// Query parameters: `tags` and `levelNames` (comma-separated label ids),
/// `nb` (selection size, default 30). A valid bearer token personalizes
/// the selection; anonymous callers get a uniform sample.
pub async fn list_word_ids(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let user_id = match crate::auth::optional_user_id(&headers, &state.config().jwt_secret) {
        Ok(user_id) => user_id.unwrap_or_default(),
        Err(err) => {
            return json_error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", err.to_string())
                .into_response()
        }
    };

    let tag_ids = match parse_id_list(params.get("tags")) {
        Ok(ids) => ids,
        Err(response) => return response,
    };
    let level_name_ids = match parse_id_list(params.get("levelNames")) {
        Ok(ids) => ids,
        Err(response) => return response,
    };

    let nb = match params.get("nb") {
        None => DEFAULT_SELECTION_SIZE,
        Some(raw) => match raw.parse::<i64>() {
            Ok(value) if value >= 0 => value as usize,
            _ => {
                return json_error(
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    "nb must be a non-negative integer",
                )
                .into_response()
            }
        },
    };

    let Some(services) = state.services() else {
        return service_unavailable();
    };

    let filter = CandidateFilter {
        tag_ids,
        level_name_ids,
    };

    match services.selection.select_word_ids(&user_id, &filter, nb).await {
        Ok(ids) => Json(WordIdsList { ids }).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

/// GET /api/v1/app/words?ids=…&lang=…
pub async fn list_words(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let ids = match parse_id_list(params.get("ids")) {
        Ok(ids) => ids,
        Err(response) => return response,
    };
    let lang = lang_param(&params);

    if ids.is_empty() {
        return Json(Vec::<serde_json::Value>::new()).into_response();
    }

    let Some(services) = state.services() else {
        return service_unavailable();
    };

    match services.word_dtos.list_words(&ids, lang).await {
        Ok(words) => Json(words).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

/// GET /api/v1/app/words/:id?lang=…
pub async fn read_word(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Ok(id) = raw_id.parse::<Uuid>() else {
        return json_error(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "invalid word id",
        )
        .into_response();
    };
    let lang = lang_param(&params);

    let Some(services) = state.services() else {
        return service_unavailable();
    };

    match services.word_dtos.read_word(id, lang).await {
        Ok(Some(word)) => Json(word).into_response(),
        Ok(None) => AppError::not_found("word not found").into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

fn lang_param(params: &HashMap<String, String>) -> &str {
    params
        .get("lang")
        .map(String::as_str)
        .filter(|lang| !lang.trim().is_empty())
        .unwrap_or(DEFAULT_LANG)
}

/// Parses a comma-separated id list; blank entries are skipped, malformed
/// ids reject the request before any storage access.
fn parse_id_list(raw: Option<&String>) -> Result<Vec<Uuid>, Response> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    let mut ids = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part.parse::<Uuid>() {
            Ok(id) => ids.push(id),
            Err(_) => {
                return Err(json_error(
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    format!("invalid id: {part}"),
                )
                .into_response())
            }
        }
    }
    Ok(ids)
}

fn service_unavailable() -> Response {
    json_error(
        StatusCode::SERVICE_UNAVAILABLE,
        "SERVICE_UNAVAILABLE",
        "database unavailable",
    )
    .into_response()
}
