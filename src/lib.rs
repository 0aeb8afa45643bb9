pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;

use std::sync::Arc;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::state::AppState;

pub async fn create_app() -> axum::Router {
    let config = Config::from_env();

    let db = match db::Database::from_env().await {
        Ok(db) => Some(Arc::new(db)),
        Err(_) => None,
    };

    let state = AppState::new(config, db);

    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
