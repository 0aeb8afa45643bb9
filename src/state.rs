use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::db::history::{HistoryStore, PgHistoryStore};
use crate::db::words::{PgWordCatalog, WordCatalog};
use crate::db::Database;
use crate::services::quiz::QuizService;
use crate::services::word_dto::WordDtoService;
use crate::services::word_selection::WordSelectionService;

/// Core services bundled behind one handle. Built over the Postgres
/// stores in production and over in-memory stores in router tests.
pub struct Services {
    pub quiz: QuizService,
    pub selection: WordSelectionService,
    pub word_dtos: WordDtoService,
}

impl Services {
    pub fn new(histories: Arc<dyn HistoryStore>, catalog: Arc<dyn WordCatalog>) -> Self {
        Self {
            quiz: QuizService::new(Arc::clone(&histories)),
            selection: WordSelectionService::new(Arc::clone(&catalog), histories),
            word_dtos: WordDtoService::new(catalog),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    config: Arc<Config>,
    db: Option<Arc<Database>>,
    services: Option<Arc<Services>>,
}

impl AppState {
    /// Wires the services over the database when one is available. Without
    /// a database the router still serves health and error responses.
    pub fn new(config: Config, db: Option<Arc<Database>>) -> Self {
        let services = db.as_ref().map(|db| {
            let histories: Arc<dyn HistoryStore> =
                Arc::new(PgHistoryStore::new(db.pool().clone()));
            let catalog: Arc<dyn WordCatalog> = Arc::new(PgWordCatalog::new(db.pool().clone()));
            Arc::new(Services::new(histories, catalog))
        });

        Self {
            started_at: Instant::now(),
            config: Arc::new(config),
            db,
            services,
        }
    }

    /// Explicit service injection, used by tests to swap in memory stores.
    pub fn with_services(config: Config, services: Arc<Services>) -> Self {
        Self {
            started_at: Instant::now(),
            config: Arc::new(config),
            db: None,
            services: Some(services),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn db(&self) -> Option<Arc<Database>> {
        self.db.clone()
    }

    pub fn services(&self) -> Option<Arc<Services>> {
        self.services.clone()
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
