pub mod learning_history;
pub mod quiz;
pub mod word_dto;
pub mod word_selection;

use thiserror::Error;

use crate::db::StoreError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}
