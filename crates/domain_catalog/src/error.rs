//! Catalog domain errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("store failure: {0}")]
    Store(String),
}
