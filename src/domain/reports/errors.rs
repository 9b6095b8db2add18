//! Reports service errors.

use thiserror::Error;

use crate::domain::carts::repositories::StoreError;

#[derive(Debug, Error)]
pub enum ReportsServiceError {
    #[error("storage error")]
    Store(#[from] StoreError),
}
