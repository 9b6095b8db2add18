//! Carts service errors.

use thiserror::Error;

use crate::domain::carts::{
    records::{CartStatus, CartUuid},
    repositories::StoreError,
};

#[derive(Debug, Error)]
pub enum CartsServiceError {
    #[error("an active cart already exists for this user and restaurant ({existing})")]
    AlreadyActive { existing: CartUuid },

    #[error("cart not found")]
    NotFound,

    #[error("cart is {status}, only active carts can be changed")]
    InvalidState { status: CartStatus },

    #[error("only administrators may delete carts")]
    Forbidden,

    #[error("cart timestamp out of range")]
    Timestamp(#[source] jiff::Error),

    #[error("storage error")]
    Store(#[from] StoreError),
}
