//! Carts

pub mod data;
pub mod errors;
mod locks;
pub mod records;
pub mod repositories;
pub mod service;
pub mod subscriptions;
pub mod sweeper;

pub use errors::CartsServiceError;
pub use service::*;
