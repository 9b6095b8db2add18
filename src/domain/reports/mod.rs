//! Reports

pub mod errors;
pub mod service;

pub use errors::ReportsServiceError;
pub use service::*;
