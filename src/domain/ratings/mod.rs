//! Ratings

pub mod backend;
pub mod cache;
pub mod errors;

pub use errors::RatingsServiceError;
