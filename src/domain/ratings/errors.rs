//! Ratings service errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RatingsServiceError {
    #[error("rating {0} is outside 1..=5")]
    InvalidRating(u8),

    #[error("comment text is empty")]
    EmptyComment,

    #[error("comments backend failed: {0}")]
    Backend(String),
}
