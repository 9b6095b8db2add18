//! Comments backend contract.

use async_trait::async_trait;
use mockall::automock;

use crate::domain::{
    ids::{MenuItemId, UserEmail},
    ratings::errors::RatingsServiceError,
};

/// Lowest accepted star rating.
pub const MIN_RATING: u8 = 1;

/// Highest accepted star rating.
pub const MAX_RATING: u8 = 5;

/// A comment about to be posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub item: MenuItemId,
    pub author: UserEmail,
    pub text: String,
    pub rating: u8,
    pub featured: bool,
}

/// Remote service that stores comments and computes average ratings.
#[automock]
#[async_trait]
pub trait CommentsBackend: Send + Sync {
    /// Average star rating for an item, `None` when nobody has rated it.
    ///
    /// # Errors
    ///
    /// Returns [`RatingsServiceError::Backend`] when the remote call fails.
    async fn average_rating(&self, item: MenuItemId) -> Result<Option<f32>, RatingsServiceError>;

    /// Post a comment.
    ///
    /// # Errors
    ///
    /// Returns [`RatingsServiceError::Backend`] when the remote call fails.
    async fn add_comment(&self, comment: NewComment) -> Result<(), RatingsServiceError>;
}
