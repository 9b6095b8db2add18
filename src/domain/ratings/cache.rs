//! Average rating cache.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::Arc,
};

use jiff::Timestamp;
use rustc_hash::FxHashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    clock::Clock,
    domain::{
        ids::MenuItemId,
        ratings::{
            backend::{CommentsBackend, MAX_RATING, MIN_RATING, NewComment},
            errors::RatingsServiceError,
        },
    },
    settings::RatingSettings,
};

#[derive(Debug, Clone, Copy)]
struct CachedRating {
    rating: Option<f32>,
    fetched_at: Timestamp,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: FxHashMap<MenuItemId, CachedRating>,
    // A fetch only stores its result if neither counter moved while it was in
    // flight. `epoch` covers `clear`, `generations` covers single items.
    epoch: u64,
    generations: FxHashMap<MenuItemId, u64>,
}

impl CacheState {
    fn generation(&self, item: MenuItemId) -> (u64, u64) {
        (
            self.epoch,
            self.generations.get(&item).copied().unwrap_or_default(),
        )
    }
}

/// Average rating per menu item, refetched when older than the TTL and
/// dropped whenever a comment for the item is written.
pub struct RatingCache {
    backend: Arc<dyn CommentsBackend>,
    clock: Arc<dyn Clock>,
    settings: RatingSettings,
    state: RwLock<CacheState>,
}

impl RatingCache {
    /// Create an empty cache.
    pub fn new(
        backend: Arc<dyn CommentsBackend>,
        clock: Arc<dyn Clock>,
        settings: RatingSettings,
    ) -> Self {
        Self {
            backend,
            clock,
            settings,
            state: RwLock::new(CacheState::default()),
        }
    }

    /// Average rating for `item`, from cache while fresh.
    ///
    /// # Errors
    ///
    /// Returns [`RatingsServiceError::Backend`] when a refetch fails; nothing is
    /// cached in that case.
    pub async fn rating(&self, item: MenuItemId) -> Result<Option<f32>, RatingsServiceError> {
        let now = self.clock.now();

        let generation = {
            let state = self.state.read().await;

            if let Some(cached) = state.entries.get(&item)
                && now.duration_since(cached.fetched_at) < self.settings.ttl
            {
                return Ok(cached.rating);
            }

            state.generation(item)
        };

        debug!(%item, "rating cache miss");

        let rating = self.backend.average_rating(item).await?;

        let mut state = self.state.write().await;

        if state.generation(item) == generation {
            state.entries.insert(
                item,
                CachedRating {
                    rating,
                    fetched_at: now,
                },
            );
        }

        Ok(rating)
    }

    /// Post a comment and drop the item's cached rating.
    ///
    /// # Errors
    ///
    /// Returns [`RatingsServiceError::InvalidRating`] or
    /// [`RatingsServiceError::EmptyComment`] for bad input, or
    /// [`RatingsServiceError::Backend`] when posting fails.
    pub async fn submit_comment(&self, comment: NewComment) -> Result<(), RatingsServiceError> {
        if !(MIN_RATING..=MAX_RATING).contains(&comment.rating) {
            return Err(RatingsServiceError::InvalidRating(comment.rating));
        }

        if comment.text.trim().is_empty() {
            return Err(RatingsServiceError::EmptyComment);
        }

        let item = comment.item;

        self.backend.add_comment(comment).await?;
        self.invalidate(item).await;

        Ok(())
    }

    /// Drop the cached rating for `item`.
    pub async fn invalidate(&self, item: MenuItemId) {
        let mut state = self.state.write().await;

        state.entries.remove(&item);
        *state.generations.entry(item).or_default() += 1;
    }

    /// Drop every cached rating.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;

        state.entries.clear();
        state.generations.clear();
        state.epoch += 1;
    }
}

impl Debug for RatingCache {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("RatingCache")
            .field("clock", &self.clock)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
