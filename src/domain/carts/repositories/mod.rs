//! Cart Repositories
//!
//! The store contract the lifecycle manager, sweeper and reports read and
//! write through. Every committed write is announced as a [`StoreEvent`] so
//! that watchers can refresh their snapshots.

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::domain::{
    carts::records::{CartRecord, CartStatus, CartUuid},
    ids::{RestaurantId, UserEmail},
};

mod memory;

pub use memory::InMemoryCartsRepository;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cart store unavailable: {0}")]
    Unavailable(String),
}

/// The cart a write touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartRef {
    pub uuid: CartUuid,
    pub user_email: UserEmail,
    pub restaurant: Option<RestaurantId>,
}

impl From<&CartRecord> for CartRef {
    fn from(record: &CartRecord) -> Self {
        Self {
            uuid: record.uuid,
            user_email: record.user_email.clone(),
            restaurant: record.restaurant.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEventKind {
    Upserted,
    StatusChanged(CartStatus),
    Deleted,
}

/// A committed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEvent {
    pub kind: StoreEventKind,
    pub carts: Vec<CartRef>,
}

#[automock]
#[async_trait]
pub trait CartsRepository: Send + Sync {
    /// Point lookup.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    async fn get_cart(&self, cart: CartUuid) -> Result<Option<CartRecord>, StoreError>;

    /// The active cart for the exact (user, restaurant) scope.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    async fn find_active(
        &self,
        user: &UserEmail,
        restaurant: Option<RestaurantId>,
    ) -> Result<Option<CartRecord>, StoreError>;

    /// All of a user's carts in any of `statuses`, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    async fn find_by_user_and_statuses(
        &self,
        user: &UserEmail,
        statuses: &[CartStatus],
    ) -> Result<Vec<CartRecord>, StoreError>;

    /// Carts in any of `statuses`, newest first. `None` matches every restaurant.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    async fn find_by_statuses_and_restaurant(
        &self,
        statuses: &[CartStatus],
        restaurant: Option<RestaurantId>,
    ) -> Result<Vec<CartRecord>, StoreError>;

    /// Active carts whose expiration date is before `now`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    async fn list_expired_active(&self, now: Timestamp) -> Result<Vec<CartRecord>, StoreError>;

    /// A user's most recent closed carts, newest first, at most `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    async fn last_closed_for_user(
        &self,
        user: &UserEmail,
        limit: usize,
    ) -> Result<Vec<CartRecord>, StoreError>;

    /// Distinct restaurants in which the user has an active cart.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    async fn active_restaurants_for_user(
        &self,
        user: &UserEmail,
    ) -> Result<Vec<RestaurantId>, StoreError>;

    /// Insert a record or replace the one with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    async fn insert_or_replace(&self, record: CartRecord) -> Result<(), StoreError>;

    /// Replace a record only while the stored copy is still active. Returns
    /// `false`, writing nothing, when the cart is missing or no longer active.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    async fn replace_active(&self, record: CartRecord) -> Result<bool, StoreError>;

    /// Move one cart to `status`. Illegal transitions are refused and reported
    /// as `false`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    async fn update_status(&self, cart: CartUuid, status: CartStatus) -> Result<bool, StoreError>;

    /// Move every listed cart to `status` in one batch, skipping illegal
    /// transitions. Returns how many carts changed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    async fn update_statuses(
        &self,
        carts: &[CartUuid],
        status: CartStatus,
    ) -> Result<u64, StoreError>;

    /// Hard delete. Returns `false` when there was nothing to delete.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    async fn delete_cart(&self, cart: CartUuid) -> Result<bool, StoreError>;

    /// Delete carts in any of `statuses` whose expiration date is before
    /// `cutoff`. Returns how many were deleted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    async fn delete_stale_before(
        &self,
        cutoff: Timestamp,
        statuses: &[CartStatus],
    ) -> Result<u64, StoreError>;

    /// Receive an event for every committed write from now on.
    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;
}
