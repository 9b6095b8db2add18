//! In-memory cart store.

use std::cmp::Reverse;

use async_trait::async_trait;
use jiff::Timestamp;
use rustc_hash::{FxHashMap, FxHashSet};
use tokio::sync::{RwLock, broadcast};
use tracing::trace;

use crate::domain::{
    carts::records::{CartRecord, CartStatus, CartUuid},
    ids::{RestaurantId, UserEmail},
};

use super::{CartRef, CartsRepository, StoreError, StoreEvent, StoreEventKind};

const EVENT_CAPACITY: usize = 256;

/// Cart store held in process memory.
///
/// A single lock guards the table, so every write (including batches) is
/// atomic and reads always observe the last completed write. Events are
/// published while the write lock is held, keeping them in commit order.
#[derive(Debug)]
pub struct InMemoryCartsRepository {
    carts: RwLock<FxHashMap<CartUuid, CartRecord>>,
    events: broadcast::Sender<StoreEvent>,
}

impl Default for InMemoryCartsRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCartsRepository {
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            carts: RwLock::new(FxHashMap::default()),
            events,
        }
    }

    /// Number of stored records, in any status.
    pub async fn len(&self) -> usize {
        self.carts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.carts.read().await.is_empty()
    }

    fn publish(&self, kind: StoreEventKind, carts: Vec<CartRef>) {
        if carts.is_empty() {
            return;
        }

        if self.events.send(StoreEvent { kind, carts }).is_err() {
            trace!("no cart store subscribers");
        }
    }
}

/// Newest first; carts created at the same instant fall back to uuid order.
fn newest_first(records: &mut [CartRecord]) {
    records.sort_by_key(|record| Reverse((record.created_at, record.uuid)));
}

#[async_trait]
impl CartsRepository for InMemoryCartsRepository {
    async fn get_cart(&self, cart: CartUuid) -> Result<Option<CartRecord>, StoreError> {
        Ok(self.carts.read().await.get(&cart).cloned())
    }

    async fn find_active(
        &self,
        user: &UserEmail,
        restaurant: Option<RestaurantId>,
    ) -> Result<Option<CartRecord>, StoreError> {
        let carts = self.carts.read().await;

        Ok(carts
            .values()
            .find(|record| record.is_active() && record.in_scope(user, restaurant.as_ref()))
            .cloned())
    }

    async fn find_by_user_and_statuses(
        &self,
        user: &UserEmail,
        statuses: &[CartStatus],
    ) -> Result<Vec<CartRecord>, StoreError> {
        let carts = self.carts.read().await;

        Ok(carts
            .values()
            .filter(|record| record.user_email == *user && statuses.contains(&record.status))
            .cloned()
            .collect())
    }

    async fn find_by_statuses_and_restaurant(
        &self,
        statuses: &[CartStatus],
        restaurant: Option<RestaurantId>,
    ) -> Result<Vec<CartRecord>, StoreError> {
        let mut matching: Vec<CartRecord> = {
            let carts = self.carts.read().await;

            carts
                .values()
                .filter(|record| statuses.contains(&record.status))
                .filter(|record| {
                    restaurant.is_none() || record.restaurant.as_ref() == restaurant.as_ref()
                })
                .cloned()
                .collect()
        };

        newest_first(&mut matching);

        Ok(matching)
    }

    async fn list_expired_active(&self, now: Timestamp) -> Result<Vec<CartRecord>, StoreError> {
        let carts = self.carts.read().await;

        Ok(carts
            .values()
            .filter(|record| record.is_active() && record.is_past_expiry(now))
            .cloned()
            .collect())
    }

    async fn last_closed_for_user(
        &self,
        user: &UserEmail,
        limit: usize,
    ) -> Result<Vec<CartRecord>, StoreError> {
        let mut closed = self
            .find_by_user_and_statuses(user, &[CartStatus::Closed])
            .await?;

        newest_first(&mut closed);
        closed.truncate(limit);

        Ok(closed)
    }

    async fn active_restaurants_for_user(
        &self,
        user: &UserEmail,
    ) -> Result<Vec<RestaurantId>, StoreError> {
        let carts = self.carts.read().await;

        let restaurants: FxHashSet<&RestaurantId> = carts
            .values()
            .filter(|record| record.is_active() && record.user_email == *user)
            .filter_map(|record| record.restaurant.as_ref())
            .collect();

        let mut restaurants: Vec<RestaurantId> = restaurants.into_iter().cloned().collect();
        restaurants.sort();

        Ok(restaurants)
    }

    async fn insert_or_replace(&self, record: CartRecord) -> Result<(), StoreError> {
        let mut carts = self.carts.write().await;

        let cart = CartRef::from(&record);
        carts.insert(record.uuid, record);

        self.publish(StoreEventKind::Upserted, vec![cart]);

        Ok(())
    }

    async fn replace_active(&self, record: CartRecord) -> Result<bool, StoreError> {
        let mut carts = self.carts.write().await;

        let Some(stored) = carts.get_mut(&record.uuid) else {
            return Ok(false);
        };

        if !stored.is_active() {
            return Ok(false);
        }

        let cart = CartRef::from(&record);
        *stored = record;

        self.publish(StoreEventKind::Upserted, vec![cart]);

        Ok(true)
    }

    async fn update_status(&self, cart: CartUuid, status: CartStatus) -> Result<bool, StoreError> {
        Ok(self.update_statuses(&[cart], status).await? == 1)
    }

    async fn update_statuses(
        &self,
        carts: &[CartUuid],
        status: CartStatus,
    ) -> Result<u64, StoreError> {
        let mut table = self.carts.write().await;

        let mut changed = Vec::with_capacity(carts.len());

        for uuid in carts {
            if let Some(record) = table.get_mut(uuid)
                && record.status.can_transition_to(status)
            {
                record.status = status;
                changed.push(CartRef::from(&*record));
            }
        }

        let count = changed.len() as u64;

        self.publish(StoreEventKind::StatusChanged(status), changed);

        Ok(count)
    }

    async fn delete_cart(&self, cart: CartUuid) -> Result<bool, StoreError> {
        let mut carts = self.carts.write().await;

        let Some(removed) = carts.remove(&cart) else {
            return Ok(false);
        };

        self.publish(StoreEventKind::Deleted, vec![CartRef::from(&removed)]);

        Ok(true)
    }

    async fn delete_stale_before(
        &self,
        cutoff: Timestamp,
        statuses: &[CartStatus],
    ) -> Result<u64, StoreError> {
        let mut carts = self.carts.write().await;

        let mut removed = Vec::new();

        carts.retain(|_, record| {
            let stale = statuses.contains(&record.status) && record.expires_at < cutoff;

            if stale {
                removed.push(CartRef::from(&*record));
            }

            !stale
        });

        let count = removed.len() as u64;

        self.publish(StoreEventKind::Deleted, removed);

        Ok(count)
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}
