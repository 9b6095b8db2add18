//! Live cart queries.
//!
//! A [`CartsWatcher`] re-runs its query whenever the store commits a write
//! touching a cart the query could return, and hands the fresh snapshot to
//! the caller.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::Arc,
};

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

use crate::domain::{
    carts::{
        records::{CartRecord, CartStatus},
        repositories::{CartRef, CartsRepository, StoreError, StoreEvent},
    },
    ids::{RestaurantId, UserEmail},
};

/// A store query that can be watched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartQuery {
    /// The active cart for an exact scope (zero or one record).
    Active {
        user: UserEmail,
        restaurant: Option<RestaurantId>,
    },

    /// A user's carts in the given statuses.
    UserStatuses {
        user: UserEmail,
        statuses: Vec<CartStatus>,
    },

    /// Carts in the given statuses, newest first; `None` spans all restaurants.
    RestaurantStatuses {
        statuses: Vec<CartStatus>,
        restaurant: Option<RestaurantId>,
    },

    /// A user's most recent closed carts.
    LastClosed { user: UserEmail, limit: usize },
}

impl CartQuery {
    fn could_include(&self, cart: &CartRef) -> bool {
        match self {
            Self::Active { user, restaurant } => {
                cart.user_email == *user && cart.restaurant == *restaurant
            }
            Self::UserStatuses { user, .. } | Self::LastClosed { user, .. } => {
                cart.user_email == *user
            }
            Self::RestaurantStatuses { restaurant, .. } => {
                restaurant.is_none() || cart.restaurant == *restaurant
            }
        }
    }

    fn is_affected_by(&self, event: &StoreEvent) -> bool {
        event.carts.iter().any(|cart| self.could_include(cart))
    }

    async fn run(&self, repository: &dyn CartsRepository) -> Result<Vec<CartRecord>, StoreError> {
        match self {
            Self::Active { user, restaurant } => Ok(repository
                .find_active(user, restaurant.clone())
                .await?
                .into_iter()
                .collect()),
            Self::UserStatuses { user, statuses } => {
                repository.find_by_user_and_statuses(user, statuses).await
            }
            Self::RestaurantStatuses {
                statuses,
                restaurant,
            } => {
                repository
                    .find_by_statuses_and_restaurant(statuses, restaurant.clone())
                    .await
            }
            Self::LastClosed { user, limit } => repository.last_closed_for_user(user, *limit).await,
        }
    }
}

pub struct CartsWatcher {
    repository: Arc<dyn CartsRepository>,
    query: CartQuery,
    events: broadcast::Receiver<StoreEvent>,
    primed: bool,
}

impl CartsWatcher {
    /// Start watching. Subscribes before the first query runs, so no write
    /// between the two can be missed.
    pub fn new(repository: Arc<dyn CartsRepository>, query: CartQuery) -> Self {
        let events = repository.subscribe();

        Self {
            repository,
            query,
            events,
            primed: false,
        }
    }

    pub fn query(&self) -> &CartQuery {
        &self.query
    }

    /// The current snapshot on the first call; afterwards, waits for the next
    /// relevant write and returns the refreshed snapshot. Returns `None` once
    /// the store's event channel has closed.
    pub async fn next_snapshot(&mut self) -> Option<Result<Vec<CartRecord>, StoreError>> {
        if !self.primed {
            self.primed = true;

            return Some(self.query.run(self.repository.as_ref()).await);
        }

        loop {
            match self.events.recv().await {
                Ok(event) if self.query.is_affected_by(&event) => break,
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "cart watcher lagged behind the store, resyncing");
                    break;
                }
                Err(RecvError::Closed) => return None,
            }
        }

        Some(self.query.run(self.repository.as_ref()).await)
    }
}

impl Debug for CartsWatcher {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("CartsWatcher")
            .field("query", &self.query)
            .field("primed", &self.primed)
            .finish_non_exhaustive()
    }
}
