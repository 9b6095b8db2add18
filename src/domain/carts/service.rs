//! Carts service.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::Arc,
};

use async_trait::async_trait;
use mockall::automock;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::{
    clock::Clock,
    domain::{
        carts::{
            data::{Actor, CartScope, NewCart},
            errors::CartsServiceError,
            locks::KeyedLocks,
            records::{CartItems, CartItemsExt, CartRecord, CartStatus, CartUuid},
            repositories::CartsRepository,
        },
        ids::{MenuItemId, RestaurantId, UserEmail},
        menu::MenuResolver,
    },
    settings::{CartSettings, DEFAULT_HISTORY_LIMIT},
};

/// Lifecycle manager backed by a [`CartsRepository`].
///
/// Item mutations and checkout hold a per-cart lock across their
/// read-modify-write; creation holds a per-scope lock across the
/// active-cart check and the insert.
pub struct StoreCartsService {
    repository: Arc<dyn CartsRepository>,
    menu: Arc<dyn MenuResolver>,
    clock: Arc<dyn Clock>,
    settings: CartSettings,
    cart_locks: KeyedLocks<CartUuid>,
    scope_locks: KeyedLocks<CartScope>,
}

impl StoreCartsService {
    pub fn new(
        repository: Arc<dyn CartsRepository>,
        menu: Arc<dyn MenuResolver>,
        clock: Arc<dyn Clock>,
        settings: CartSettings,
    ) -> Self {
        Self {
            repository,
            menu,
            clock,
            settings,
            cart_locks: KeyedLocks::default(),
            scope_locks: KeyedLocks::default(),
        }
    }

    /// Σ quantity × current price. Items the menu cannot price are left out.
    async fn price_items(&self, items: &CartItems) -> Decimal {
        let mut total = Decimal::ZERO;

        for (&item, &qty) in items {
            match self.menu.price_of(item).await {
                Some(price) => total += price * Decimal::from(qty),
                None => debug!(%item, "no price for menu item, leaving it out of the total"),
            }
        }

        total
    }

    /// Re-read a cart that a conditional write refused, to explain why.
    async fn refusal(&self, cart: CartUuid) -> CartsServiceError {
        match self.repository.get_cart(cart).await {
            Ok(Some(record)) => CartsServiceError::InvalidState {
                status: record.status,
            },
            Ok(None) => CartsServiceError::NotFound,
            Err(error) => error.into(),
        }
    }

    async fn mutate_items<F>(&self, cart: CartUuid, apply: F) -> Result<CartRecord, CartsServiceError>
    where
        F: FnOnce(&mut CartItems) + Send,
    {
        let _guard = self.cart_locks.lock(&cart).await;

        let mut record = load_active(self.repository.as_ref(), cart).await?;

        apply(&mut record.items);
        record.total = self.price_items(&record.items).await;

        // The sweeper may have expired the cart since it was read.
        if !self.repository.replace_active(record.clone()).await? {
            return Err(self.refusal(cart).await);
        }

        debug!(%cart, total = %record.total, "cart items updated");

        Ok(record)
    }
}

impl Debug for StoreCartsService {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("StoreCartsService")
            .field("clock", &self.clock)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

async fn load_active(
    repository: &dyn CartsRepository,
    cart: CartUuid,
) -> Result<CartRecord, CartsServiceError> {
    let record = repository
        .get_cart(cart)
        .await?
        .ok_or(CartsServiceError::NotFound)?;

    if !record.is_active() {
        return Err(CartsServiceError::InvalidState {
            status: record.status,
        });
    }

    Ok(record)
}

#[async_trait]
impl CartsService for StoreCartsService {
    async fn get_cart(&self, cart: CartUuid) -> Result<CartRecord, CartsServiceError> {
        self.repository
            .get_cart(cart)
            .await?
            .ok_or(CartsServiceError::NotFound)
    }

    async fn create_cart(&self, cart: NewCart) -> Result<CartRecord, CartsServiceError> {
        let scope = CartScope::from(&cart);
        let _guard = self.scope_locks.lock(&scope).await;

        if let Some(existing) = self
            .repository
            .find_active(&cart.user_email, cart.restaurant.clone())
            .await?
        {
            warn!(
                user = %cart.user_email,
                existing = %existing.uuid,
                "refusing to open a second active cart"
            );

            return Err(CartsServiceError::AlreadyActive {
                existing: existing.uuid,
            });
        }

        let created_at = self.clock.now();
        let expires_at = created_at
            .checked_add(self.settings.ttl)
            .map_err(CartsServiceError::Timestamp)?;

        let items: CartItems = cart.items.into_iter().filter(|&(_, qty)| qty > 0).collect();
        let total = self.price_items(&items).await;

        let record = CartRecord {
            uuid: CartUuid::now_v7(),
            user_email: cart.user_email,
            restaurant: cart.restaurant,
            items,
            status: CartStatus::Active,
            created_at,
            expires_at,
            total,
        };

        self.repository.insert_or_replace(record.clone()).await?;

        info!(
            cart = %record.uuid,
            user = %record.user_email,
            restaurant = ?record.restaurant,
            %expires_at,
            "cart created"
        );

        Ok(record)
    }

    async fn add_item(
        &self,
        cart: CartUuid,
        item: MenuItemId,
        qty: u32,
    ) -> Result<CartRecord, CartsServiceError> {
        self.mutate_items(cart, |items| items.add_units(item, qty))
            .await
    }

    async fn remove_item(
        &self,
        cart: CartUuid,
        item: MenuItemId,
    ) -> Result<CartRecord, CartsServiceError> {
        self.mutate_items(cart, |items| items.remove_unit(item)).await
    }

    async fn set_item_quantity(
        &self,
        cart: CartUuid,
        item: MenuItemId,
        qty: i32,
    ) -> Result<CartRecord, CartsServiceError> {
        self.mutate_items(cart, |items| items.set_quantity(item, qty))
            .await
    }

    async fn discard_item(
        &self,
        cart: CartUuid,
        item: MenuItemId,
    ) -> Result<CartRecord, CartsServiceError> {
        self.mutate_items(cart, |items| items.discard(item)).await
    }

    async fn refresh_total(&self, cart: CartUuid) -> Result<CartRecord, CartsServiceError> {
        self.mutate_items(cart, |_| {}).await
    }

    async fn close_cart(&self, cart: CartUuid) -> Result<CartRecord, CartsServiceError> {
        let _guard = self.cart_locks.lock(&cart).await;

        let mut record = load_active(self.repository.as_ref(), cart).await?;

        if !self
            .repository
            .update_status(cart, CartStatus::Closed)
            .await?
        {
            return Err(self.refusal(cart).await);
        }

        record.status = CartStatus::Closed;

        info!(%cart, user = %record.user_email, total = %record.total, "cart closed");

        Ok(record)
    }

    async fn delete_cart(&self, cart: CartUuid, actor: Actor) -> Result<(), CartsServiceError> {
        if actor != Actor::Admin {
            return Err(CartsServiceError::Forbidden);
        }

        let _guard = self.cart_locks.lock(&cart).await;

        if !self.repository.delete_cart(cart).await? {
            return Err(CartsServiceError::NotFound);
        }

        info!(%cart, "cart deleted");

        Ok(())
    }

    async fn has_active_cart_for_restaurant(
        &self,
        user: &UserEmail,
        restaurant: &RestaurantId,
    ) -> Result<bool, CartsServiceError> {
        Ok(self
            .repository
            .find_active(user, Some(restaurant.clone()))
            .await?
            .is_some())
    }

    async fn active_cart(
        &self,
        user: &UserEmail,
        restaurant: Option<RestaurantId>,
    ) -> Result<Option<CartRecord>, CartsServiceError> {
        Ok(self.repository.find_active(user, restaurant).await?)
    }

    async fn user_carts(
        &self,
        user: &UserEmail,
        statuses: &[CartStatus],
    ) -> Result<Vec<CartRecord>, CartsServiceError> {
        Ok(self
            .repository
            .find_by_user_and_statuses(user, statuses)
            .await?)
    }

    async fn carts_for_restaurant(
        &self,
        statuses: &[CartStatus],
        restaurant: Option<RestaurantId>,
    ) -> Result<Vec<CartRecord>, CartsServiceError> {
        Ok(self
            .repository
            .find_by_statuses_and_restaurant(statuses, restaurant)
            .await?)
    }

    async fn last_closed_for_user(
        &self,
        user: &UserEmail,
    ) -> Result<Vec<CartRecord>, CartsServiceError> {
        Ok(self
            .repository
            .last_closed_for_user(user, DEFAULT_HISTORY_LIMIT)
            .await?)
    }

    async fn active_restaurants(
        &self,
        user: &UserEmail,
    ) -> Result<Vec<RestaurantId>, CartsServiceError> {
        Ok(self.repository.active_restaurants_for_user(user).await?)
    }
}

#[automock]
#[async_trait]
pub trait CartsService: Send + Sync {
    /// Retrieve a single cart.
    async fn get_cart(&self, cart: CartUuid) -> Result<CartRecord, CartsServiceError>;

    /// Open a new active cart. Fails with `AlreadyActive` when the user already
    /// has one for the same restaurant scope.
    async fn create_cart(&self, cart: NewCart) -> Result<CartRecord, CartsServiceError>;

    /// Add `qty` units of an item.
    async fn add_item(
        &self,
        cart: CartUuid,
        item: MenuItemId,
        qty: u32,
    ) -> Result<CartRecord, CartsServiceError>;

    /// Take one unit of an item out, dropping the entry at zero.
    async fn remove_item(
        &self,
        cart: CartUuid,
        item: MenuItemId,
    ) -> Result<CartRecord, CartsServiceError>;

    /// Overwrite an item's quantity; zero or less removes it.
    async fn set_item_quantity(
        &self,
        cart: CartUuid,
        item: MenuItemId,
        qty: i32,
    ) -> Result<CartRecord, CartsServiceError>;

    /// Drop an item whatever its quantity.
    async fn discard_item(
        &self,
        cart: CartUuid,
        item: MenuItemId,
    ) -> Result<CartRecord, CartsServiceError>;

    /// Recompute the cached total against current menu prices.
    async fn refresh_total(&self, cart: CartUuid) -> Result<CartRecord, CartsServiceError>;

    /// Check out an active cart.
    async fn close_cart(&self, cart: CartUuid) -> Result<CartRecord, CartsServiceError>;

    /// Hard-delete a cart in any status. Administrators only.
    async fn delete_cart(&self, cart: CartUuid, actor: Actor) -> Result<(), CartsServiceError>;

    async fn has_active_cart_for_restaurant(
        &self,
        user: &UserEmail,
        restaurant: &RestaurantId,
    ) -> Result<bool, CartsServiceError>;

    /// The user's active cart for the exact restaurant scope, if any.
    async fn active_cart(
        &self,
        user: &UserEmail,
        restaurant: Option<RestaurantId>,
    ) -> Result<Option<CartRecord>, CartsServiceError>;

    async fn user_carts(
        &self,
        user: &UserEmail,
        statuses: &[CartStatus],
    ) -> Result<Vec<CartRecord>, CartsServiceError>;

    /// Carts in `statuses`, newest first; `None` spans every restaurant.
    async fn carts_for_restaurant(
        &self,
        statuses: &[CartStatus],
        restaurant: Option<RestaurantId>,
    ) -> Result<Vec<CartRecord>, CartsServiceError>;

    /// The user's five most recent closed carts, newest first.
    async fn last_closed_for_user(
        &self,
        user: &UserEmail,
    ) -> Result<Vec<CartRecord>, CartsServiceError>;

    /// Restaurants where the user has an active cart.
    async fn active_restaurants(
        &self,
        user: &UserEmail,
    ) -> Result<Vec<RestaurantId>, CartsServiceError>;
}
