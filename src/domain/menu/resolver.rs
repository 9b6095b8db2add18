//! Menu price and name lookups.

use async_trait::async_trait;
use mockall::automock;
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use tokio::sync::RwLock;

use crate::domain::{
    ids::{MenuItemId, RestaurantId},
    menu::records::MenuItemRecord,
};

/// Resolves menu item ids to their current price and display name. Both
/// lookups answer `None` for ids the menu does not know.
#[automock]
#[async_trait]
pub trait MenuResolver: Send + Sync {
    async fn price_of(&self, item: MenuItemId) -> Option<Decimal>;

    async fn name_of(&self, item: MenuItemId) -> Option<String>;
}

/// Menu held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryMenu {
    items: RwLock<FxHashMap<MenuItemId, MenuItemRecord>>,
}

impl InMemoryMenu {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: impl IntoIterator<Item = MenuItemRecord>) -> Self {
        Self {
            items: RwLock::new(items.into_iter().map(|item| (item.id, item)).collect()),
        }
    }

    /// Add an item or replace its price and name.
    pub async fn upsert(&self, item: MenuItemRecord) {
        self.items.write().await.insert(item.id, item);
    }

    pub async fn remove(&self, item: MenuItemId) -> Option<MenuItemRecord> {
        self.items.write().await.remove(&item)
    }

    pub async fn get(&self, item: MenuItemId) -> Option<MenuItemRecord> {
        self.items.read().await.get(&item).cloned()
    }

    /// Items sold by `restaurant`, ordered by id.
    pub async fn items_for_restaurant(&self, restaurant: &RestaurantId) -> Vec<MenuItemRecord> {
        let mut items: Vec<MenuItemRecord> = self
            .items
            .read()
            .await
            .values()
            .filter(|item| item.restaurant.as_ref() == Some(restaurant))
            .cloned()
            .collect();

        items.sort_by_key(|item| item.id);

        items
    }

    /// Distinct restaurants appearing on the menu, sorted.
    pub async fn restaurants(&self) -> Vec<RestaurantId> {
        let mut restaurants: Vec<RestaurantId> = self
            .items
            .read()
            .await
            .values()
            .filter_map(|item| item.restaurant.clone())
            .collect();

        restaurants.sort();
        restaurants.dedup();

        restaurants
    }
}

#[async_trait]
impl MenuResolver for InMemoryMenu {
    async fn price_of(&self, item: MenuItemId) -> Option<Decimal> {
        self.items.read().await.get(&item).map(|record| record.price)
    }

    async fn name_of(&self, item: MenuItemId) -> Option<String> {
        self.items
            .read()
            .await
            .get(&item)
            .map(|record| record.name.clone())
    }
}
