//! Test context for service-level tests.

use std::sync::Arc;

use jiff::{SignedDuration, Timestamp};
use rust_decimal::Decimal;

use crate::{
    clock::ManualClock,
    domain::{
        carts::{StoreCartsService, repositories::InMemoryCartsRepository, sweeper::ExpirationSweeper},
        ids::{MenuItemId, RestaurantId},
        menu::{InMemoryMenu, records::MenuItemRecord},
        reports::ReportsService,
    },
    settings::{CartSettings, SweeperSettings},
};

use super::{GYOZA, OSAKA, RAMEN, SUSHI, TOKYO, price};

const START: Timestamp = Timestamp::constant(1_740_830_400, 0);

/// Services wired to an in-memory store, a seeded menu and a frozen clock
/// starting at 2025-03-01T12:00:00Z.
pub(crate) struct TestContext {
    pub clock: Arc<ManualClock>,
    pub repository: Arc<InMemoryCartsRepository>,
    pub menu: Arc<InMemoryMenu>,
    pub carts: StoreCartsService,
    pub reports: ReportsService,
}

impl TestContext {
    pub(crate) fn new() -> Self {
        let clock = Arc::new(ManualClock::new(START));
        let repository = Arc::new(InMemoryCartsRepository::new());
        let menu = Arc::new(InMemoryMenu::with_items([
            item(SUSHI, "Sushi", price(12_50), Some(TOKYO)),
            item(RAMEN, "Ramen", price(9_75), Some(OSAKA)),
            item(GYOZA, "Gyoza", price(6_00), None),
        ]));

        Self {
            carts: StoreCartsService::new(
                repository.clone(),
                menu.clone(),
                clock.clone(),
                CartSettings::default(),
            ),
            reports: ReportsService::new(repository.clone(), menu.clone()),
            clock,
            repository,
            menu,
        }
    }

    /// A sweeper over this context's store and clock.
    pub(crate) fn sweeper(&self, retention: SignedDuration) -> ExpirationSweeper {
        ExpirationSweeper::new(
            self.repository.clone(),
            self.clock.clone(),
            SweeperSettings {
                retention,
                ..SweeperSettings::default()
            },
        )
    }

    /// Move the clock forward one minute so consecutive carts get distinct
    /// creation stamps.
    pub(crate) fn tick(&self) -> Result<(), jiff::Error> {
        self.clock.advance(SignedDuration::from_mins(1))?;

        Ok(())
    }

    /// Reprice a menu item, keeping its name and restaurant.
    pub(crate) async fn set_price(&self, id: MenuItemId, price: Decimal) {
        if let Some(mut record) = self.menu.get(id).await {
            record.price = price;
            self.menu.upsert(record).await;
        }
    }
}

fn item(id: MenuItemId, name: &str, price: Decimal, restaurant: Option<&str>) -> MenuItemRecord {
    MenuItemRecord {
        id,
        name: name.to_string(),
        price,
        restaurant: restaurant.map(RestaurantId::from),
    }
}
