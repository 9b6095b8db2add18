//! Shared test fixtures.

mod context;

use rust_decimal::Decimal;

use crate::domain::ids::{MenuItemId, UserEmail};

pub(crate) use context::TestContext;

/// On the menu at 12.50, served in Tokyo.
pub(crate) const SUSHI: MenuItemId = MenuItemId::new(1);

/// On the menu at 9.75, served in Osaka.
pub(crate) const RAMEN: MenuItemId = MenuItemId::new(2);

/// On the menu at 6.00, not tied to a restaurant.
pub(crate) const GYOZA: MenuItemId = MenuItemId::new(3);

/// Never on the menu.
pub(crate) const MYSTERY: MenuItemId = MenuItemId::new(99);

pub(crate) const TOKYO: &str = "tokyo";
pub(crate) const OSAKA: &str = "osaka";

pub(crate) fn ana() -> UserEmail {
    UserEmail::new("ana@example.com")
}

pub(crate) fn bo() -> UserEmail {
    UserEmail::new("bo@example.com")
}

/// Price from minor units, e.g. `price(12_50)` is 12.50.
pub(crate) fn price(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}
