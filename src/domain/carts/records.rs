//! Cart Records

use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter, Result as FmtResult},
};

use jiff::Timestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    domain::ids::{MenuItemId, RestaurantId, UserEmail},
    uuids::TypedUuid,
};

/// Cart UUID
pub type CartUuid = TypedUuid<CartRecord>;

/// Quantities keyed by menu item. Every stored quantity is at least one.
pub type CartItems = BTreeMap<MenuItemId, u32>;

/// Cart lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CartStatus {
    /// Accepting item mutations.
    Active,

    /// Checked out; part of order history.
    Closed,

    /// Timed out before checkout.
    Expired,
}

impl CartStatus {
    /// Closed and expired carts never change status again.
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }

    /// Whether `self -> next` is a legal transition.
    pub const fn can_transition_to(self, next: Self) -> bool {
        !self.is_terminal() && next.is_terminal()
    }

    /// Upper-case name, as stored.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Closed => "CLOSED",
            Self::Expired => "EXPIRED",
        }
    }
}

impl Display for CartStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Cart Record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartRecord {
    pub uuid: CartUuid,
    pub user_email: UserEmail,
    pub restaurant: Option<RestaurantId>,
    pub items: CartItems,
    pub status: CartStatus,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    pub total: Decimal,
}

impl CartRecord {
    pub fn is_active(&self) -> bool {
        self.status == CartStatus::Active
    }

    /// Whether this cart belongs to the exact (user, restaurant) scope.
    pub fn in_scope(&self, user: &UserEmail, restaurant: Option<&RestaurantId>) -> bool {
        self.user_email == *user && self.restaurant.as_ref() == restaurant
    }

    /// Whether the cart's time-to-live has elapsed at `now`.
    pub fn is_past_expiry(&self, now: Timestamp) -> bool {
        self.expires_at < now
    }

    pub fn quantity_of(&self, item: MenuItemId) -> u32 {
        self.items.get(&item).copied().unwrap_or_default()
    }

    /// Total number of units across all entries.
    pub fn unit_count(&self) -> u64 {
        self.items.values().map(|&qty| u64::from(qty)).sum()
    }
}

/// Item mutations. Each keeps the "quantity is at least one" rule.
pub(crate) trait CartItemsExt {
    fn add_units(&mut self, item: MenuItemId, qty: u32);
    fn remove_unit(&mut self, item: MenuItemId);
    fn set_quantity(&mut self, item: MenuItemId, qty: i32);
    fn discard(&mut self, item: MenuItemId);
}

impl CartItemsExt for CartItems {
    fn add_units(&mut self, item: MenuItemId, qty: u32) {
        if qty == 0 {
            return;
        }

        let entry = self.entry(item).or_default();
        *entry = entry.saturating_add(qty);
    }

    fn remove_unit(&mut self, item: MenuItemId) {
        match self.get_mut(&item) {
            Some(qty) if *qty > 1 => *qty -= 1,
            Some(_) => {
                self.remove(&item);
            }
            None => {}
        }
    }

    fn set_quantity(&mut self, item: MenuItemId, qty: i32) {
        if qty <= 0 {
            self.remove(&item);
        } else {
            self.insert(item, qty.unsigned_abs());
        }
    }

    fn discard(&mut self, item: MenuItemId) {
        self.remove(&item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUSHI: MenuItemId = MenuItemId::new(1);

    #[test]
    fn only_active_carts_can_transition() {
        assert!(CartStatus::Active.can_transition_to(CartStatus::Closed));
        assert!(CartStatus::Active.can_transition_to(CartStatus::Expired));
        assert!(!CartStatus::Active.can_transition_to(CartStatus::Active));
        assert!(!CartStatus::Closed.can_transition_to(CartStatus::Expired));
        assert!(!CartStatus::Expired.can_transition_to(CartStatus::Closed));
        assert!(!CartStatus::Closed.can_transition_to(CartStatus::Active));
    }

    #[test]
    fn closed_and_expired_are_terminal() {
        assert!(!CartStatus::Active.is_terminal());
        assert!(CartStatus::Closed.is_terminal());
        assert!(CartStatus::Expired.is_terminal());
    }

    #[test]
    fn removing_last_unit_drops_the_entry() {
        let mut items = CartItems::new();

        items.add_units(SUSHI, 2);
        items.remove_unit(SUSHI);

        assert_eq!(items.get(&SUSHI), Some(&1));

        items.remove_unit(SUSHI);

        assert!(items.is_empty(), "last unit should remove the entry");
    }

    #[test]
    fn removing_absent_item_is_a_no_op() {
        let mut items = CartItems::new();

        items.remove_unit(SUSHI);

        assert!(items.is_empty());
    }

    #[test]
    fn non_positive_quantity_removes_entry() {
        let mut items = CartItems::from([(SUSHI, 4)]);

        items.set_quantity(SUSHI, -3);

        assert!(items.is_empty());

        items.set_quantity(SUSHI, 0);

        assert!(items.is_empty());

        items.set_quantity(SUSHI, 7);

        assert_eq!(items.get(&SUSHI), Some(&7));
    }

    #[test]
    fn adding_zero_units_never_creates_an_entry() {
        let mut items = CartItems::new();

        items.add_units(SUSHI, 0);

        assert!(items.is_empty());
    }

    #[test]
    fn status_serializes_upper_case() -> Result<(), serde_json::Error> {
        assert_eq!(serde_json::to_string(&CartStatus::Expired)?, "\"EXPIRED\"");

        Ok(())
    }
}
