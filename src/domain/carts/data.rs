//! Cart Data

use crate::domain::{
    carts::records::CartItems,
    ids::{RestaurantId, UserEmail},
};

/// New Cart Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewCart {
    pub user_email: UserEmail,
    pub restaurant: Option<RestaurantId>,
    pub items: CartItems,
}

impl NewCart {
    /// An empty cart for `user`, optionally scoped to a restaurant.
    pub fn empty(user_email: UserEmail, restaurant: Option<RestaurantId>) -> Self {
        Self {
            user_email,
            restaurant,
            items: CartItems::new(),
        }
    }

    #[must_use]
    pub fn with_items(mut self, items: CartItems) -> Self {
        self.items = items;
        self
    }
}

/// Who is asking for a destructive operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Customer,
    Admin,
}

/// Identifies the scope the one-active-cart rule is keyed on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct CartScope {
    pub user_email: UserEmail,
    pub restaurant: Option<RestaurantId>,
}

impl From<&NewCart> for CartScope {
    fn from(cart: &NewCart) -> Self {
        Self {
            user_email: cart.user_email.clone(),
            restaurant: cart.restaurant.clone(),
        }
    }
}
