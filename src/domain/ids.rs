//! Identity values shared across the domain.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

/// Cart owner, matched by value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserEmail(String);

impl UserEmail {
    /// Wrap an email address.
    pub fn new(email: impl Into<String>) -> Self {
        Self(email.into())
    }

    /// Borrow the underlying address.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserEmail {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for UserEmail {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Display for UserEmail {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

/// Restaurant a cart or menu item belongs to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RestaurantId(String);

impl RestaurantId {
    /// Wrap a restaurant identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the underlying identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RestaurantId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RestaurantId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Display for RestaurantId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

/// Menu item identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MenuItemId(u64);

impl MenuItemId {
    /// Wrap a raw menu item id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw id.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for MenuItemId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl Display for MenuItemId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Display::fmt(&self.0, f)
    }
}
