//! Menu Records

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::ids::{MenuItemId, RestaurantId};

/// Menu Item Record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItemRecord {
    pub id: MenuItemId,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub restaurant: Option<RestaurantId>,
}
