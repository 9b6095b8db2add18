//! Tablecart Domain Concerns

pub mod carts;
pub mod ids;
pub mod menu;
pub mod ratings;
pub mod reports;
