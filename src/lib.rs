//! Tablecart
//!
//! Restaurant cart lifecycle: one active cart per customer and restaurant,
//! item mutations with live totals, checkout into order history, background
//! expiration of abandoned carts and best-seller reports over closed carts.

pub mod clock;
pub mod context;
pub mod domain;
pub mod settings;
pub mod uuids;

#[cfg(test)]
mod test;
