//! Menu

pub mod records;
pub mod resolver;

pub use resolver::*;
