//! HTTP route handlers.

pub mod data_products;
pub mod health;
pub mod identifiers;
pub mod info;
pub mod wire;
