//! Catalog records read by the order core: merchants, products and the
//! conditional stock-change contract.
//!
//! Pure data and rules (no IO, no HTTP, no storage).

pub mod merchant;
pub mod product;
pub mod stock;

pub use merchant::{Merchant, MerchantStatus};
pub use product::Product;
pub use stock::{ExpectedStock, StockChange};
