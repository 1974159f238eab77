//! Infrastructure layer: storage boundaries, configuration and the order service.

pub mod config;
pub mod order_service;
pub mod retry;
pub mod store;


pub use config::{ConfigError, ServiceConfig};
pub use order_service::{OrderService, ServiceError};
pub use retry::{BackoffStrategy, RetryPolicy};
pub use store::StoreError;
