//! `preorder-auth`: pure authorization boundary for the order core.
//!
//! This crate is intentionally decoupled from HTTP, sessions and storage:
//! callers resolve who the principal is and which records they touch, and the
//! checks here decide what that principal may do.

pub mod authorize;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{
    AuthzError, ListScope, OrderAccess, OrderParties, Side, authorize, list_scope, order_access,
};
pub use permissions::Permission;
pub use principal::Principal;
pub use roles::Role;
