use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are modeled as opaque strings (e.g. "orders.place").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const PLACE_ORDER: Permission = Permission(Cow::Borrowed("orders.place"));
    pub const CANCEL_ORDER: Permission = Permission(Cow::Borrowed("orders.cancel"));
    pub const FULFIL_ORDER: Permission = Permission(Cow::Borrowed("orders.fulfil"));
    pub const READ_ALL_ORDERS: Permission = Permission(Cow::Borrowed("orders.read_all"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
