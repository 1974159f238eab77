use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use preorder_core::{Entity, MerchantId, UserId};

/// Merchant operational status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MerchantStatus {
    /// Awaiting admin approval.
    Pending,
    Active,
    Suspended,
    Rejected,
}

/// Merchant record (read-only from the order core's perspective).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Merchant {
    pub id: MerchantId,
    pub owner_id: UserId,
    pub name: String,
    pub status: MerchantStatus,
    pub updated_at: DateTime<Utc>,
}

impl Merchant {
    pub fn new(owner_id: UserId, name: impl Into<String>, status: MerchantStatus) -> Self {
        Self {
            id: MerchantId::new(),
            owner_id,
            name: name.into(),
            status,
            updated_at: Utc::now(),
        }
    }

    /// Invariant helper: only active merchants may have orders placed against them.
    pub fn can_accept_orders(&self) -> bool {
        self.status == MerchantStatus::Active
    }
}

impl Entity for Merchant {
    type Id = MerchantId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_active_merchants_accept_orders() {
        let owner = UserId::new();
        for (status, expected) in [
            (MerchantStatus::Pending, false),
            (MerchantStatus::Active, true),
            (MerchantStatus::Suspended, false),
            (MerchantStatus::Rejected, false),
        ] {
            assert_eq!(Merchant::new(owner, "Warung", status).can_accept_orders(), expected);
        }
    }
}
