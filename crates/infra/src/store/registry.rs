use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use preorder_catalog::Merchant;
use preorder_core::{MerchantId, UserId};

use super::StoreError;

/// Read-only merchant lookups.
pub trait MerchantRegistry: Send + Sync {
    fn get_merchant(&self, id: MerchantId) -> Result<Option<Merchant>, StoreError>;

    /// Merchants operated by `owner_id`.
    fn owned_by(&self, owner_id: UserId) -> Result<Vec<MerchantId>, StoreError>;
}

impl<S> MerchantRegistry for Arc<S>
where
    S: MerchantRegistry + ?Sized,
{
    fn get_merchant(&self, id: MerchantId) -> Result<Option<Merchant>, StoreError> {
        (**self).get_merchant(id)
    }

    fn owned_by(&self, owner_id: UserId) -> Result<Vec<MerchantId>, StoreError> {
        (**self).owned_by(owner_id)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryMerchantRegistry {
    merchants: RwLock<HashMap<MerchantId, Merchant>>,
}

impl InMemoryMerchantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_merchant(&self, merchant: Merchant) -> Result<(), StoreError> {
        let mut merchants = self.merchants.write().map_err(|_| StoreError::poisoned())?;
        merchants.insert(merchant.id, merchant);
        Ok(())
    }
}

impl MerchantRegistry for InMemoryMerchantRegistry {
    fn get_merchant(&self, id: MerchantId) -> Result<Option<Merchant>, StoreError> {
        let merchants = self.merchants.read().map_err(|_| StoreError::poisoned())?;
        Ok(merchants.get(&id).cloned())
    }

    fn owned_by(&self, owner_id: UserId) -> Result<Vec<MerchantId>, StoreError> {
        let merchants = self.merchants.read().map_err(|_| StoreError::poisoned())?;
        let mut ids: Vec<MerchantId> = merchants
            .values()
            .filter(|m| m.owner_id == owner_id)
            .map(|m| m.id)
            .collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use preorder_catalog::MerchantStatus;

    #[test]
    fn owned_by_filters_on_owner() {
        let registry = InMemoryMerchantRegistry::new();
        let owner = UserId::new();
        let mine = Merchant::new(owner, "Kantin Teknik", MerchantStatus::Active);
        let theirs = Merchant::new(UserId::new(), "Kopi Senja", MerchantStatus::Pending);
        registry.upsert_merchant(mine.clone()).unwrap();
        registry.upsert_merchant(theirs).unwrap();

        assert_eq!(registry.owned_by(owner).unwrap(), vec![mine.id]);
        assert!(registry.owned_by(UserId::new()).unwrap().is_empty());
        assert_eq!(registry.get_merchant(mine.id).unwrap(), Some(mine));
    }
}
