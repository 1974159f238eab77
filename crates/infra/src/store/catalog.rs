use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use preorder_catalog::{Product, StockChange};
use preorder_core::{DomainError, ProductId};

use super::StoreError;

/// Product lookups plus the conditional stock-update primitive.
pub trait Catalog: Send + Sync {
    fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Apply every change or none of them.
    ///
    /// Changes are evaluated in order against the state produced by the ones
    /// before them. A basis mismatch or a result below zero fails with
    /// `Conflict`; an unknown product fails with `NotFound`. Returns the
    /// updated products in change order.
    fn apply_stock(
        &self,
        changes: &[StockChange],
        at: DateTime<Utc>,
    ) -> Result<Vec<Product>, StoreError> {
        self.apply_stock_with(changes, at, &mut || Ok(()))
    }

    /// Apply `changes` and `commit` as one unit.
    ///
    /// `commit` runs once every change has been checked and before any of
    /// them is visible. If the changes do not apply, `commit` never runs; if
    /// `commit` fails, no change is applied and its error is returned.
    /// `commit` runs while the catalog is held and must not call back into it.
    fn apply_stock_with(
        &self,
        changes: &[StockChange],
        at: DateTime<Utc>,
        commit: &mut dyn FnMut() -> Result<(), StoreError>,
    ) -> Result<Vec<Product>, StoreError>;
}

impl<S> Catalog for Arc<S>
where
    S: Catalog + ?Sized,
{
    fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        (**self).get_product(id)
    }

    fn apply_stock(
        &self,
        changes: &[StockChange],
        at: DateTime<Utc>,
    ) -> Result<Vec<Product>, StoreError> {
        (**self).apply_stock(changes, at)
    }

    fn apply_stock_with(
        &self,
        changes: &[StockChange],
        at: DateTime<Utc>,
        commit: &mut dyn FnMut() -> Result<(), StoreError>,
    ) -> Result<Vec<Product>, StoreError> {
        (**self).apply_stock_with(changes, at, commit)
    }
}

/// In-memory catalog guarded by a single lock.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: RwLock<HashMap<ProductId, Product>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a product record (merchant-side edits, seeding).
    pub fn upsert_product(&self, product: Product) -> Result<(), StoreError> {
        let mut products = self.products.write().map_err(|_| StoreError::poisoned())?;
        products.insert(product.id, product);
        Ok(())
    }
}

impl Catalog for InMemoryCatalog {
    fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let products = self.products.read().map_err(|_| StoreError::poisoned())?;
        Ok(products.get(&id).cloned())
    }

    fn apply_stock_with(
        &self,
        changes: &[StockChange],
        at: DateTime<Utc>,
        commit: &mut dyn FnMut() -> Result<(), StoreError>,
    ) -> Result<Vec<Product>, StoreError> {
        let mut products = self.products.write().map_err(|_| StoreError::poisoned())?;

        // Stage against a scratch copy; publish only if every change applies
        // and the paired write succeeded.
        let mut staged: HashMap<ProductId, Product> = HashMap::new();
        let mut updated = Vec::with_capacity(changes.len());
        for change in changes {
            let current = match staged.get(&change.product_id) {
                Some(p) => p,
                None => products.get(&change.product_id).ok_or_else(|| {
                    StoreError::NotFound(format!("product {}", change.product_id))
                })?,
            };
            let next = change.apply(current, at).map_err(stock_error)?;
            updated.push(next.clone());
            staged.insert(next.id, next);
        }

        commit()?;
        products.extend(staged);
        Ok(updated)
    }
}

fn stock_error(err: DomainError) -> StoreError {
    match err {
        DomainError::Conflict(msg) | DomainError::InvariantViolation(msg) => {
            StoreError::Conflict(msg)
        }
        other => StoreError::Backend(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use preorder_catalog::ExpectedStock;
    use preorder_core::MerchantId;

    fn seeded(stocks: &[u32]) -> (InMemoryCatalog, Vec<Product>) {
        let catalog = InMemoryCatalog::new();
        let merchant = MerchantId::new();
        let products: Vec<Product> = stocks
            .iter()
            .map(|s| Product::new(merchant, "Mie ayam", 12_000, *s))
            .collect();
        for p in &products {
            catalog.upsert_product(p.clone()).unwrap();
        }
        (catalog, products)
    }

    fn stock_of(catalog: &InMemoryCatalog, id: ProductId) -> u32 {
        catalog.get_product(id).unwrap().unwrap().stock
    }

    #[test]
    fn batch_applies_all_changes() {
        let (catalog, p) = seeded(&[5, 3]);
        let updated = catalog
            .apply_stock(
                &[
                    StockChange::decrement(p[0].id, 5, 2),
                    StockChange::decrement(p[1].id, 3, 3),
                ],
                Utc::now(),
            )
            .unwrap();

        assert_eq!(updated.len(), 2);
        assert_eq!(stock_of(&catalog, p[0].id), 3);
        assert_eq!(stock_of(&catalog, p[1].id), 0);
    }

    #[test]
    fn stale_basis_leaves_every_product_untouched() {
        let (catalog, p) = seeded(&[5, 3]);
        let err = catalog
            .apply_stock(
                &[
                    StockChange::decrement(p[0].id, 5, 2),
                    StockChange::decrement(p[1].id, 4, 1),
                ],
                Utc::now(),
            )
            .unwrap_err();

        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(stock_of(&catalog, p[0].id), 5);
        assert_eq!(stock_of(&catalog, p[1].id), 3);
    }

    #[test]
    fn unknown_product_is_not_found() {
        let (catalog, p) = seeded(&[5]);
        let err = catalog
            .apply_stock(
                &[
                    StockChange::decrement(p[0].id, 5, 1),
                    StockChange::restore(ProductId::new(), 1),
                ],
                Utc::now(),
            )
            .unwrap_err();

        assert!(matches!(err, StoreError::NotFound(_)));
        assert_eq!(stock_of(&catalog, p[0].id), 5);
    }

    #[test]
    fn unconditional_change_below_zero_conflicts() {
        let (catalog, p) = seeded(&[1]);
        let change = StockChange {
            product_id: p[0].id,
            expected: ExpectedStock::Any,
            delta: -2,
        };
        assert!(matches!(
            catalog.apply_stock(&[change], Utc::now()),
            Err(StoreError::Conflict(_))
        ));
        assert_eq!(stock_of(&catalog, p[0].id), 1);
    }

    #[test]
    fn changes_to_the_same_product_chain() {
        let (catalog, p) = seeded(&[5]);
        catalog
            .apply_stock(
                &[
                    StockChange::decrement(p[0].id, 5, 2),
                    StockChange::decrement(p[0].id, 3, 3),
                ],
                Utc::now(),
            )
            .unwrap();
        assert_eq!(stock_of(&catalog, p[0].id), 0);
    }

    #[test]
    fn failed_commit_publishes_no_stock() {
        let (catalog, p) = seeded(&[5]);
        let err = catalog
            .apply_stock_with(&[StockChange::decrement(p[0].id, 5, 5)], Utc::now(), &mut || {
                Err(StoreError::Backend("disk full".into()))
            })
            .unwrap_err();

        assert_eq!(err, StoreError::Backend("disk full".into()));
        assert_eq!(stock_of(&catalog, p[0].id), 5);
    }

    #[test]
    fn commit_is_skipped_when_changes_do_not_apply() {
        let (catalog, p) = seeded(&[2]);
        let mut ran = false;
        let err = catalog
            .apply_stock_with(&[StockChange::decrement(p[0].id, 3, 1)], Utc::now(), &mut || {
                ran = true;
                Ok(())
            })
            .unwrap_err();

        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(!ran);
        assert_eq!(stock_of(&catalog, p[0].id), 2);
    }
}
