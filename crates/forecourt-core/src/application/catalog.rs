use std::sync::Arc;

use uuid::Uuid;

use forecourt_types::domain::product::{Product, ProductDraft};
use forecourt_types::ports::gateway::ProductGateway;

use crate::errors::AppError;

/// Product catalog operations. Drafts are validated here; a draft that fails
/// its preconditions never reaches the gateway.
pub struct CatalogService<G> {
    gateway: Arc<G>,
    low_stock_threshold: u32,
}

impl<G: ProductGateway> CatalogService<G> {
    pub fn new(gateway: Arc<G>, low_stock_threshold: u32) -> Self {
        Self {
            gateway,
            low_stock_threshold,
        }
    }

    fn check(draft: &ProductDraft) -> Result<(), AppError> {
        let issues = draft.issues();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(issues.join("; ")))
        }
    }

    pub async fn list(&self) -> Result<Vec<Product>, AppError> {
        Ok(self.gateway.fetch_products().await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Product, AppError> {
        Ok(self.gateway.fetch_product_by_id(id).await?)
    }

    pub async fn create(&self, draft: ProductDraft) -> Result<Product, AppError> {
        Self::check(&draft)?;
        Ok(self.gateway.create_product(draft).await?)
    }

    pub async fn update(&self, id: Uuid, draft: ProductDraft) -> Result<Product, AppError> {
        Self::check(&draft)?;
        Ok(self.gateway.update_product(id, draft).await?)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        Ok(self.gateway.delete_product(id).await?)
    }

    pub async fn set_stock(&self, id: Uuid, quantity: u32) -> Result<(), AppError> {
        Ok(self.gateway.update_stock(id, quantity).await?)
    }

    /// Products below the given threshold, falling back to the configured
    /// console default.
    pub async fn low_stock(&self, threshold: Option<u32>) -> Result<Vec<Product>, AppError> {
        let threshold = threshold.unwrap_or(self.low_stock_threshold);
        Ok(self.gateway.fetch_low_stock(threshold).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forecourt_gateway::memory::MemoryGateway;
    use forecourt_types::domain::product::ProductCategory;

    fn service() -> CatalogService<MemoryGateway> {
        CatalogService::new(Arc::new(MemoryGateway::new()), 10)
    }

    fn draft(name: &str, stock: u32) -> ProductDraft {
        ProductDraft {
            name: name.into(),
            category: ProductCategory::Fuel,
            price_cents: 6550,
            stock_quantity: stock,
            unit: "liters".into(),
            is_active: true,
            low_stock_threshold: None,
        }
    }

    #[tokio::test]
    async fn invalid_draft_never_reaches_the_gateway() {
        let svc = service();
        let mut bad = draft("ab", 10);
        bad.price_cents = -5;
        let err = svc.create(bad).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(svc.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn low_stock_uses_console_default_threshold() {
        let svc = service();
        svc.create(draft("Premium Diesel", 9)).await.unwrap();
        svc.create(draft("Regular Unleaded", 10)).await.unwrap();

        let low = svc.low_stock(None).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].name, "Premium Diesel");

        let stricter = svc.low_stock(Some(5)).await.unwrap();
        assert!(stricter.is_empty());
    }

    #[tokio::test]
    async fn create_update_delete_round_trip() {
        let svc = service();
        let created = svc.create(draft("Premium Diesel", 50)).await.unwrap();

        let mut renamed = draft("Premium Diesel Euro5", 50);
        renamed.price_cents = 7000;
        let updated = svc.update(created.id, renamed).await.unwrap();
        assert_eq!(updated.name, "Premium Diesel Euro5");

        svc.set_stock(created.id, 3).await.unwrap();
        assert_eq!(svc.get(created.id).await.unwrap().stock_quantity, 3);

        svc.delete(created.id).await.unwrap();
        assert!(matches!(
            svc.get(created.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
