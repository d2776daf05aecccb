//! Product catalog (bill of materials).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::instrument;

use shopfloor_core::{Aggregate, DomainError, Page, PageRequest, TenantId};
use shopfloor_inventory::InventoryItemId;
use shopfloor_products::{
    ArchiveProduct, BomComponent, CreateProduct, Product, ProductCommand, ProductId,
    ProductSnapshot,
};

use crate::error::{ServiceError, ServiceResult};
use crate::store::ErpStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub components: Vec<BomComponent>,
    pub finished_item: Option<InventoryItemId>,
}

#[derive(Clone)]
pub struct ProductService {
    store: Arc<dyn ErpStore>,
}

impl ProductService {
    pub fn new(store: Arc<dyn ErpStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, input), fields(tenant_id = %tenant_id, sku = %input.sku))]
    pub async fn create_product(
        &self,
        tenant_id: TenantId,
        input: NewProduct,
        now: DateTime<Utc>,
    ) -> ServiceResult<ProductSnapshot> {
        self.ensure_items_exist(tenant_id, &input).await?;

        let product_id = ProductId::new();
        let mut product = Product::empty(product_id);
        product.execute(&ProductCommand::CreateProduct(CreateProduct {
            tenant_id,
            product_id,
            sku: input.sku,
            name: input.name,
            components: input.components,
            finished_item: input.finished_item,
            occurred_at: now,
        }))?;
        let snapshot = product_snapshot(&product)?;

        let mut uow = self.store.begin().await?;
        uow.insert_product(&snapshot).await?;
        uow.commit().await?;

        tracing::info!(product_id = %product_id, components = snapshot.components.len(), "product created");
        Ok(snapshot)
    }

    pub async fn get_product(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> ServiceResult<ProductSnapshot> {
        self.store
            .get_product(tenant_id, product_id)
            .await?
            .ok_or_else(|| DomainError::not_found().into())
    }

    pub async fn list_products(
        &self,
        tenant_id: TenantId,
        page: PageRequest,
    ) -> ServiceResult<Page<ProductSnapshot>> {
        Ok(self.store.list_products(tenant_id, page).await?)
    }

    /// Archived products stay readable but cannot be scheduled.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, product_id = %product_id))]
    pub async fn archive_product(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        now: DateTime<Utc>,
    ) -> ServiceResult<ProductSnapshot> {
        let mut uow = self.store.begin().await?;
        let mut product = uow
            .lock_product(tenant_id, product_id)
            .await?
            .map(Product::restore)
            .ok_or_else(DomainError::not_found)?;

        product.execute(&ProductCommand::ArchiveProduct(ArchiveProduct {
            tenant_id,
            product_id,
            occurred_at: now,
        }))?;

        let snapshot = product_snapshot(&product)?;
        uow.update_product(&snapshot).await?;
        uow.commit().await?;

        tracing::info!("product archived");
        Ok(snapshot)
    }

    async fn ensure_items_exist(&self, tenant_id: TenantId, input: &NewProduct) -> ServiceResult<()> {
        let mut ids: Vec<InventoryItemId> = input.components.iter().map(|c| c.item_id).collect();
        ids.extend(input.finished_item);
        if ids.is_empty() {
            return Ok(());
        }

        let known: Vec<InventoryItemId> = self
            .store
            .get_items(tenant_id, &ids)
            .await?
            .into_iter()
            .map(|i| i.id)
            .collect();

        if let Some(idx) = input.components.iter().position(|c| !known.contains(&c.item_id)) {
            return Err(DomainError::validation(
                format!("components[{idx}].item_id"),
                "inventory item does not exist",
            )
            .into());
        }
        if let Some(item) = input.finished_item {
            if !known.contains(&item) {
                return Err(DomainError::validation(
                    "finished_item_id",
                    "inventory item does not exist",
                )
                .into());
            }
        }
        Ok(())
    }
}

fn product_snapshot(product: &Product) -> ServiceResult<ProductSnapshot> {
    product
        .snapshot()
        .ok_or_else(|| ServiceError::internal("product has no state"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::Fixture;
    use shopfloor_products::ProductStatus;

    #[tokio::test]
    async fn create_list_and_archive() {
        let fx = Fixture::new();
        let steel = fx.item("STEEL", 0).await;
        let products = &fx.services.products;

        let id = fx.product("FRAME", &[(steel, 2)], None).await;
        fx.product("AXLE", &[], None).await;

        let page = products.list_products(fx.tenant_id, PageRequest::default()).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].sku, "AXLE");

        let archived = products.archive_product(fx.tenant_id, id, Utc::now()).await.unwrap();
        assert_eq!(archived.status, ProductStatus::Archived);
        let err = products.archive_product(fx.tenant_id, id, Utc::now()).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn unknown_component_is_reported_by_position() {
        let fx = Fixture::new();
        let steel = fx.item("STEEL", 0).await;

        let err = fx
            .services
            .products
            .create_product(
                fx.tenant_id,
                NewProduct {
                    sku: "FRAME".into(),
                    name: "Frame".into(),
                    components: vec![
                        BomComponent { item_id: steel, quantity_per_unit: 1 },
                        BomComponent { item_id: InventoryItemId::new(), quantity_per_unit: 1 },
                    ],
                    finished_item: None,
                },
                Utc::now(),
            )
            .await
            .unwrap_err();
        match err {
            ServiceError::Domain(DomainError::Validation(v)) => {
                assert_eq!(v.field, "components[1].item_id")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn items_of_other_tenants_do_not_count() {
        let fx = Fixture::new();
        let foreign = fx.other_tenant();
        let their_item = foreign.item("STEEL", 0).await;

        let err = fx
            .services
            .products
            .create_product(
                fx.tenant_id,
                NewProduct {
                    sku: "FRAME".into(),
                    name: "Frame".into(),
                    components: vec![],
                    finished_item: Some(their_item),
                },
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn duplicate_product_sku_is_conflict() {
        let fx = Fixture::new();
        fx.product("FRAME", &[], None).await;
        let err = fx
            .services
            .products
            .create_product(
                fx.tenant_id,
                NewProduct { sku: "FRAME".into(), name: "Again".into(), components: vec![], finished_item: None },
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }
}
