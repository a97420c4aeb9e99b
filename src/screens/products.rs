use crate::api::{Page, Query};
use crate::cache::{CacheKey, EntityKind};
use crate::context::AppContext;
use crate::models::{DeliveryInput, Product, ProductDelivery, ProductInput, Unit, UnitInput};
use crate::notice::{Notice, Operation};

use super::{delete_prompt, load, mutate, Confirm, DeleteOutcome};

const PRODUCTS: &str = "/api/products/";
const UNITS: &str = "/api/products/units/";
const DELIVERIES: &str = "/api/products/deliveries/";

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub name: Option<String>,
    /// Only products at or below their minimum, as judged by the backend
    pub low_stock_only: Option<bool>,
    pub page: Page,
}

impl ProductFilter {
    pub fn low_stock() -> Self {
        Self {
            low_stock_only: Some(true),
            ..Self::default()
        }
    }

    pub fn to_query(&self) -> Query {
        Query::new()
            .page(self.page)
            .push_opt("name_filter", self.name.as_deref())
            .push_opt("low_stock_only", self.low_stock_only)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeliveryFilter {
    pub product_id: Option<i64>,
    pub page: Page,
}

impl DeliveryFilter {
    pub fn to_query(&self) -> Query {
        Query::new().page(self.page).push_opt("product_id", self.product_id)
    }
}

pub struct ProductsScreen<'a> {
    ctx: &'a AppContext,
}

impl<'a> ProductsScreen<'a> {
    pub fn new(ctx: &'a AppContext) -> Self {
        Self { ctx }
    }

    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, Notice> {
        let query = filter.to_query();
        let key = CacheKey::with_query(EntityKind::Products, &query);
        load(self.ctx, key, PRODUCTS.to_string(), query).await
    }

    /// Detail of the selected product; nothing is fetched without a selection
    pub async fn detail(&self, selected: Option<i64>) -> Result<Option<Product>, Notice> {
        let Some(id) = selected else {
            return Ok(None);
        };
        let key = detail_key(id);
        load(self.ctx, key, format!("{}{}", PRODUCTS, id), Query::new()).await.map(Some)
    }

    pub async fn create(&self, input: &ProductInput) -> Result<Product, Notice> {
        let request = self.ctx.api().post::<_, Product>(PRODUCTS, input);
        mutate(self.ctx, Operation::CreateProduct, request, &[EntityKind::Products.into()]).await
    }

    pub async fn update(&self, id: i64, input: &ProductInput) -> Result<Product, Notice> {
        let path = format!("{}{}", PRODUCTS, id);
        let request = self.ctx.api().put::<_, Product>(&path, input);
        mutate(
            self.ctx,
            Operation::UpdateProduct,
            request,
            &[EntityKind::Products.into(), detail_key(id)],
        )
        .await
    }

    /// Delete after confirmation. A refusal sends nothing; a failure
    /// invalidates nothing.
    pub async fn delete(&self, product: &Product, confirm: &dyn Confirm) -> Result<DeleteOutcome<Product>, Notice> {
        self.delete_by_id(product.id, &product.name, confirm).await
    }

    pub async fn delete_by_id(
        &self,
        id: i64,
        label: &str,
        confirm: &dyn Confirm,
    ) -> Result<DeleteOutcome<Product>, Notice> {
        if !confirm.confirm(&delete_prompt(self.ctx.locale(), label)) {
            return Ok(DeleteOutcome::Cancelled);
        }
        let path = format!("{}{}", PRODUCTS, id);
        let request = self.ctx.api().delete::<Product>(&path);
        mutate(
            self.ctx,
            Operation::DeleteProduct,
            request,
            &[EntityKind::Products.into(), detail_key(id)],
        )
        .await
        .map(DeleteOutcome::Deleted)
    }

    pub async fn units(&self) -> Result<Vec<Unit>, Notice> {
        let query = Query::new().page(Page::default());
        let key = CacheKey::with_query(EntityKind::Units, &query);
        load(self.ctx, key, UNITS.to_string(), query).await
    }

    pub async fn create_unit(&self, input: &UnitInput) -> Result<Unit, Notice> {
        let request = self.ctx.api().post::<_, Unit>(UNITS, input);
        mutate(self.ctx, Operation::CreateUnit, request, &[EntityKind::Units.into()]).await
    }

    pub async fn deliveries(&self, filter: &DeliveryFilter) -> Result<Vec<ProductDelivery>, Notice> {
        let query = filter.to_query();
        let key = CacheKey::with_query(EntityKind::Deliveries, &query);
        load(self.ctx, key, DELIVERIES.to_string(), query).await
    }

    /// Receiving stock changes quantities, so products are refreshed too
    pub async fn create_delivery(&self, input: &DeliveryInput) -> Result<ProductDelivery, Notice> {
        let request = self.ctx.api().post::<_, ProductDelivery>(DELIVERIES, input);
        mutate(
            self.ctx,
            Operation::CreateDelivery,
            request,
            &[
                EntityKind::Deliveries.into(),
                EntityKind::Products.into(),
                detail_key(input.product_id),
                EntityKind::AvailableMeals.into(),
            ],
        )
        .await
    }
}

fn detail_key(id: i64) -> CacheKey {
    CacheKey::new(EntityKind::ProductDetails).param("id", id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_query_order() {
        let filter = ProductFilter {
            name: Some("guruch".to_string()),
            low_stock_only: Some(true),
            page: Page::new(0, 50),
        };
        let query = filter.to_query();
        let pairs: Vec<(&str, &str)> = query
            .pairs()
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("skip", "0"),
                ("limit", "50"),
                ("name_filter", "guruch"),
                ("low_stock_only", "true")
            ]
        );
    }

    #[test]
    fn test_delivery_filter_without_product() {
        let query = DeliveryFilter::default().to_query();
        assert_eq!(query.pairs().len(), 2);
    }
}
