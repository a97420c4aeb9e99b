mod common;

use std::sync::Arc;

use anyhow::Result;
use common::{MockBackend, PASSWORD, USERNAME};
use kitchen_client::cache::{CacheKey, EntityKind};
use kitchen_client::models::{DeliveryInput, ProductInput};
use kitchen_client::screens::{DeleteOutcome, ProductFilter, ProductsScreen};
use kitchen_client::session::MemoryCredentialStore;
use kitchen_client::AppContext;
use rust_decimal::Decimal;

async fn signed_in(backend: &MockBackend) -> Result<AppContext> {
    let ctx = AppContext::new(backend.config(), Arc::new(MemoryCredentialStore::new()))?;
    ctx.login(USERNAME, PASSWORD).await?;
    Ok(ctx)
}

#[tokio::test]
async fn product_list_is_served_from_cache() -> Result<()> {
    let backend = MockBackend::start().await?;
    let ctx = signed_in(&backend).await?;
    let screen = ProductsScreen::new(&ctx);

    let first = screen.list(&ProductFilter::default()).await?;
    let second = screen.list(&ProductFilter::default()).await?;
    assert_eq!(first, second);
    assert_eq!(first[0].name, "Guruch");
    assert_eq!(backend.hits("products"), 1);

    ctx.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn deleting_missing_product_reports_detail_and_keeps_cache() -> Result<()> {
    let backend = MockBackend::start().await?;
    let ctx = signed_in(&backend).await?;
    let screen = ProductsScreen::new(&ctx);
    let filter = ProductFilter::default();
    screen.list(&filter).await?;

    let confirm = |_: &str| true;
    let notice = screen.delete_by_id(99, "Un", &confirm).await.unwrap_err();
    assert_eq!(notice.description, "Product with ID 99 not found");
    assert_eq!(notice.code.as_deref(), Some("NOT_FOUND"));

    let key = CacheKey::with_query(EntityKind::Products, &filter.to_query());
    assert_eq!(ctx.cache().is_stale(&key).await, Some(false));
    screen.list(&filter).await?;
    assert_eq!(backend.hits("products"), 1);
    assert!(ctx.session().is_authenticated().await);

    ctx.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn declined_delete_sends_nothing() -> Result<()> {
    let backend = MockBackend::start().await?;
    let ctx = signed_in(&backend).await?;
    let screen = ProductsScreen::new(&ctx);

    let decline = |_: &str| false;
    let outcome = screen.delete_by_id(1, "Guruch", &decline).await?;
    assert!(matches!(outcome, DeleteOutcome::Cancelled));
    assert_eq!(backend.hits("delete_product"), 0);

    ctx.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn created_product_invalidates_list_after_acknowledgement() -> Result<()> {
    let backend = MockBackend::start().await?;
    let ctx = signed_in(&backend).await?;
    let screen = ProductsScreen::new(&ctx);
    let filter = ProductFilter::default();
    let key = CacheKey::with_query(EntityKind::Products, &filter.to_query());
    screen.list(&filter).await?;

    // A rejected create leaves the list fresh
    let invalid = ProductInput {
        name: String::new(),
        unit_id: 1,
        min_quantity: Decimal::from(2),
    };
    let notice = screen.create(&invalid).await.unwrap_err();
    assert_eq!(notice.description, "name: field required");
    assert_eq!(ctx.cache().is_stale(&key).await, Some(false));

    let input = ProductInput {
        name: "Sabzi".to_string(),
        unit_id: 1,
        min_quantity: Decimal::from(3),
    };
    let product = screen.create(&input).await?;
    assert_eq!(product.name, "Sabzi");
    assert_eq!(ctx.cache().is_stale(&key).await, Some(true));

    screen.list(&filter).await?;
    assert_eq!(backend.hits("products"), 2);

    ctx.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn recorded_delivery_invalidates_product_list() -> Result<()> {
    let backend = MockBackend::start().await?;
    let ctx = signed_in(&backend).await?;
    let screen = ProductsScreen::new(&ctx);
    let filter = ProductFilter::default();
    let key = CacheKey::with_query(EntityKind::Products, &filter.to_query());
    screen.list(&filter).await?;

    let input = DeliveryInput {
        product_id: 1,
        quantity: Decimal::new(255, 1),
        supplier: "Bozor".to_string(),
        price: None,
        delivery_date: None,
        notes: None,
    };
    let delivery = screen.create_delivery(&input).await?;
    assert_eq!(delivery.quantity, Decimal::new(255, 1));
    assert_eq!(backend.hits("create_delivery"), 1);
    assert_eq!(ctx.cache().is_stale(&key).await, Some(true));

    screen.list(&filter).await?;
    assert_eq!(backend.hits("products"), 2);

    ctx.shutdown().await;
    Ok(())
}
