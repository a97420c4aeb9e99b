use chrono::{NaiveDate, Utc};
use serde::Serialize;

use crate::context::AppContext;
use crate::models::{DeliveryTrend, IngredientConsumption, Notification, Product};
use crate::navigation::Capability;
use crate::notice::Notice;

use super::notifications::NotificationFilter;
use super::products::ProductFilter;
use super::{DateRange, NotificationsScreen, ProductsScreen, ReportsScreen};

/// Unread notifications shown on the dashboard
pub const UNREAD_PREVIEW: u32 = 5;
/// Chart window in days
pub const TREND_DAYS: i64 = 30;

#[derive(Debug, Clone, Serialize)]
pub struct StockOverview {
    pub total_products: usize,
    /// Products the backend reports at or below their minimum
    pub low_stock: Vec<Product>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    /// Hidden for cooks
    pub stock: Option<StockOverview>,
    pub unread_notifications: Vec<Notification>,
    pub consumption: Option<Vec<IngredientConsumption>>,
    pub delivery_trends: Option<Vec<DeliveryTrend>>,
}

pub struct DashboardScreen<'a> {
    ctx: &'a AppContext,
}

impl<'a> DashboardScreen<'a> {
    pub fn new(ctx: &'a AppContext) -> Self {
        Self { ctx }
    }

    pub async fn load(&self) -> Result<Dashboard, Notice> {
        self.load_for(Utc::now().date_naive()).await
    }

    pub async fn load_for(&self, today: NaiveDate) -> Result<Dashboard, Notice> {
        let notifications = NotificationsScreen::new(self.ctx);
        let unread_notifications = notifications.list(&NotificationFilter::unread(UNREAD_PREVIEW)).await?;

        if !self.ctx.can(Capability::ViewStockOverview).await {
            return Ok(Dashboard {
                stock: None,
                unread_notifications,
                consumption: None,
                delivery_trends: None,
            });
        }

        let products = ProductsScreen::new(self.ctx);
        let reports = ReportsScreen::new(self.ctx);
        let range = DateRange::last_days(today, TREND_DAYS);
        let all_filter = ProductFilter::default();
        let low_stock_filter = ProductFilter::low_stock();

        let (all, low_stock, consumption, delivery_trends) = tokio::try_join!(
            products.list(&all_filter),
            products.list(&low_stock_filter),
            reports.ingredient_consumption(range),
            reports.delivery_trends(range),
        )?;

        Ok(Dashboard {
            stock: Some(StockOverview {
                total_products: all.len(),
                low_stock,
            }),
            unread_notifications,
            consumption: Some(consumption),
            delivery_trends: Some(delivery_trends),
        })
    }
}
