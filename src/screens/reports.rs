use crate::api::{Page, Query};
use crate::cache::{CacheKey, EntityKind};
use crate::context::AppContext;
use crate::error::ClientError;
use crate::models::{DeliveryTrend, IngredientConsumption, MonthlyReport, ServerMessage};
use crate::navigation::Capability;
use crate::notice::{Notice, Operation};

use super::{load, mutate, DateRange};

const MONTHLY: &str = "/api/reports/monthly/";
const CONSUMPTION: &str = "/api/reports/visualization/ingredient-consumption";
const DELIVERY_TRENDS: &str = "/api/reports/visualization/product-delivery-trends";

pub struct ReportsScreen<'a> {
    ctx: &'a AppContext,
}

impl<'a> ReportsScreen<'a> {
    pub fn new(ctx: &'a AppContext) -> Self {
        Self { ctx }
    }

    /// Queue generation of a monthly report. The backend works in the
    /// background; the finished report shows up in the list later.
    pub async fn generate(&self, year: i32, month: u32) -> Result<ServerMessage, Notice> {
        if !(1..=12).contains(&month) {
            let err = ClientError::Validation {
                status: 422,
                detail: Some(format!("month must be between 1 and 12, got {}", month)),
            };
            return self.ctx.settle(Err(err), Operation::GenerateReport).await;
        }
        if !self.ctx.can(Capability::GenerateReports).await {
            let err = ClientError::Forbidden { detail: None };
            return self.ctx.settle(Err(err), Operation::GenerateReport).await;
        }

        let path = format!("{}generate", MONTHLY);
        let query = Query::new().push("year", year).push("month", month);
        let request = self.ctx.api().post_query::<ServerMessage>(&path, &query);
        mutate(
            self.ctx,
            Operation::GenerateReport,
            request,
            &[EntityKind::MonthlyReports.into()],
        )
        .await
    }

    pub async fn list(&self, page: Page) -> Result<Vec<MonthlyReport>, Notice> {
        let query = Query::new().page(page);
        let key = CacheKey::with_query(EntityKind::MonthlyReports, &query);
        load(self.ctx, key, MONTHLY.to_string(), query).await
    }

    pub async fn detail(&self, selected: Option<i64>) -> Result<Option<MonthlyReport>, Notice> {
        let Some(id) = selected else {
            return Ok(None);
        };
        let key = CacheKey::new(EntityKind::MonthlyReportDetails).param("id", id);
        load(self.ctx, key, format!("{}{}", MONTHLY, id), Query::new())
            .await
            .map(Some)
    }

    pub async fn ingredient_consumption(&self, range: DateRange) -> Result<Vec<IngredientConsumption>, Notice> {
        let query = range.to_query();
        let key = CacheKey::with_query(EntityKind::IngredientConsumption, &query);
        load(self.ctx, key, CONSUMPTION.to_string(), query).await
    }

    pub async fn delivery_trends(&self, range: DateRange) -> Result<Vec<DeliveryTrend>, Notice> {
        let query = range.to_query();
        let key = CacheKey::with_query(EntityKind::DeliveryTrends, &query);
        load(self.ctx, key, DELIVERY_TRENDS.to_string(), query).await
    }

    pub async fn refresh_charts(&self) {
        self.ctx
            .cache()
            .invalidate_kinds(&[EntityKind::IngredientConsumption, EntityKind::DeliveryTrends])
            .await;
    }

    pub async fn refresh_reports(&self) {
        self.ctx
            .cache()
            .invalidate_kinds(&[EntityKind::MonthlyReports, EntityKind::MonthlyReportDetails])
            .await;
    }
}
