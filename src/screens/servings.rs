use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

use crate::api::{Page, Query};
use crate::cache::{CacheKey, EntityKind};
use crate::context::AppContext;
use crate::models::{AvailableMeal, MealServing, ServerMessage, ServingInput};
use crate::navigation::Capability;
use crate::notice::{Notice, Operation};

use super::{load, mutate};

const AVAILABLE: &str = "/api/meals/available-for-serving";
const RECALCULATE: &str = "/api/meals/recalculate-possible-portions/";
const SERVINGS: &str = "/api/servings/";

#[derive(Debug, Clone)]
pub struct ServingFilter {
    pub meal_id: Option<i64>,
    pub user_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page: Page,
}

impl Default for ServingFilter {
    fn default() -> Self {
        Self {
            meal_id: None,
            user_id: None,
            start_date: None,
            end_date: None,
            page: Page::first(50),
        }
    }
}

impl ServingFilter {
    pub fn to_query(&self) -> Query {
        Query::new()
            .page(self.page)
            .push_opt("meal_id", self.meal_id)
            .push_opt("user_id", self.user_id)
            .push_opt("start_date", self.start_date.map(|d| d.format("%Y-%m-%d").to_string()))
            .push_opt("end_date", self.end_date.map(|d| d.format("%Y-%m-%d").to_string()))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServeOutcome {
    pub serving: MealServing,
    /// Whether the follow-up portion recalculation ran and succeeded
    pub recalculated: bool,
}

pub struct ServingsScreen<'a> {
    ctx: &'a AppContext,
}

impl<'a> ServingsScreen<'a> {
    pub fn new(ctx: &'a AppContext) -> Self {
        Self { ctx }
    }

    pub async fn available(&self) -> Result<Vec<AvailableMeal>, Notice> {
        load(
            self.ctx,
            EntityKind::AvailableMeals.into(),
            AVAILABLE.to_string(),
            Query::new(),
        )
        .await
    }

    /// Serving history; `None` for roles that do not see it
    pub async fn history(&self, filter: &ServingFilter) -> Result<Option<Vec<MealServing>>, Notice> {
        if !self.ctx.can(Capability::ViewServingHistory).await {
            return Ok(None);
        }
        let query = filter.to_query();
        let key = CacheKey::with_query(EntityKind::Servings, &query);
        load(self.ctx, key, SERVINGS.to_string(), query).await.map(Some)
    }

    pub async fn detail(&self, selected: Option<i64>) -> Result<Option<MealServing>, Notice> {
        let Some(id) = selected else {
            return Ok(None);
        };
        let key = CacheKey::new(EntityKind::Servings).param("id", id);
        load(self.ctx, key, format!("{}{}", SERVINGS, id), Query::new())
            .await
            .map(Some)
    }

    /// Record a serving. Staff roles also trigger a portion recalculation;
    /// a failure there is logged and does not fail the serving.
    pub async fn serve(&self, input: &ServingInput) -> Result<ServeOutcome, Notice> {
        let request = self.ctx.api().post::<_, MealServing>(SERVINGS, input);
        let serving = mutate(
            self.ctx,
            Operation::ServeMeal,
            request,
            &[
                EntityKind::AvailableMeals.into(),
                EntityKind::Servings.into(),
                EntityKind::Products.into(),
                EntityKind::Meals.into(),
            ],
        )
        .await?;

        let mut recalculated = false;
        if self.ctx.can(Capability::RecalculatePortions).await {
            match self.ctx.api().post_query::<ServerMessage>(RECALCULATE, &Query::new()).await {
                Ok(_) => {
                    self.ctx.cache().invalidate(&EntityKind::AvailableMeals.into()).await;
                    recalculated = true;
                }
                Err(e) => warn!("portion recalculation after serving failed: {}", e),
            }
        }

        Ok(ServeOutcome { serving, recalculated })
    }

    pub async fn recalculate(&self) -> Result<ServerMessage, Notice> {
        let empty = Query::new();
        let request = self.ctx.api().post_query::<ServerMessage>(RECALCULATE, &empty);
        mutate(
            self.ctx,
            Operation::RecalculatePortions,
            request,
            &[EntityKind::AvailableMeals.into()],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serving_filter_dates() {
        let filter = ServingFilter {
            meal_id: Some(4),
            start_date: NaiveDate::from_ymd_opt(2024, 5, 1),
            ..ServingFilter::default()
        };
        let query = filter.to_query();
        let pairs = query.pairs();
        assert_eq!(pairs[1], ("limit".to_string(), "50".to_string()));
        assert!(pairs.contains(&("meal_id".to_string(), "4".to_string())));
        assert!(pairs.contains(&("start_date".to_string(), "2024-05-01".to_string())));
        assert!(!pairs.iter().any(|(k, _)| k == "end_date"));
    }
}
