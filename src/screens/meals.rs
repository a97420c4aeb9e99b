use crate::api::{Page, Query};
use crate::cache::{CacheKey, EntityKind};
use crate::context::AppContext;
use crate::models::{Meal, MealInput};
use crate::notice::{Notice, Operation};

use super::{delete_prompt, load, mutate, Confirm, DeleteOutcome};

const MEALS: &str = "/api/meals/";

#[derive(Debug, Clone, Default)]
pub struct MealFilter {
    pub name: Option<String>,
    pub active_only: Option<bool>,
    pub page: Page,
}

impl MealFilter {
    pub fn to_query(&self) -> Query {
        Query::new()
            .page(self.page)
            .push_opt("active_only", self.active_only)
            .push_opt("name_filter", self.name.as_deref())
    }
}

pub struct MealsScreen<'a> {
    ctx: &'a AppContext,
}

impl<'a> MealsScreen<'a> {
    pub fn new(ctx: &'a AppContext) -> Self {
        Self { ctx }
    }

    pub async fn list(&self, filter: &MealFilter) -> Result<Vec<Meal>, Notice> {
        let query = filter.to_query();
        let key = CacheKey::with_query(EntityKind::Meals, &query);
        load(self.ctx, key, MEALS.to_string(), query).await
    }

    pub async fn detail(&self, selected: Option<i64>) -> Result<Option<Meal>, Notice> {
        let Some(id) = selected else {
            return Ok(None);
        };
        load(self.ctx, detail_key(id), format!("{}{}", MEALS, id), Query::new())
            .await
            .map(Some)
    }

    /// A new recipe changes what can be served
    pub async fn create(&self, input: &MealInput) -> Result<Meal, Notice> {
        let request = self.ctx.api().post::<_, Meal>(MEALS, input);
        mutate(
            self.ctx,
            Operation::CreateMeal,
            request,
            &[EntityKind::Meals.into(), EntityKind::AvailableMeals.into()],
        )
        .await
    }

    pub async fn update(&self, id: i64, input: &MealInput) -> Result<Meal, Notice> {
        let path = format!("{}{}", MEALS, id);
        let request = self.ctx.api().put::<_, Meal>(&path, input);
        mutate(
            self.ctx,
            Operation::UpdateMeal,
            request,
            &[EntityKind::Meals.into(), detail_key(id), EntityKind::AvailableMeals.into()],
        )
        .await
    }

    pub async fn delete(&self, meal: &Meal, confirm: &dyn Confirm) -> Result<DeleteOutcome<Meal>, Notice> {
        self.delete_by_id(meal.id, &meal.name, confirm).await
    }

    pub async fn delete_by_id(&self, id: i64, label: &str, confirm: &dyn Confirm) -> Result<DeleteOutcome<Meal>, Notice> {
        if !confirm.confirm(&delete_prompt(self.ctx.locale(), label)) {
            return Ok(DeleteOutcome::Cancelled);
        }
        let path = format!("{}{}", MEALS, id);
        let request = self.ctx.api().delete::<Meal>(&path);
        mutate(
            self.ctx,
            Operation::DeleteMeal,
            request,
            &[EntityKind::Meals.into(), detail_key(id), EntityKind::AvailableMeals.into()],
        )
        .await
        .map(DeleteOutcome::Deleted)
    }
}

fn detail_key(id: i64) -> CacheKey {
    CacheKey::new(EntityKind::MealDetails).param("id", id)
}
