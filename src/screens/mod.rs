//! Screen services: the fetch, mutate and invalidate cycle of each page.
//!
//! Reads go through the shared cache. Mutations change nothing locally until
//! the server acknowledges them, then invalidate the keys they affect.
//! Every failure leaves through [`AppContext::settle`] as a [`Notice`].

pub mod dashboard;
pub mod meals;
pub mod notifications;
pub mod products;
pub mod reports;
pub mod servings;
pub mod users;

use chrono::{Duration, NaiveDate};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;

use crate::api::Query;
use crate::cache::CacheKey;
use crate::context::AppContext;
use crate::error::ClientError;
use crate::notice::{Locale, Notice, Operation};

pub use dashboard::{Dashboard, DashboardScreen, StockOverview};
pub use meals::{MealFilter, MealsScreen};
pub use notifications::{NotificationFilter, NotificationsScreen};
pub use products::{DeliveryFilter, ProductFilter, ProductsScreen};
pub use reports::ReportsScreen;
pub use servings::{ServeOutcome, ServingFilter, ServingsScreen};
pub use users::UsersScreen;

/// Asks the operator to confirm a destructive action
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F: Fn(&str) -> bool> Confirm for F {
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome<T> {
    Deleted(T),
    /// Refused at the prompt; no request was sent
    Cancelled,
}

impl<T> DeleteOutcome<T> {
    pub fn is_deleted(&self) -> bool {
        matches!(self, DeleteOutcome::Deleted(_))
    }
}

pub(crate) fn delete_prompt(locale: Locale, subject: &str) -> String {
    match locale {
        Locale::Uz => format!("Haqiqatan ham \"{}\" ni o'chirmoqchimisiz?", subject),
        Locale::En => format!("Delete \"{}\"? This cannot be undone.", subject),
    }
}

/// Inclusive calendar range for chart and history queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The `days` days ending at `today`
    pub fn last_days(today: NaiveDate, days: i64) -> Self {
        Self {
            start: today - Duration::days(days),
            end: today,
        }
    }

    pub fn to_query(&self) -> Query {
        Query::new()
            .push("start_date", self.start.format("%Y-%m-%d"))
            .push("end_date", self.end.format("%Y-%m-%d"))
    }
}

/// Cached GET keyed by entity kind and the request's own query parameters
pub(crate) async fn load<T>(ctx: &AppContext, key: CacheKey, path: String, query: Query) -> Result<T, Notice>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    let api = ctx.api().clone();
    let result = ctx
        .cache()
        .fetch(key, move || {
            let api = api.clone();
            let path = path.clone();
            let query = query.clone();
            async move { api.get::<T>(&path, &query).await }
        })
        .await;
    ctx.settle(result, Operation::LoadData).await
}

/// Run a mutation; on acknowledgement invalidate `affected`, never before
pub(crate) async fn mutate<T, Fut>(
    ctx: &AppContext,
    operation: Operation,
    request: Fut,
    affected: &[CacheKey],
) -> Result<T, Notice>
where
    Fut: Future<Output = Result<T, ClientError>>,
{
    let result = request.await;
    if result.is_ok() {
        for key in affected {
            ctx.cache().invalidate(key).await;
        }
    }
    ctx.settle(result, operation).await
}
