use serde::{Deserialize, Serialize};
use std::fmt;

use crate::api::Query;

/// Cacheable resource families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Products,
    ProductDetails,
    Units,
    Deliveries,
    Meals,
    MealDetails,
    AvailableMeals,
    Servings,
    Users,
    UserDetails,
    CurrentUser,
    Roles,
    Notifications,
    AuditLogs,
    MonthlyReports,
    MonthlyReportDetails,
    IngredientConsumption,
    DeliveryTrends,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Products => "products",
            EntityKind::ProductDetails => "product-details",
            EntityKind::Units => "units",
            EntityKind::Deliveries => "deliveries",
            EntityKind::Meals => "meals",
            EntityKind::MealDetails => "meal-details",
            EntityKind::AvailableMeals => "available-meals",
            EntityKind::Servings => "servings",
            EntityKind::Users => "users",
            EntityKind::UserDetails => "user-details",
            EntityKind::CurrentUser => "current-user",
            EntityKind::Roles => "roles",
            EntityKind::Notifications => "notifications",
            EntityKind::AuditLogs => "audit-logs",
            EntityKind::MonthlyReports => "monthly-reports",
            EntityKind::MonthlyReportDetails => "monthly-report-details",
            EntityKind::IngredientConsumption => "ingredient-consumption",
            EntityKind::DeliveryTrends => "delivery-trends",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity kind plus the ordered filter parameters of one query.
///
/// A key with fewer parameters acts as a prefix: invalidating
/// `products` reaches every filtered products list, while invalidating
/// `product-details[id=3]` reaches only that record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: EntityKind,
    pub params: Vec<(String, String)>,
}

impl CacheKey {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            params: Vec::new(),
        }
    }

    pub fn with_query(kind: EntityKind, query: &Query) -> Self {
        Self {
            kind,
            params: query.pairs().to_vec(),
        }
    }

    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    /// Whether `prefix` selects this key
    pub fn matches(&self, prefix: &CacheKey) -> bool {
        self.kind == prefix.kind && self.params.starts_with(&prefix.params)
    }
}

impl From<EntityKind> for CacheKey {
    fn from(kind: EntityKind) -> Self {
        CacheKey::new(kind)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.params.is_empty() {
            let params: Vec<String> = self.params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            write!(f, "[{}]", params.join(","))?;
        }
        Ok(())
    }
}
