use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::auth::UserSummary;
use super::meals::MealSummary;
use super::products::ProductSummary;

/// Monthly kitchen report. Every figure in here, including the
/// suspicious flags, is computed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReport {
    pub id: i64,
    pub report_month: NaiveDate,
    pub total_portions_served_overall: i64,
    pub is_overall_suspicious: bool,
    #[serde(with = "super::timestamp")]
    pub generated_at: NaiveDateTime,
    #[serde(default)]
    pub generated_by_user: Option<UserSummary>,
    #[serde(default)]
    pub meal_performance_summaries: Vec<MealPerformanceSummary>,
    #[serde(default)]
    pub all_ingredient_usage_details: Vec<IngredientUsageDetail>,
    #[serde(default)]
    pub product_balance_summaries: Vec<ProductBalanceSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPerformanceSummary {
    pub id: i64,
    pub meal_id: i64,
    pub portions_served_this_meal: i64,
    pub possible_portions_at_report_time: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub difference_percentage: Decimal,
    pub is_suspicious: bool,
    #[serde(default)]
    pub meal: Option<MealSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientUsageDetail {
    pub id: i64,
    pub meal_id: i64,
    pub product_id: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_quantity_used: Decimal,
    #[serde(default)]
    pub meal_for_ingredient_detail: Option<MealSummary>,
    #[serde(default)]
    pub product_for_ingredient_detail: Option<ProductSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductBalanceSummary {
    pub id: i64,
    pub product_id: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub initial_stock: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_received: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_available: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub calculated_consumption: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub actual_consumption: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub theoretical_ending_stock: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub actual_ending_stock: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub discrepancy: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub discrepancy_percentage: Decimal,
    pub is_balance_suspicious: bool,
    #[serde(default)]
    pub product_in_balance: Option<ProductSummary>,
}

impl MonthlyReport {
    /// Meal name for a performance line, looked up through the ingredient
    /// usage details when the summary itself has no embedded meal.
    pub fn meal_name(&self, meal_id: i64) -> Option<&str> {
        self.meal_performance_summaries
            .iter()
            .find(|m| m.meal_id == meal_id)
            .and_then(|m| m.meal.as_ref())
            .or_else(|| {
                self.all_ingredient_usage_details
                    .iter()
                    .find(|d| d.meal_id == meal_id)
                    .and_then(|d| d.meal_for_ingredient_detail.as_ref())
            })
            .map(|m| m.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientConsumption {
    pub product_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_consumed: Decimal,
    pub unit_short_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryTrend {
    pub delivery_date: NaiveDate,
    pub product_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_delivered: Decimal,
    pub unit_short_name: String,
}
