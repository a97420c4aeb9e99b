use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::auth::UserSummary;
use super::products::ProductSummary;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSummary {
    pub name: String,
    pub short_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealIngredient {
    pub id: i64,
    pub product_id: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity_per_portion: Decimal,
    pub unit_id: i64,
    #[serde(default)]
    pub product: Option<ProductSummary>,
    #[serde(default)]
    pub unit: Option<UnitSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub is_active: bool,
    #[serde(default)]
    pub ingredients: Vec<MealIngredient>,
    #[serde(default)]
    pub possible_portions: Option<i64>,
    #[serde(default)]
    pub created_by_user: Option<UserSummary>,
    #[serde(with = "super::timestamp")]
    pub created_at: NaiveDateTime,
    #[serde(default, with = "super::timestamp::option")]
    pub updated_at: Option<NaiveDateTime>,
}

/// Embedded meal reference in servings and reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealSummary {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub is_active: bool,
}

/// A meal together with how many portions current stock allows,
/// as computed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableMeal {
    pub meal_id: i64,
    pub meal_name: String,
    pub possible_portions: i64,
    #[serde(default)]
    pub limiting_ingredient_name: Option<String>,
    #[serde(default)]
    pub limiting_ingredient_unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServingDetail {
    pub id: i64,
    pub product_id: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity_used: Decimal,
    #[serde(default)]
    pub product: Option<ProductSummary>,
    #[serde(with = "super::timestamp")]
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealServing {
    pub id: i64,
    pub meal_id: i64,
    pub portions_served: i64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(with = "super::timestamp")]
    pub served_at: NaiveDateTime,
    #[serde(default)]
    pub meal: Option<MealSummary>,
    #[serde(default)]
    pub served_by_user: Option<UserSummary>,
    #[serde(default)]
    pub serving_details: Vec<ServingDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientInput {
    pub product_id: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity_per_portion: Decimal,
    pub unit_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub ingredients: Vec<IngredientInput>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServingInput {
    pub meal_id: i64,
    pub portions_served: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
