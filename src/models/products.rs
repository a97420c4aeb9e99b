use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::auth::UserSummary;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: i64,
    pub name: String,
    pub short_name: String,
    #[serde(with = "super::timestamp")]
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub unit_id: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub min_quantity: Decimal,
    pub unit: Unit,
    /// Stock on hand as computed by the backend
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub current_quantity: Option<Decimal>,
    #[serde(with = "super::timestamp")]
    pub created_at: NaiveDateTime,
    #[serde(default, with = "super::timestamp::option")]
    pub updated_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub created_by_user: Option<UserSummary>,
}

impl Product {
    /// At or below the minimum; unknown stock is never reported as low
    pub fn is_low_stock(&self) -> bool {
        self.current_quantity
            .map(|q| q <= self.min_quantity)
            .unwrap_or(false)
    }
}

/// Embedded product reference inside meal, serving and report records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub name: String,
    pub unit_id: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub min_quantity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDelivery {
    pub id: i64,
    pub product_id: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity: Decimal,
    #[serde(with = "super::timestamp")]
    pub delivery_date: NaiveDateTime,
    pub supplier: String,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub product_unit_short_name: Option<String>,
    #[serde(default)]
    pub received_by_user: Option<UserSummary>,
    #[serde(with = "super::timestamp")]
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub unit_id: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub min_quantity: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitInput {
    pub name: String,
    pub short_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryInput {
    pub product_id: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity: Decimal,
    pub supplier: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_quantities_decode_as_decimals() {
        let product: Product = serde_json::from_value(json!({
            "id": 7,
            "name": "Guruch",
            "unit_id": 2,
            "min_quantity": 5.5,
            "unit": {"id": 2, "name": "kilogramm", "short_name": "kg", "created_at": "2024-01-01T00:00:00"},
            "current_quantity": 12,
            "created_at": "2024-01-02T09:00:00"
        }))
        .unwrap();
        assert_eq!(product.min_quantity, Decimal::new(55, 1));
        assert_eq!(product.current_quantity, Some(Decimal::from(12)));
        assert!(product.created_by_user.is_none());
    }

    #[test]
    fn test_low_stock_threshold_is_inclusive() {
        let mut product: Product = serde_json::from_value(json!({
            "id": 1,
            "name": "Sut",
            "unit_id": 3,
            "min_quantity": 10,
            "unit": {"id": 3, "name": "litr", "short_name": "l", "created_at": "2024-01-01T00:00:00"},
            "current_quantity": 10,
            "created_at": "2024-01-02T09:00:00"
        }))
        .unwrap();
        assert!(product.is_low_stock());

        product.current_quantity = Some(Decimal::from(11));
        assert!(!product.is_low_stock());

        product.current_quantity = None;
        assert!(!product.is_low_stock());
    }

    #[test]
    fn test_delivery_input_omits_unset_fields() {
        let input = DeliveryInput {
            product_id: 3,
            quantity: Decimal::new(250, 1),
            supplier: "Bozor".to_string(),
            price: None,
            delivery_date: None,
            notes: None,
        };
        let value = serde_json::to_value(&input).unwrap();
        assert_eq!(value, json!({"product_id": 3, "quantity": 25.0, "supplier": "Bozor"}));
    }
}
