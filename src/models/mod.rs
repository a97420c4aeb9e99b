//! Typed wire records for the kitchen inventory REST API

pub mod audit;
pub mod auth;
pub mod meals;
pub mod notifications;
pub mod products;
pub mod reports;
pub mod timestamp;

pub use audit::AuditLog;
pub use auth::{LoginRequest, LoginResponse, Role, RoleInput, RoleTag, User, UserInput, UserSummary, UserUpdate};
pub use meals::{
    AvailableMeal, IngredientInput, Meal, MealIngredient, MealInput, MealServing, MealSummary, ServingDetail,
    ServingInput, UnitSummary,
};
pub use notifications::{Notification, NotificationType};
pub use products::{DeliveryInput, Product, ProductDelivery, ProductInput, ProductSummary, Unit, UnitInput};
pub use reports::{
    DeliveryTrend, IngredientConsumption, IngredientUsageDetail, MealPerformanceSummary, MonthlyReport,
    ProductBalanceSummary,
};

use serde::{Deserialize, Serialize};

/// `{"message": ...}` acknowledgement returned by action endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerMessage {
    #[serde(default)]
    pub message: String,
}
