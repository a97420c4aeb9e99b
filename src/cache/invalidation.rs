use crate::cache::EntityKind;
use crate::channel::MessageKind;

use EntityKind::*;

const SERVING_CHANGED: &[EntityKind] = &[AvailableMeals, Servings, Products];
const STOCK_RECEIVED: &[EntityKind] = &[Products, Deliveries, AvailableMeals];
const LOW_STOCK: &[EntityKind] = &[Products, Notifications];
const PRODUCT_CHANGED: &[EntityKind] = &[Products, ProductDetails, AvailableMeals];
const MEAL_CHANGED: &[EntityKind] = &[Meals, MealDetails, AvailableMeals];
const PORTIONS_RECALCULATED: &[EntityKind] = &[AvailableMeals, Meals];
const SUSPICIOUS_REPORT: &[EntityKind] = &[MonthlyReports, Notifications];
const NOTIFICATION: &[EntityKind] = &[Notifications];
const NOTHING: &[EntityKind] = &[];

/// Entity kinds made stale by a live message.
///
/// The table is total and narrow: kinds without an entry, including
/// unrecognized ones, invalidate nothing.
pub fn affected_kinds(kind: &MessageKind) -> &'static [EntityKind] {
    match kind {
        MessageKind::MealServed | MessageKind::NewMealServed | MessageKind::StockUpdated => SERVING_CHANGED,
        MessageKind::StockItemReceived => STOCK_RECEIVED,
        MessageKind::LowStockAlert => LOW_STOCK,
        MessageKind::ProductDefinitionUpdated | MessageKind::ProductDeleted => PRODUCT_CHANGED,
        MessageKind::MealDefinitionUpdated | MessageKind::MealDeleted => MEAL_CHANGED,
        MessageKind::PossiblePortionsRecalculated => PORTIONS_RECALCULATED,
        MessageKind::SuspiciousReportAlert => SUSPICIOUS_REPORT,
        MessageKind::GeneralNotification => NOTIFICATION,
        MessageKind::ConnectionAck
        | MessageKind::Pong
        | MessageKind::ErrorMessage
        | MessageKind::TestBroadcast
        | MessageKind::Unknown(_) => NOTHING,
    }
}
