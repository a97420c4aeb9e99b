use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::transport::ChannelError;

/// Kinds of live message the backend pushes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageKind {
    MealServed,
    NewMealServed,
    StockUpdated,
    StockItemReceived,
    LowStockAlert,
    ProductDefinitionUpdated,
    ProductDeleted,
    MealDefinitionUpdated,
    MealDeleted,
    PossiblePortionsRecalculated,
    SuspiciousReportAlert,
    GeneralNotification,
    ConnectionAck,
    Pong,
    ErrorMessage,
    TestBroadcast,
    Unknown(String),
}

impl MessageKind {
    pub fn from_wire(value: &str) -> Self {
        match value {
            "meal_served" => MessageKind::MealServed,
            "new_meal_served" => MessageKind::NewMealServed,
            "stock_updated" => MessageKind::StockUpdated,
            "stock_item_received" => MessageKind::StockItemReceived,
            "low_stock_alert" => MessageKind::LowStockAlert,
            "product_definition_updated" => MessageKind::ProductDefinitionUpdated,
            "product_deleted" => MessageKind::ProductDeleted,
            "meal_definition_updated" => MessageKind::MealDefinitionUpdated,
            "meal_deleted" => MessageKind::MealDeleted,
            "possible_portions_recalculated" => MessageKind::PossiblePortionsRecalculated,
            "suspicious_report_alert" => MessageKind::SuspiciousReportAlert,
            "general_notification" => MessageKind::GeneralNotification,
            "connection_ack" => MessageKind::ConnectionAck,
            "pong" => MessageKind::Pong,
            "error_message" => MessageKind::ErrorMessage,
            "test_broadcast" => MessageKind::TestBroadcast,
            other => MessageKind::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MessageKind::MealServed => "meal_served",
            MessageKind::NewMealServed => "new_meal_served",
            MessageKind::StockUpdated => "stock_updated",
            MessageKind::StockItemReceived => "stock_item_received",
            MessageKind::LowStockAlert => "low_stock_alert",
            MessageKind::ProductDefinitionUpdated => "product_definition_updated",
            MessageKind::ProductDeleted => "product_deleted",
            MessageKind::MealDefinitionUpdated => "meal_definition_updated",
            MessageKind::MealDeleted => "meal_deleted",
            MessageKind::PossiblePortionsRecalculated => "possible_portions_recalculated",
            MessageKind::SuspiciousReportAlert => "suspicious_report_alert",
            MessageKind::GeneralNotification => "general_notification",
            MessageKind::ConnectionAck => "connection_ack",
            MessageKind::Pong => "pong",
            MessageKind::ErrorMessage => "error_message",
            MessageKind::TestBroadcast => "test_broadcast",
            MessageKind::Unknown(other) => other,
        }
    }

    /// Alerts worth surfacing to the operator as they arrive
    pub fn is_alert(&self) -> bool {
        matches!(
            self,
            MessageKind::LowStockAlert | MessageKind::SuspiciousReportAlert | MessageKind::GeneralNotification
        )
    }
}

impl Serialize for MessageKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MessageKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(MessageKind::from_wire(&value))
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, alias = "payload")]
    data: Value,
}

/// A parsed live message. Advisory only: screens re-read the REST API
/// rather than trusting the payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InboundMessage {
    pub kind: MessageKind,
    pub data: Value,
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    pub fn parse(text: &str) -> Result<Self, ChannelError> {
        let envelope: Envelope =
            serde_json::from_str(text).map_err(|e| ChannelError::Malformed(e.to_string()))?;
        if envelope.kind.trim().is_empty() {
            return Err(ChannelError::Malformed("empty message type".to_string()));
        }
        Ok(Self {
            kind: MessageKind::from_wire(&envelope.kind),
            data: envelope.data,
            received_at: Utc::now(),
        })
    }

    /// Human-readable line from the payload's `message` field, if any
    pub fn summary(&self) -> Option<&str> {
        self.data.get("message").and_then(Value::as_str)
    }
}
