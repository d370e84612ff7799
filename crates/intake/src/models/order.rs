//! Order records as the store persists them, plus the inbound request and
//! outbound response shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted order row, as returned by the store after insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Store-assigned identifier
    pub id: Uuid,
    /// Owning principal; always the verified caller, never client-supplied
    pub profile_id: Uuid,
    pub recipient_name: String,
    pub shipping_address: String,
    /// Store-assigned timestamps
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Order header insert payload.
///
/// `profile_id` is filled in from the verified principal by the handler;
/// there is deliberately no way to carry one in from the request body.
#[derive(Debug, Serialize)]
pub struct NewOrder {
    pub profile_id: Uuid,
    pub recipient_name: String,
    pub shipping_address: String,
}

/// Line-item insert payload, stamped with the freshly created order id.
#[derive(Debug, Serialize)]
pub struct OrderItemRow {
    pub order_id: Uuid,
    pub item_id: String,
    /// Caller-supplied quantity, passed through unmodified. Kept as a raw
    /// JSON number so integers stay integers on the wire; zero and negative
    /// values are accepted as-is.
    pub quantity: serde_json::Number,
}

/// One line of the inbound order payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemInput {
    pub item_id: String,
    pub quantity: serde_json::Number,
}

/// A fully validated create-order request.
#[derive(Debug, Clone)]
pub struct NewOrderRequest {
    pub recipient_name: String,
    pub shipping_address: String,
    /// Non-empty by construction
    pub items: Vec<OrderItemInput>,
}

/// Success response body for a created order.
#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    #[serde(rename = "newOrder")]
    pub new_order: Order,
    #[serde(rename = "otherOrdersTotal")]
    pub other_orders_total: f64,
}
