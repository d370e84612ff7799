//! Domain models for order intake.

pub mod order;

pub use order::{CreateOrderResponse, NewOrder, NewOrderRequest, Order, OrderItemInput, OrderItemRow};
