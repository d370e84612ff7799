//! Order intake route handlers.
//!
//! A single entry point dispatches on method, then runs the create pipeline:
//! bearer extraction, identity verification, body validation, order insert,
//! line-item insert, and the privileged totals call. Each step's failure
//! terminates the request with its own status and message; there are no
//! retries and no compensating rollbacks (an order whose items fail to
//! insert stays persisted, by contract).

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::instrument;

use crate::error::AppError;
use crate::models::{
    CreateOrderResponse, NewOrder, NewOrderRequest, OrderItemInput, OrderItemRow,
};
use crate::state::AppState;
use crate::supabase::TotalRow;

/// Headers a browser may send on the cross-origin preflight.
const CORS_ALLOWED_HEADERS: &str = "authorization, x-client-info, apikey, content-type";
const CORS_ALLOWED_METHODS: &str = "POST, OPTIONS";

/// Entry point for `/orders`: preflight, create, or reject.
pub async fn handle(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if method == Method::OPTIONS {
        preflight()
    } else if method == Method::POST {
        match create(&state, &headers, &body).await {
            Ok(response) => response,
            Err(err) => err.into_response(),
        }
    } else {
        AppError::MethodNotAllowed.into_response()
    }
}

/// Answer the CORS preflight without touching the body.
fn preflight() -> Response {
    let headers = [
        (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        (header::ACCESS_CONTROL_ALLOW_HEADERS, CORS_ALLOWED_HEADERS),
        (header::ACCESS_CONTROL_ALLOW_METHODS, CORS_ALLOWED_METHODS),
    ];
    (StatusCode::OK, headers, "ok").into_response()
}

/// Run the create-order pipeline.
#[instrument(skip_all)]
async fn create(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<Response, AppError> {
    let access_token = bearer_token(headers).ok_or(AppError::MissingBearer)?;

    // Acts as the caller: both inserts below go through this handle so
    // row-level security applies to them.
    let store = state.user_store(access_token).map_err(AppError::InvalidToken)?;
    let user = store.current_user().await.map_err(AppError::InvalidToken)?;

    let request = parse_request(body)?;

    // profile_id comes from the verified token, never from the body.
    let order = store
        .insert_order(&NewOrder {
            profile_id: user.id,
            recipient_name: request.recipient_name,
            shipping_address: request.shipping_address,
        })
        .await
        .map_err(AppError::OrderInsert)?;

    let rows: Vec<OrderItemRow> = request
        .items
        .into_iter()
        .map(|item| OrderItemRow {
            order_id: order.id,
            item_id: item.item_id,
            quantity: item.quantity,
        })
        .collect();
    store
        .insert_order_items(&rows)
        .await
        .map_err(AppError::ItemsInsert)?;

    // The order and its items are persisted at this point; a failure below
    // surfaces with the distinct "order created, but..." message.
    let service = state.service_store().map_err(AppError::AggregateCall)?;
    let totals = service
        .other_orders_total(order.id)
        .await
        .map_err(AppError::AggregateCall)?;
    let other_orders_total = normalize_total(&totals);

    tracing::info!(order_id = %order.id, items = rows.len(), "Order created");

    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse {
            new_order: order,
            other_orders_total,
        }),
    )
        .into_response())
}

/// Extract a non-empty token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let token = headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?;

    (!token.is_empty()).then_some(token)
}

/// Parse and validate the inbound order payload.
///
/// The three validation failures are distinct on the wire: unparsable JSON,
/// missing/empty required fields, and a missing/empty items list each keep
/// their own message.
fn parse_request(body: &[u8]) -> Result<NewOrderRequest, AppError> {
    let value: serde_json::Value = serde_json::from_slice(body).map_err(AppError::InvalidJson)?;

    let recipient_name = non_empty_str(&value, "recipient_name");
    let shipping_address = non_empty_str(&value, "shipping_address");
    let (Some(recipient_name), Some(shipping_address)) = (recipient_name, shipping_address) else {
        return Err(AppError::MissingFields);
    };

    let items = match value.get("items") {
        Some(serde_json::Value::Array(items)) if !items.is_empty() => items.clone(),
        _ => return Err(AppError::EmptyItems),
    };
    let items: Vec<OrderItemInput> = serde_json::from_value(serde_json::Value::Array(items))
        .map_err(AppError::InvalidJson)?;

    Ok(NewOrderRequest {
        recipient_name: recipient_name.to_owned(),
        shipping_address: shipping_address.to_owned(),
        items,
    })
}

/// Look up a string field that is present and non-empty.
fn non_empty_str<'a>(value: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Normalize the aggregate result: the `total` of the first row, with
/// numeric strings coerced and anything absent or unusable defaulting to 0.
fn normalize_total(rows: &[TotalRow]) -> f64 {
    let Some(total) = rows.first().and_then(|row| row.total.as_ref()) else {
        return 0.0;
    };

    match total {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s.parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde_json::json;

    // =========================================================================
    // Bearer extraction
    // =========================================================================

    fn headers_with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extracts_token() {
        let headers = headers_with_auth("Bearer abc.def.ghi");
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn test_bearer_token_missing_header() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_bearer_token_wrong_scheme() {
        let headers = headers_with_auth("Basic dXNlcjpwYXNz");
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_bearer_token_empty_token() {
        let headers = headers_with_auth("Bearer ");
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_bearer_token_is_case_sensitive_about_prefix() {
        let headers = headers_with_auth("bearer abc");
        assert_eq!(bearer_token(&headers), None);
    }

    // =========================================================================
    // Payload validation
    // =========================================================================

    fn valid_body() -> serde_json::Value {
        json!({
            "recipient_name": "Ada Lovelace",
            "shipping_address": "12 Analytical Way",
            "items": [
                { "item_id": "sku-1", "quantity": 2 },
                { "item_id": "sku-2", "quantity": 1 }
            ]
        })
    }

    fn parse(value: &serde_json::Value) -> Result<NewOrderRequest, AppError> {
        parse_request(value.to_string().as_bytes())
    }

    #[test]
    fn test_parse_request_accepts_valid_payload() {
        let request = parse(&valid_body()).unwrap();
        assert_eq!(request.recipient_name, "Ada Lovelace");
        assert_eq!(request.items.len(), 2);
    }

    #[test]
    fn test_parse_request_rejects_unparsable_body() {
        let result = parse_request(b"not json at all");
        assert!(matches!(result, Err(AppError::InvalidJson(_))));
    }

    #[test]
    fn test_parse_request_rejects_missing_recipient() {
        let mut body = valid_body();
        body.as_object_mut().unwrap().remove("recipient_name");
        assert!(matches!(parse(&body), Err(AppError::MissingFields)));
    }

    #[test]
    fn test_parse_request_rejects_empty_shipping_address() {
        let mut body = valid_body();
        body["shipping_address"] = json!("");
        assert!(matches!(parse(&body), Err(AppError::MissingFields)));
    }

    #[test]
    fn test_parse_request_rejects_null_field() {
        let mut body = valid_body();
        body["recipient_name"] = json!(null);
        assert!(matches!(parse(&body), Err(AppError::MissingFields)));
    }

    #[test]
    fn test_parse_request_rejects_missing_items() {
        let mut body = valid_body();
        body.as_object_mut().unwrap().remove("items");
        assert!(matches!(parse(&body), Err(AppError::EmptyItems)));
    }

    #[test]
    fn test_parse_request_rejects_non_array_items() {
        let mut body = valid_body();
        body["items"] = json!({ "item_id": "sku-1", "quantity": 1 });
        assert!(matches!(parse(&body), Err(AppError::EmptyItems)));
    }

    #[test]
    fn test_parse_request_rejects_empty_items() {
        let mut body = valid_body();
        body["items"] = json!([]);
        assert!(matches!(parse(&body), Err(AppError::EmptyItems)));
    }

    #[test]
    fn test_parse_request_rejects_malformed_item_record() {
        let mut body = valid_body();
        body["items"] = json!([{ "item_id": "sku-1", "quantity": "two" }]);
        assert!(matches!(parse(&body), Err(AppError::InvalidJson(_))));
    }

    #[test]
    fn test_parse_request_allows_zero_and_negative_quantities() {
        let mut body = valid_body();
        body["items"] = json!([
            { "item_id": "sku-1", "quantity": 0 },
            { "item_id": "sku-2", "quantity": -3 }
        ]);
        let request = parse(&body).unwrap();
        assert_eq!(request.items.len(), 2);
    }

    #[test]
    fn test_parse_request_ignores_client_supplied_profile_id() {
        // A profile_id in the body has nowhere to go; NewOrderRequest simply
        // does not carry one.
        let mut body = valid_body();
        body["profile_id"] = json!("d2c1a9f4-8f6e-4a2b-b6d3-0a1b2c3d4e5f");
        assert!(parse(&body).is_ok());
    }

    // =========================================================================
    // Aggregate normalization
    // =========================================================================

    fn row(total: serde_json::Value) -> TotalRow {
        TotalRow { total: Some(total) }
    }

    #[test]
    fn test_normalize_total_takes_first_row_number() {
        let rows = vec![row(json!(42)), row(json!(7))];
        assert!((normalize_total(&rows) - 42.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_normalize_total_defaults_to_zero_for_no_rows() {
        assert!((normalize_total(&[]) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_normalize_total_coerces_numeric_strings() {
        let rows = vec![row(json!("42"))];
        assert!((normalize_total(&rows) - 42.0).abs() < f64::EPSILON);

        let rows = vec![row(json!("17.5"))];
        assert!((normalize_total(&rows) - 17.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_normalize_total_defaults_for_absent_or_unusable_totals() {
        let rows = vec![TotalRow { total: None }];
        assert!((normalize_total(&rows) - 0.0).abs() < f64::EPSILON);

        let rows = vec![row(json!(null))];
        assert!((normalize_total(&rows) - 0.0).abs() < f64::EPSILON);

        let rows = vec![row(json!("not-a-number"))];
        assert!((normalize_total(&rows) - 0.0).abs() < f64::EPSILON);
    }

    // =========================================================================
    // Preflight
    // =========================================================================

    #[test]
    fn test_preflight_sets_cors_headers() {
        let response = preflight();
        assert_eq!(response.status(), StatusCode::OK);

        let headers = response.headers();
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_HEADERS).unwrap(),
            CORS_ALLOWED_HEADERS
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
            CORS_ALLOWED_METHODS
        );
    }
}
