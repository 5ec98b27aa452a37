use crate::handlers::common::{map_service_error, success_response, validate_input};
use crate::{
    entities::OrderStatus,
    errors::ApiError,
    services::orders::{CreateOrderInput, OrderLineInput},
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::Response,
    routing::{get, put},
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Creates the router for order endpoints
pub fn orders_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/{id}", get(get_order))
        .route("/{id}/status", put(update_order_status))
}

/// List orders with nested line items, optionally scoped to a user
async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> Result<Response, ApiError> {
    let orders = state
        .services
        .orders
        .list_orders(query.user_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(orders))
}

/// Get a single order with nested line items
async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let order = state
        .services
        .orders
        .get_order(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(order))
}

/// Create an order together with its line items
async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;

    let order = state
        .services
        .orders
        .create_order(CreateOrderInput {
            user_id: payload.user_id,
            total: payload.total,
            status: payload.status,
            shipping_address: payload.shipping_address,
            items: payload
                .items
                .into_iter()
                .map(|item| OrderLineInput {
                    product_id: item.product_id,
                    quantity: item.quantity,
                    price: item.price,
                })
                .collect(),
        })
        .await
        .map_err(map_service_error)?;

    Ok(success_response(order))
}

/// Set an order's status
async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> Result<Response, ApiError> {
    let order = state
        .services
        .orders
        .update_status(id, payload.status)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(order))
}

// Request DTOs

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub user_id: Uuid,
    pub total: Decimal,
    pub status: Option<OrderStatus>,
    pub shipping_address: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItemRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_request_rejects_values_outside_the_set() {
        assert!(serde_json::from_str::<UpdateOrderStatusRequest>(r#"{"status": "teleported"}"#)
            .is_err());
        let req: UpdateOrderStatusRequest =
            serde_json::from_str(r#"{"status": "shipped"}"#).unwrap();
        assert_eq!(req.status, OrderStatus::Shipped);
    }

    #[test]
    fn create_request_defaults_to_no_items() {
        let json = r#"{"userId": "550e8400-e29b-41d4-a716-446655440000", "total": "10.00"}"#;
        let req: CreateOrderRequest = serde_json::from_str(json).unwrap();
        assert!(req.items.is_empty());
        assert!(req.status.is_none());
    }
}
