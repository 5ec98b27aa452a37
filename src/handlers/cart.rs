use crate::handlers::common::{map_service_error, success_response, validate_input};
use crate::{errors::ApiError, services::carts::AddToCartInput, AppState};
use axum::{
    extract::{Json, Path, State},
    response::Response,
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

/// Creates the router for cart endpoints
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(add_to_cart).put(update_cart))
        .route("/{user_id}", get(get_cart))
        .route("/{user_id}/{product_id}", delete(remove_from_cart))
}

/// List the user's cart items with their products
async fn get_cart(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let items = state
        .services
        .carts
        .get_cart_items(user_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(items))
}

/// Add a product to the cart, incrementing the existing row if present
async fn add_to_cart(
    State(state): State<AppState>,
    Json(payload): Json<AddToCartRequest>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;

    let item = state
        .services
        .carts
        .add_to_cart(AddToCartInput {
            user_id: payload.user_id,
            product_id: payload.product_id,
            quantity: payload.quantity,
        })
        .await
        .map_err(map_service_error)?;

    Ok(success_response(item))
}

/// Set a cart item's quantity; zero or below removes the row instead
async fn update_cart(
    State(state): State<AppState>,
    Json(payload): Json<UpdateCartRequest>,
) -> Result<Response, ApiError> {
    if payload.quantity <= 0 {
        state
            .services
            .carts
            .remove_from_cart(payload.user_id, payload.product_id)
            .await
            .map_err(map_service_error)?;

        return Ok(success_response(json!({
            "message": "Item removed from cart"
        })));
    }

    let item = state
        .services
        .carts
        .set_quantity(payload.user_id, payload.product_id, payload.quantity)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(item))
}

/// Remove a product from the cart
async fn remove_from_cart(
    State(state): State<AppState>,
    Path((user_id, product_id)): Path<(Uuid, Uuid)>,
) -> Result<Response, ApiError> {
    state
        .services
        .carts
        .remove_from_cart(user_id, product_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({
        "message": "Item removed from cart"
    })))
}

// Request DTOs

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub user_id: Uuid,
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartRequest {
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
}
