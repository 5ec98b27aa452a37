use crate::handlers::common::{
    lenient_option_i32, map_service_error, success_response, validate_input,
};
use crate::{
    errors::ApiError,
    services::catalog::{CreateProductInput, ProductFilter, UpdateProductInput},
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::Response,
    routing::get,
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

/// Creates the router for product endpoints
pub fn products_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
}

/// List products, optionally filtered by category, name search, and the
/// featured flag. Filters combine with AND.
async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> Result<Response, ApiError> {
    let products = state
        .services
        .catalog
        .list_products(ProductFilter {
            category_id: query.category_id,
            search: query.search,
            featured: query.featured,
        })
        .await
        .map_err(map_service_error)?;

    Ok(success_response(products))
}

/// Get a single product with its category
async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let product = state
        .services
        .catalog
        .get_product(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(product))
}

/// Create a product
async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;

    let product = state
        .services
        .catalog
        .create_product(CreateProductInput {
            name: payload.name,
            description: payload.description,
            price: payload.price,
            sale_price: payload.sale_price,
            category_id: payload.category_id,
            stock: payload.stock,
            featured: payload.featured,
            image_url: payload.image_url,
        })
        .await
        .map_err(map_service_error)?;

    Ok(success_response(product))
}

/// Partially update a product
async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;

    let product = state
        .services
        .catalog
        .update_product(
            id,
            UpdateProductInput {
                name: payload.name,
                description: payload.description,
                price: payload.price,
                sale_price: payload.sale_price,
                category_id: payload.category_id,
                stock: payload.stock,
                featured: payload.featured,
                image_url: payload.image_url,
            },
        )
        .await
        .map_err(map_service_error)?;

    Ok(success_response(product))
}

/// Delete a product
async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    state
        .services
        .catalog
        .delete_product(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({
        "message": "Product deleted successfully"
    })))
}

// Request DTOs

#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    #[serde(rename = "categoryId")]
    pub category_id: Option<Uuid>,
    pub search: Option<String>,
    pub featured: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(length(min = 1, message = "Product name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub sale_price: Option<Decimal>,
    pub category_id: Option<Uuid>,
    #[serde(default, deserialize_with = "lenient_option_i32")]
    pub stock: Option<i32>,
    pub featured: Option<bool>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, message = "Product name cannot be empty"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub category_id: Option<Uuid>,
    #[serde(default, deserialize_with = "lenient_option_i32")]
    pub stock: Option<i32>,
    pub featured: Option<bool>,
    pub image_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn create_request_accepts_string_price_and_stock() {
        let json = r#"{"name": "Widget", "price": "19.99", "stock": "5"}"#;
        let req: CreateProductRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.price, dec!(19.99));
        assert_eq!(req.stock, Some(5));
        assert!(req.category_id.is_none());
    }

    #[test]
    fn list_query_uses_camel_case_category_id() {
        let query: ProductListQuery = serde_json::from_str(
            r#"{"categoryId": "550e8400-e29b-41d4-a716-446655440000", "featured": true}"#,
        )
        .unwrap();
        assert!(query.category_id.is_some());
        assert_eq!(query.featured, Some(true));
        assert!(query.search.is_none());
    }
}
