use crate::handlers::common::{map_service_error, success_response, validate_input};
use crate::{errors::ApiError, services::catalog::CreateCategoryInput, AppState};
use axum::{
    extract::{Json, State},
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;
use validator::Validate;

/// Creates the router for category endpoints
pub fn categories_routes() -> Router<AppState> {
    Router::new().route("/", get(list_categories).post(create_category))
}

/// List all categories
async fn list_categories(State(state): State<AppState>) -> Result<Response, ApiError> {
    let categories = state
        .services
        .catalog
        .list_categories()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(categories))
}

/// Create a category
async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;

    let category = state
        .services
        .catalog
        .create_category(CreateCategoryInput {
            name: payload.name,
            description: payload.description,
            icon: payload.icon,
        })
        .await
        .map_err(map_service_error)?;

    Ok(success_response(category))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, message = "Category name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
}
