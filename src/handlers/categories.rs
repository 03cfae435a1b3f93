use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use model::entities::{category, prelude::Category};
use sea_orm::{ActiveModelTrait, EntityTrait, ModelTrait, Set, SqlErr};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};

/// Request structure for creating a new category
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateCategoryRequest {
    /// The name of the category (must be unique)
    pub name: String,
    /// Optional description of what the category is for
    pub description: Option<String>,
}

/// Request structure for updating an existing category
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct UpdateCategoryRequest {
    /// The name of the category (must be unique)
    pub name: Option<String>,
    /// Optional description of what the category is for
    pub description: Option<String>,
}

/// Response structure for category operations
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponse {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
}

impl From<category::Model> for CategoryResponse {
    fn from(model: category::Model) -> Self {
        Self { id: model.id, name: model.name, description: model.description }
    }
}

fn category_not_found() -> ApiError {
    ApiError::not_found("CATEGORY_NOT_FOUND", "Category does not exist")
}

fn duplicate_category() -> ApiError {
    ApiError::conflict("DUPLICATE_CATEGORY", "Category with this name already exists")
}

/// Get all categories
#[utoipa::path(
    get,
    path = "/api/categories",
    tag = "categories",
    responses(
        (status = 200, description = "Categories retrieved successfully", body = ApiResponse<Vec<CategoryResponse>>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn get_categories(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CategoryResponse>>>, ApiError> {
    trace!("Entering get_categories function");

    let categories = Category::find().all(&state.db).await?;
    debug!("Retrieved {} categories from database", categories.len());

    let response = ApiResponse {
        data: categories.into_iter().map(CategoryResponse::from).collect::<Vec<_>>(),
        message: "Categories retrieved successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Create a new category
#[utoipa::path(
    post,
    path = "/api/categories",
    tag = "categories",
    security(("bearer_auth" = [])),
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created successfully", body = ApiResponse<CategoryResponse>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 409, description = "Category name already taken", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn create_category(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CategoryResponse>>), ApiError> {
    trace!("Entering create_category function");
    debug!("Creating category with name: {}", request.name);

    let created = category::ActiveModel {
        name: Set(request.name),
        description: Set(request.description),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(|err| match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => duplicate_category(),
        _ => ApiError::from(err),
    })?;

    info!("Category {} ({}) created by user {}", created.id, created.name, user.id);
    let response = ApiResponse {
        data: CategoryResponse::from(created),
        message: "Category created successfully".to_string(),
        success: true,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Get a specific category by ID
#[utoipa::path(
    get,
    path = "/api/categories/{category_id}",
    tag = "categories",
    params(
        ("category_id" = i32, Path, description = "Category ID"),
    ),
    responses(
        (status = 200, description = "Category retrieved successfully", body = ApiResponse<CategoryResponse>),
        (status = 404, description = "Category not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn get_category(
    Path(category_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<CategoryResponse>>, ApiError> {
    trace!("Entering get_category function for category_id: {}", category_id);

    let found = Category::find_by_id(category_id)
        .one(&state.db)
        .await?
        .ok_or_else(category_not_found)?;

    let response = ApiResponse {
        data: CategoryResponse::from(found),
        message: "Category retrieved successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Update a category
#[utoipa::path(
    put,
    path = "/api/categories/{category_id}",
    tag = "categories",
    security(("bearer_auth" = [])),
    params(
        ("category_id" = i32, Path, description = "Category ID"),
    ),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Category updated successfully", body = ApiResponse<CategoryResponse>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Category not found", body = ErrorResponse),
        (status = 409, description = "Category name already taken", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn update_category(
    Path(category_id): Path<i32>,
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Json(request): Json<UpdateCategoryRequest>,
) -> Result<Json<ApiResponse<CategoryResponse>>, ApiError> {
    trace!("Entering update_category function for category_id: {}", category_id);

    let found = Category::find_by_id(category_id)
        .one(&state.db)
        .await?
        .ok_or_else(category_not_found)?;

    let mut active: category::ActiveModel = found.into();
    if let Some(name) = request.name {
        active.name = Set(name);
    }
    if let Some(description) = request.description {
        active.description = Set(Some(description));
    }
    let updated = active.update(&state.db).await.map_err(|err| match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => duplicate_category(),
        _ => ApiError::from(err),
    })?;

    info!("Category {} updated", updated.id);
    let response = ApiResponse {
        data: CategoryResponse::from(updated),
        message: "Category updated successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Delete a category
#[utoipa::path(
    delete,
    path = "/api/categories/{category_id}",
    tag = "categories",
    security(("bearer_auth" = [])),
    params(
        ("category_id" = i32, Path, description = "Category ID"),
    ),
    responses(
        (status = 204, description = "Category deleted successfully"),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Category not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn delete_category(
    Path(category_id): Path<i32>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode, ApiError> {
    trace!("Entering delete_category function for category_id: {}", category_id);

    let found = Category::find_by_id(category_id)
        .one(&state.db)
        .await?
        .ok_or_else(category_not_found)?;

    // Listings under this category go with it (FK cascade).
    found.delete(&state.db).await?;
    warn!("Category {} deleted by user {}", category_id, user.id);
    Ok(StatusCode::NO_CONTENT)
}
