use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use model::catalog;
use model::entities::{listing, prelude::{Category, Listing}};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, ModelTrait, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::policy::{self, Action, Resource};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};

/// Request body for creating a listing
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateListingRequest {
    /// Listing title
    pub title: String,
    /// Listing description
    pub description: String,
    /// Optional image URL
    pub image: Option<String>,
    /// Unit price
    pub price: Decimal,
    /// Units in stock
    pub quantity: i32,
    /// Category ID
    pub category_id: Option<i32>,
    /// Explicit visibility; omitted means derived from stock
    pub active: Option<bool>,
}

/// Request body for updating a listing
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct UpdateListingRequest {
    /// Listing title
    pub title: Option<String>,
    /// Listing description
    pub description: Option<String>,
    /// Optional image URL
    pub image: Option<String>,
    /// Unit price
    pub price: Option<Decimal>,
    /// Units in stock
    pub quantity: Option<i32>,
    /// Category ID
    pub category_id: Option<i32>,
    /// Explicit visibility; omitted means derived from stock
    pub active: Option<bool>,
}

/// Listing response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListingResponse {
    pub id: i32,
    pub owner_id: i32,
    pub category_id: Option<i32>,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
    pub active: bool,
    pub out_of_stock: bool,
    pub created_at: DateTime<Utc>,
}

impl From<listing::Model> for ListingResponse {
    fn from(model: listing::Model) -> Self {
        Self {
            id: model.id,
            owner_id: model.owner_id,
            category_id: model.category_id,
            out_of_stock: model.is_out_of_stock(),
            title: model.title,
            description: model.description,
            image: model.image,
            price: model.price,
            quantity: model.quantity,
            active: model.active,
            created_at: model.created_at,
        }
    }
}

fn listing_not_found() -> ApiError {
    ApiError::not_found("LISTING_NOT_FOUND", "Listing does not exist")
}

/// Reject references to categories that do not exist before they reach the
/// foreign key.
async fn check_category(state: &AppState, category_id: i32) -> Result<(), ApiError> {
    match Category::find_by_id(category_id).one(&state.db).await? {
        Some(_) => Ok(()),
        None => {
            warn!("Category {} not found", category_id);
            Err(ApiError::validation(
                "INVALID_CATEGORY_ID",
                format!("Category with ID {} does not exist", category_id),
            ))
        }
    }
}

/// Get all listings
#[utoipa::path(
    get,
    path = "/api/listings",
    tag = "listings",
    responses(
        (status = 200, description = "Listings retrieved successfully", body = ApiResponse<Vec<ListingResponse>>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn get_listings(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ListingResponse>>>, ApiError> {
    trace!("Entering get_listings function");

    let listings = Listing::find().all(&state.db).await?;
    debug!("Retrieved {} listings from database", listings.len());

    let response = ApiResponse {
        data: listings.into_iter().map(ListingResponse::from).collect::<Vec<_>>(),
        message: "Listings retrieved successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Create a new listing
///
/// The listing is validated before anything is written: a negative price or
/// quantity blocks the insert entirely. The `active` flag is derived from
/// stock unless the request pins it.
#[utoipa::path(
    post,
    path = "/api/listings",
    tag = "listings",
    security(("bearer_auth" = [])),
    request_body = CreateListingRequest,
    responses(
        (status = 201, description = "Listing created successfully", body = ApiResponse<ListingResponse>),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn create_listing(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CreateListingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ListingResponse>>), ApiError> {
    trace!("Entering create_listing function");

    catalog::validate_listing(request.price, request.quantity, Some(user.id))?;
    if let Some(category_id) = request.category_id {
        check_category(&state, category_id).await?;
    }

    let active = catalog::derive_active(request.quantity, None, request.active);
    let created = listing::ActiveModel {
        owner_id: Set(user.id),
        category_id: Set(request.category_id),
        title: Set(request.title),
        description: Set(request.description),
        image: Set(request.image),
        price: Set(request.price),
        quantity: Set(request.quantity),
        active: Set(active),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("Listing {} created by user {}", created.id, user.id);
    let response = ApiResponse {
        data: ListingResponse::from(created),
        message: "Listing created successfully".to_string(),
        success: true,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Get a specific listing by ID
#[utoipa::path(
    get,
    path = "/api/listings/{listing_id}",
    tag = "listings",
    params(
        ("listing_id" = i32, Path, description = "Listing ID"),
    ),
    responses(
        (status = 200, description = "Listing retrieved successfully", body = ApiResponse<ListingResponse>),
        (status = 404, description = "Listing not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn get_listing(
    Path(listing_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ListingResponse>>, ApiError> {
    trace!("Entering get_listing function for listing_id: {}", listing_id);

    let found = Listing::find_by_id(listing_id)
        .one(&state.db)
        .await?
        .ok_or_else(listing_not_found)?;

    let response = ApiResponse {
        data: ListingResponse::from(found),
        message: "Listing retrieved successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Update a listing
///
/// Validation runs against the merged state, so dropping the quantity to
/// zero deactivates the listing and restocking re-activates it unless it
/// was switched off by hand. Serves both PUT and PATCH.
#[utoipa::path(
    put,
    path = "/api/listings/{listing_id}",
    tag = "listings",
    security(("bearer_auth" = [])),
    params(
        ("listing_id" = i32, Path, description = "Listing ID"),
    ),
    request_body = UpdateListingRequest,
    responses(
        (status = 200, description = "Listing updated successfully", body = ApiResponse<ListingResponse>),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Listing not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn update_listing(
    Path(listing_id): Path<i32>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<UpdateListingRequest>,
) -> Result<Json<ApiResponse<ListingResponse>>, ApiError> {
    trace!("Entering update_listing function for listing_id: {}", listing_id);

    let found = Listing::find_by_id(listing_id)
        .one(&state.db)
        .await?
        .ok_or_else(listing_not_found)?;

    policy::authorize((&user).into(), Action::Update, Resource::Listing)?;

    let price = request.price.unwrap_or(found.price);
    let quantity = request.quantity.unwrap_or(found.quantity);
    catalog::validate_listing(price, quantity, Some(found.owner_id))?;
    if let Some(category_id) = request.category_id {
        check_category(&state, category_id).await?;
    }

    let active =
        catalog::derive_active(quantity, Some((found.quantity, found.active)), request.active);
    debug!(
        "Listing {} active flag: {} -> {} (quantity {} -> {})",
        found.id, found.active, active, found.quantity, quantity
    );

    let mut active_model: listing::ActiveModel = found.into();
    if let Some(title) = request.title {
        active_model.title = Set(title);
    }
    if let Some(description) = request.description {
        active_model.description = Set(description);
    }
    if let Some(image) = request.image {
        active_model.image = Set(Some(image));
    }
    if let Some(category_id) = request.category_id {
        active_model.category_id = Set(Some(category_id));
    }
    active_model.price = Set(price);
    active_model.quantity = Set(quantity);
    active_model.active = Set(active);
    let updated = active_model.update(&state.db).await?;

    info!("Listing {} updated by user {}", updated.id, user.id);
    let response = ApiResponse {
        data: ListingResponse::from(updated),
        message: "Listing updated successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Delete a listing
#[utoipa::path(
    delete,
    path = "/api/listings/{listing_id}",
    tag = "listings",
    security(("bearer_auth" = [])),
    params(
        ("listing_id" = i32, Path, description = "Listing ID"),
    ),
    responses(
        (status = 204, description = "Listing deleted successfully"),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Listing not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn delete_listing(
    Path(listing_id): Path<i32>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode, ApiError> {
    trace!("Entering delete_listing function for listing_id: {}", listing_id);

    let found = Listing::find_by_id(listing_id)
        .one(&state.db)
        .await?
        .ok_or_else(listing_not_found)?;

    policy::authorize((&user).into(), Action::Delete, Resource::Listing)?;

    found.delete(&state.db).await?;
    warn!("Listing {} deleted by user {}", listing_id, user.id);
    Ok(StatusCode::NO_CONTENT)
}
