use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use model::entities::{address, prelude::Address};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::ToSchema;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::policy::{self, Action, Resource};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};

/// Request body for creating an address
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateAddressRequest {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

/// Request body for updating an address
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct UpdateAddressRequest {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

/// Address response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AddressResponse {
    pub id: i32,
    pub user_id: i32,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

impl From<address::Model> for AddressResponse {
    fn from(model: address::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            street: model.street,
            city: model.city,
            state: model.state,
            zip_code: model.zip_code,
        }
    }
}

fn address_not_found() -> ApiError {
    ApiError::not_found("ADDRESS_NOT_FOUND", "Address does not exist")
}

/// Get the authenticated user's addresses
#[utoipa::path(
    get,
    path = "/api/addresses",
    tag = "addresses",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Addresses retrieved successfully", body = ApiResponse<Vec<AddressResponse>>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn get_addresses(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<Vec<AddressResponse>>>, ApiError> {
    trace!("Entering get_addresses function for user {}", user.id);

    let addresses = Address::find()
        .filter(address::Column::UserId.eq(user.id))
        .all(&state.db)
        .await?;
    debug!("Retrieved {} addresses for user {}", addresses.len(), user.id);

    let response = ApiResponse {
        data: addresses.into_iter().map(AddressResponse::from).collect::<Vec<_>>(),
        message: "Addresses retrieved successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Create an address for the authenticated user
#[utoipa::path(
    post,
    path = "/api/addresses",
    tag = "addresses",
    security(("bearer_auth" = [])),
    request_body = CreateAddressRequest,
    responses(
        (status = 201, description = "Address created successfully", body = ApiResponse<AddressResponse>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn create_address(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CreateAddressRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AddressResponse>>), ApiError> {
    trace!("Entering create_address function for user {}", user.id);

    let created = address::ActiveModel {
        user_id: Set(user.id),
        street: Set(request.street),
        city: Set(request.city),
        state: Set(request.state),
        zip_code: Set(request.zip_code),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("Address {} created for user {}", created.id, user.id);
    let response = ApiResponse {
        data: AddressResponse::from(created),
        message: "Address created successfully".to_string(),
        success: true,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Get one of the authenticated user's addresses
#[utoipa::path(
    get,
    path = "/api/addresses/{address_id}",
    tag = "addresses",
    security(("bearer_auth" = [])),
    params(
        ("address_id" = i32, Path, description = "Address ID"),
    ),
    responses(
        (status = 200, description = "Address retrieved successfully", body = ApiResponse<AddressResponse>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Address not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn get_address(
    Path(address_id): Path<i32>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<AddressResponse>>, ApiError> {
    trace!("Entering get_address function for address {}", address_id);

    // Scoped to the owner; other users' addresses read as absent.
    let found = Address::find_by_id(address_id)
        .filter(address::Column::UserId.eq(user.id))
        .one(&state.db)
        .await?
        .ok_or_else(address_not_found)?;

    let response = ApiResponse {
        data: AddressResponse::from(found),
        message: "Address retrieved successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Update one of the authenticated user's addresses
#[utoipa::path(
    put,
    path = "/api/addresses/{address_id}",
    tag = "addresses",
    security(("bearer_auth" = [])),
    params(
        ("address_id" = i32, Path, description = "Address ID"),
    ),
    request_body = UpdateAddressRequest,
    responses(
        (status = 200, description = "Address updated successfully", body = ApiResponse<AddressResponse>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Address belongs to another user", body = ErrorResponse),
        (status = 404, description = "Address not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn update_address(
    Path(address_id): Path<i32>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<UpdateAddressRequest>,
) -> Result<Json<ApiResponse<AddressResponse>>, ApiError> {
    trace!("Entering update_address function for address {}", address_id);

    let found = Address::find_by_id(address_id)
        .one(&state.db)
        .await?
        .ok_or_else(address_not_found)?;

    policy::authorize(
        (&user).into(),
        Action::Update,
        Resource::Address { owner_id: found.user_id },
    )?;

    let mut active: address::ActiveModel = found.into();
    if let Some(street) = request.street {
        active.street = Set(street);
    }
    if let Some(city) = request.city {
        active.city = Set(city);
    }
    if let Some(state_field) = request.state {
        active.state = Set(state_field);
    }
    if let Some(zip_code) = request.zip_code {
        active.zip_code = Set(zip_code);
    }
    let updated = active.update(&state.db).await?;

    info!("Address {} updated", updated.id);
    let response = ApiResponse {
        data: AddressResponse::from(updated),
        message: "Address updated successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Delete one of the authenticated user's addresses
#[utoipa::path(
    delete,
    path = "/api/addresses/{address_id}",
    tag = "addresses",
    security(("bearer_auth" = [])),
    params(
        ("address_id" = i32, Path, description = "Address ID"),
    ),
    responses(
        (status = 204, description = "Address deleted successfully"),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Address belongs to another user", body = ErrorResponse),
        (status = 404, description = "Address not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn delete_address(
    Path(address_id): Path<i32>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode, ApiError> {
    trace!("Entering delete_address function for address {}", address_id);

    let found = Address::find_by_id(address_id)
        .one(&state.db)
        .await?
        .ok_or_else(address_not_found)?;

    policy::authorize(
        (&user).into(),
        Action::Delete,
        Resource::Address { owner_id: found.user_id },
    )?;

    found.delete(&state.db).await?;
    info!("Address {} deleted by user {}", address_id, user.id);
    Ok(StatusCode::NO_CONTENT)
}
