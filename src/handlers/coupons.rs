use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use model::entities::{coupon, prelude::Coupon};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, ModelTrait, Set, SqlErr};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, trace, warn};
use utoipa::ToSchema;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::policy::{self, Action, Resource};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};

/// Request body for creating a new coupon
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateCouponRequest {
    /// Redemption code, unique across all coupons
    pub code: String,
    /// Discount amount
    pub discount: Decimal,
    /// Whether the coupon can be redeemed (default: true)
    pub active: Option<bool>,
}

/// Request body for updating a coupon
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateCouponRequest {
    pub code: Option<String>,
    pub discount: Option<Decimal>,
    pub active: Option<bool>,
}

/// Coupon response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CouponResponse {
    pub id: i32,
    pub code: String,
    pub discount: Decimal,
    pub active: bool,
}

impl From<coupon::Model> for CouponResponse {
    fn from(model: coupon::Model) -> Self {
        Self {
            id: model.id,
            code: model.code,
            discount: model.discount,
            active: model.active,
        }
    }
}

fn coupon_not_found() -> ApiError {
    ApiError::not_found("COUPON_NOT_FOUND", "Coupon does not exist")
}

fn duplicate_coupon() -> ApiError {
    ApiError::conflict("DUPLICATE_COUPON", "Coupon with this code already exists")
}

/// Get all coupons
#[utoipa::path(
    get,
    path = "/api/coupons",
    tag = "coupons",
    responses(
        (status = 200, description = "Coupons retrieved successfully", body = ApiResponse<Vec<CouponResponse>>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_coupons(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CouponResponse>>>, ApiError> {
    trace!("Entering get_coupons function");

    let coupons = Coupon::find().all(&state.db).await?;
    let response = ApiResponse {
        data: coupons.into_iter().map(CouponResponse::from).collect(),
        message: "Coupons retrieved successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Create a new coupon
///
/// Staff only.
#[utoipa::path(
    post,
    path = "/api/coupons",
    tag = "coupons",
    security(("bearer_auth" = [])),
    request_body = CreateCouponRequest,
    responses(
        (status = 201, description = "Coupon created successfully", body = ApiResponse<CouponResponse>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Staff access required", body = ErrorResponse),
        (status = 409, description = "Coupon code already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn create_coupon(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CreateCouponRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CouponResponse>>), ApiError> {
    trace!("Entering create_coupon function");

    policy::authorize((&user).into(), Action::Create, Resource::Coupon)?;

    let created = coupon::ActiveModel {
        code: Set(request.code),
        discount: Set(request.discount),
        active: Set(request.active.unwrap_or(true)),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(|err| match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => duplicate_coupon(),
        _ => ApiError::from(err),
    })?;

    info!("Coupon {} ({}) created by user {}", created.id, created.code, user.id);
    let response = ApiResponse {
        data: CouponResponse::from(created),
        message: "Coupon created successfully".to_string(),
        success: true,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Get a specific coupon by ID
#[utoipa::path(
    get,
    path = "/api/coupons/{coupon_id}",
    tag = "coupons",
    params(
        ("coupon_id" = i32, Path, description = "Coupon ID"),
    ),
    responses(
        (status = 200, description = "Coupon retrieved successfully", body = ApiResponse<CouponResponse>),
        (status = 404, description = "Coupon not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_coupon(
    Path(coupon_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<CouponResponse>>, ApiError> {
    trace!("Entering get_coupon function for coupon {}", coupon_id);

    let found = Coupon::find_by_id(coupon_id)
        .one(&state.db)
        .await?
        .ok_or_else(coupon_not_found)?;

    let response = ApiResponse {
        data: CouponResponse::from(found),
        message: "Coupon retrieved successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Update a coupon
///
/// Staff only.
#[utoipa::path(
    put,
    path = "/api/coupons/{coupon_id}",
    tag = "coupons",
    security(("bearer_auth" = [])),
    params(
        ("coupon_id" = i32, Path, description = "Coupon ID"),
    ),
    request_body = UpdateCouponRequest,
    responses(
        (status = 200, description = "Coupon updated successfully", body = ApiResponse<CouponResponse>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Staff access required", body = ErrorResponse),
        (status = 404, description = "Coupon not found", body = ErrorResponse),
        (status = 409, description = "Coupon code already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn update_coupon(
    Path(coupon_id): Path<i32>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<UpdateCouponRequest>,
) -> Result<Json<ApiResponse<CouponResponse>>, ApiError> {
    trace!("Entering update_coupon function for coupon {}", coupon_id);

    policy::authorize((&user).into(), Action::Update, Resource::Coupon)?;

    let found = Coupon::find_by_id(coupon_id)
        .one(&state.db)
        .await?
        .ok_or_else(coupon_not_found)?;

    let mut updated = found.into_active_model();
    if let Some(code) = request.code {
        updated.code = Set(code);
    }
    if let Some(discount) = request.discount {
        updated.discount = Set(discount);
    }
    if let Some(active) = request.active {
        updated.active = Set(active);
    }

    let saved = updated.update(&state.db).await.map_err(|err| match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => duplicate_coupon(),
        _ => ApiError::from(err),
    })?;

    let response = ApiResponse {
        data: CouponResponse::from(saved),
        message: "Coupon updated successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Delete a coupon
///
/// Staff only.
#[utoipa::path(
    delete,
    path = "/api/coupons/{coupon_id}",
    tag = "coupons",
    security(("bearer_auth" = [])),
    params(
        ("coupon_id" = i32, Path, description = "Coupon ID"),
    ),
    responses(
        (status = 204, description = "Coupon deleted successfully"),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Staff access required", body = ErrorResponse),
        (status = 404, description = "Coupon not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn delete_coupon(
    Path(coupon_id): Path<i32>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode, ApiError> {
    trace!("Entering delete_coupon function for coupon {}", coupon_id);

    policy::authorize((&user).into(), Action::Delete, Resource::Coupon)?;

    let found = Coupon::find_by_id(coupon_id)
        .one(&state.db)
        .await?
        .ok_or_else(coupon_not_found)?;

    warn!("Coupon {} ({}) deleted by user {}", found.id, found.code, user.id);
    found.delete(&state.db).await?;
    Ok(StatusCode::NO_CONTENT)
}
