use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use model::entities::{prelude::{Listing, Review}, review};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, Set, SqlErr};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::policy::{self, Action, Resource};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};

/// Request body for submitting a review
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct SubmitReviewRequest {
    /// Listing being reviewed
    pub listing_id: i32,
    /// Rating from 1 to 5
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i16,
    /// Review text
    pub comment: String,
}

/// Request body for updating a review
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateReviewRequest {
    /// Rating from 1 to 5
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i16,
    /// Review text
    pub comment: String,
}

/// Review response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReviewResponse {
    pub id: i32,
    pub user_id: i32,
    pub listing_id: i32,
    pub rating: i16,
    pub comment: String,
}

impl From<review::Model> for ReviewResponse {
    fn from(model: review::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            listing_id: model.listing_id,
            rating: model.rating,
            comment: model.comment,
        }
    }
}

fn review_not_found() -> ApiError {
    ApiError::not_found("REVIEW_NOT_FOUND", "Review does not exist")
}

fn invalid_rating() -> ApiError {
    ApiError::validation("INVALID_RATING", "Rating must be between 1 and 5")
}

/// Get all reviews
#[utoipa::path(
    get,
    path = "/api/reviews",
    tag = "reviews",
    responses(
        (status = 200, description = "Reviews retrieved successfully", body = ApiResponse<Vec<ReviewResponse>>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn get_reviews(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ReviewResponse>>>, ApiError> {
    trace!("Entering get_reviews function");

    let reviews = Review::find().all(&state.db).await?;
    debug!("Retrieved {} reviews from database", reviews.len());

    let response = ApiResponse {
        data: reviews.into_iter().map(ReviewResponse::from).collect::<Vec<_>>(),
        message: "Reviews retrieved successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Submit a review
///
/// One review per (user, listing): a second submission for the same listing
/// updates the existing review and answers 200 instead of 201. Reviewing
/// your own listing is denied.
#[utoipa::path(
    post,
    path = "/api/reviews",
    tag = "reviews",
    security(("bearer_auth" = [])),
    request_body = SubmitReviewRequest,
    responses(
        (status = 200, description = "Existing review updated", body = ApiResponse<ReviewResponse>),
        (status = 201, description = "Review created successfully", body = ApiResponse<ReviewResponse>),
        (status = 400, description = "Rating out of range", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Own listing", body = ErrorResponse),
        (status = 404, description = "Listing not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn submit_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<SubmitReviewRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReviewResponse>>), ApiError> {
    trace!("Entering submit_review function for user {}", user.id);

    if request.validate().is_err() {
        return Err(invalid_rating());
    }

    let listing = Listing::find_by_id(request.listing_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("LISTING_NOT_FOUND", "Listing does not exist"))?;

    policy::authorize(
        (&user).into(),
        Action::Create,
        Resource::NewReview { listing_owner_id: listing.owner_id },
    )?;

    let existing = Review::find()
        .filter(review::Column::UserId.eq(user.id))
        .filter(review::Column::ListingId.eq(request.listing_id))
        .one(&state.db)
        .await?;

    if let Some(found) = existing {
        debug!("Updating existing review {} in place", found.id);
        let mut active: review::ActiveModel = found.into();
        active.rating = Set(request.rating);
        active.comment = Set(request.comment);
        let updated = active.update(&state.db).await?;

        info!("Review {} updated by resubmission", updated.id);
        let response = ApiResponse {
            data: ReviewResponse::from(updated),
            message: "Review updated successfully".to_string(),
            success: true,
        };
        return Ok((StatusCode::OK, Json(response)));
    }

    let created = review::ActiveModel {
        user_id: Set(user.id),
        listing_id: Set(request.listing_id),
        rating: Set(request.rating),
        comment: Set(request.comment),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(|err| match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            ApiError::conflict("DUPLICATE_REVIEW", "Review already exists for this listing")
        }
        _ => ApiError::from(err),
    })?;

    info!("User {} reviewed listing {}", user.id, request.listing_id);
    let response = ApiResponse {
        data: ReviewResponse::from(created),
        message: "Review created successfully".to_string(),
        success: true,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Get a specific review by ID
#[utoipa::path(
    get,
    path = "/api/reviews/{review_id}",
    tag = "reviews",
    params(
        ("review_id" = i32, Path, description = "Review ID"),
    ),
    responses(
        (status = 200, description = "Review retrieved successfully", body = ApiResponse<ReviewResponse>),
        (status = 404, description = "Review not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn get_review(
    Path(review_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ReviewResponse>>, ApiError> {
    trace!("Entering get_review function for review_id: {}", review_id);

    let found = Review::find_by_id(review_id)
        .one(&state.db)
        .await?
        .ok_or_else(review_not_found)?;

    let response = ApiResponse {
        data: ReviewResponse::from(found),
        message: "Review retrieved successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Update a review
#[utoipa::path(
    put,
    path = "/api/reviews/{review_id}",
    tag = "reviews",
    security(("bearer_auth" = [])),
    params(
        ("review_id" = i32, Path, description = "Review ID"),
    ),
    request_body = UpdateReviewRequest,
    responses(
        (status = 200, description = "Review updated successfully", body = ApiResponse<ReviewResponse>),
        (status = 400, description = "Rating out of range", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Not the author", body = ErrorResponse),
        (status = 404, description = "Review not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn update_review(
    Path(review_id): Path<i32>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<UpdateReviewRequest>,
) -> Result<Json<ApiResponse<ReviewResponse>>, ApiError> {
    trace!("Entering update_review function for review_id: {}", review_id);

    if request.validate().is_err() {
        return Err(invalid_rating());
    }

    let found = Review::find_by_id(review_id)
        .one(&state.db)
        .await?
        .ok_or_else(review_not_found)?;

    let listing = Listing::find_by_id(found.listing_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("LISTING_NOT_FOUND", "Listing does not exist"))?;

    policy::authorize(
        (&user).into(),
        Action::Update,
        Resource::Review { author_id: found.user_id, listing_owner_id: listing.owner_id },
    )?;

    let mut active: review::ActiveModel = found.into();
    active.rating = Set(request.rating);
    active.comment = Set(request.comment);
    let updated = active.update(&state.db).await?;

    info!("Review {} updated", updated.id);
    let response = ApiResponse {
        data: ReviewResponse::from(updated),
        message: "Review updated successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Delete a review
#[utoipa::path(
    delete,
    path = "/api/reviews/{review_id}",
    tag = "reviews",
    security(("bearer_auth" = [])),
    params(
        ("review_id" = i32, Path, description = "Review ID"),
    ),
    responses(
        (status = 204, description = "Review deleted successfully"),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Not the author", body = ErrorResponse),
        (status = 404, description = "Review not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn delete_review(
    Path(review_id): Path<i32>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode, ApiError> {
    trace!("Entering delete_review function for review_id: {}", review_id);

    let found = Review::find_by_id(review_id)
        .one(&state.db)
        .await?
        .ok_or_else(review_not_found)?;

    let listing = Listing::find_by_id(found.listing_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("LISTING_NOT_FOUND", "Listing does not exist"))?;

    policy::authorize(
        (&user).into(),
        Action::Delete,
        Resource::Review { author_id: found.user_id, listing_owner_id: listing.owner_id },
    )?;

    found.delete(&state.db).await?;
    info!("Review {} deleted by user {}", review_id, user.id);
    Ok(StatusCode::NO_CONTENT)
}
