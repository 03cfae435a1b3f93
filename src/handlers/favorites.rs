use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use model::entities::{favorite, prelude::{Favorite, Listing}};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, Set, SqlErr};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::ToSchema;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::policy::{self, Action, Resource};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};

/// Request body for favoriting a listing
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateFavoriteRequest {
    /// Listing to favorite
    pub listing_id: i32,
}

/// Favorite response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FavoriteResponse {
    pub id: i32,
    pub user_id: i32,
    pub listing_id: i32,
}

impl From<favorite::Model> for FavoriteResponse {
    fn from(model: favorite::Model) -> Self {
        Self { id: model.id, user_id: model.user_id, listing_id: model.listing_id }
    }
}

/// Get the authenticated user's favorites
#[utoipa::path(
    get,
    path = "/api/favorites",
    tag = "favorites",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Favorites retrieved successfully", body = ApiResponse<Vec<FavoriteResponse>>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn get_favorites(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<Vec<FavoriteResponse>>>, ApiError> {
    trace!("Entering get_favorites function for user {}", user.id);

    let favorites = Favorite::find()
        .filter(favorite::Column::UserId.eq(user.id))
        .all(&state.db)
        .await?;
    debug!("Retrieved {} favorites for user {}", favorites.len(), user.id);

    let response = ApiResponse {
        data: favorites.into_iter().map(FavoriteResponse::from).collect::<Vec<_>>(),
        message: "Favorites retrieved successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Favorite a listing
#[utoipa::path(
    post,
    path = "/api/favorites",
    tag = "favorites",
    security(("bearer_auth" = [])),
    request_body = CreateFavoriteRequest,
    responses(
        (status = 201, description = "Favorite created successfully", body = ApiResponse<FavoriteResponse>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Listing not found", body = ErrorResponse),
        (status = 409, description = "Listing already favorited", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn create_favorite(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CreateFavoriteRequest>,
) -> Result<(StatusCode, Json<ApiResponse<FavoriteResponse>>), ApiError> {
    trace!("Entering create_favorite function for user {}", user.id);

    Listing::find_by_id(request.listing_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("LISTING_NOT_FOUND", "Listing does not exist"))?;

    // The (user, listing) unique index backs this up under races.
    let created = favorite::ActiveModel {
        user_id: Set(user.id),
        listing_id: Set(request.listing_id),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(|err| match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            ApiError::conflict("DUPLICATE_FAVORITE", "Listing is already favorited")
        }
        _ => ApiError::from(err),
    })?;

    info!("User {} favorited listing {}", user.id, request.listing_id);
    let response = ApiResponse {
        data: FavoriteResponse::from(created),
        message: "Favorite created successfully".to_string(),
        success: true,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Remove a favorite
#[utoipa::path(
    delete,
    path = "/api/favorites/{favorite_id}",
    tag = "favorites",
    security(("bearer_auth" = [])),
    params(
        ("favorite_id" = i32, Path, description = "Favorite ID"),
    ),
    responses(
        (status = 204, description = "Favorite removed successfully"),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Favorite belongs to another user", body = ErrorResponse),
        (status = 404, description = "Favorite not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn delete_favorite(
    Path(favorite_id): Path<i32>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode, ApiError> {
    trace!("Entering delete_favorite function for favorite {}", favorite_id);

    let found = Favorite::find_by_id(favorite_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("FAVORITE_NOT_FOUND", "Favorite does not exist"))?;

    policy::authorize(
        (&user).into(),
        Action::Delete,
        Resource::Favorite { owner_id: found.user_id },
    )?;

    found.delete(&state.db).await?;
    info!("User {} removed favorite {}", user.id, favorite_id);
    Ok(StatusCode::NO_CONTENT)
}
