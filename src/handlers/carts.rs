use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use model::entities::{cart, cart_item, prelude::{Cart, CartItem, Listing}};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, SqlErr};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::handlers::cart_items::CartItemResponse;
use crate::policy::{self, Action, Resource};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};

/// Cart response model with its line items and running total
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CartResponse {
    pub id: i32,
    pub buyer_id: i32,
    pub items: Vec<CartItemResponse>,
    /// Sum of item quantity times current listing price
    pub total: Decimal,
    pub created: DateTime<Utc>,
}

fn cart_not_found() -> ApiError {
    ApiError::not_found("CART_NOT_FOUND", "Cart does not exist")
}

/// Assemble a cart body: line items joined with their listings for pricing.
async fn load_cart_response(state: &AppState, cart: cart::Model) -> Result<CartResponse, ApiError> {
    let items = CartItem::find()
        .filter(cart_item::Column::CartId.eq(cart.id))
        .find_also_related(Listing)
        .all(&state.db)
        .await?;

    let total: Decimal = items
        .iter()
        .filter_map(|(item, listing)| {
            listing.as_ref().map(|found| found.price * Decimal::from(item.quantity))
        })
        .sum();

    Ok(CartResponse {
        id: cart.id,
        buyer_id: cart.buyer_id,
        items: items.into_iter().map(|(item, _)| CartItemResponse::from(item)).collect(),
        total,
        created: cart.created,
    })
}

/// Get the authenticated user's cart
#[utoipa::path(
    get,
    path = "/api/cart",
    tag = "carts",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Cart retrieved successfully", body = ApiResponse<CartResponse>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Cart not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn get_cart(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<CartResponse>>, ApiError> {
    trace!("Entering get_cart function for user {}", user.id);

    let cart = Cart::find()
        .filter(cart::Column::BuyerId.eq(user.id))
        .one(&state.db)
        .await?
        .ok_or_else(cart_not_found)?;

    debug!("Cart {} belongs to user {}", cart.id, user.id);
    let response = ApiResponse {
        data: load_cart_response(&state, cart).await?,
        message: "Cart retrieved successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Create a cart for the authenticated user
///
/// Every user already gets a cart at registration, so this normally answers
/// 409. It exists for completeness and for accounts restored by hand.
#[utoipa::path(
    post,
    path = "/api/cart",
    tag = "carts",
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Cart created successfully", body = ApiResponse<CartResponse>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 409, description = "User already has a cart", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn create_cart(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<(StatusCode, Json<ApiResponse<CartResponse>>), ApiError> {
    trace!("Entering create_cart function for user {}", user.id);

    let duplicate_cart =
        || ApiError::conflict("DUPLICATE_CART", "User already has a cart");

    if Cart::find()
        .filter(cart::Column::BuyerId.eq(user.id))
        .one(&state.db)
        .await?
        .is_some()
    {
        return Err(duplicate_cart());
    }

    // The unique buyer index backs this up under races.
    let created = cart::ActiveModel {
        buyer_id: Set(user.id),
        created: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(|err| match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => duplicate_cart(),
        _ => ApiError::from(err),
    })?;

    info!("Cart {} created for user {}", created.id, user.id);
    let response = ApiResponse {
        data: load_cart_response(&state, created).await?,
        message: "Cart created successfully".to_string(),
        success: true,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Get a specific cart by ID
#[utoipa::path(
    get,
    path = "/api/cart/{cart_id}",
    tag = "carts",
    security(("bearer_auth" = [])),
    params(
        ("cart_id" = i32, Path, description = "Cart ID"),
    ),
    responses(
        (status = 200, description = "Cart retrieved successfully", body = ApiResponse<CartResponse>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Cart belongs to another user", body = ErrorResponse),
        (status = 404, description = "Cart not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn get_cart_by_id(
    Path(cart_id): Path<i32>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<CartResponse>>, ApiError> {
    trace!("Entering get_cart_by_id function for cart {}", cart_id);

    let cart = Cart::find_by_id(cart_id)
        .one(&state.db)
        .await?
        .ok_or_else(cart_not_found)?;

    policy::authorize((&user).into(), Action::Read, Resource::Cart { buyer_id: cart.buyer_id })?;

    let response = ApiResponse {
        data: load_cart_response(&state, cart).await?,
        message: "Cart retrieved successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Delete a cart
///
/// Always denied: carts live and die with their user.
#[utoipa::path(
    delete,
    path = "/api/cart/{cart_id}",
    tag = "carts",
    security(("bearer_auth" = [])),
    params(
        ("cart_id" = i32, Path, description = "Cart ID"),
    ),
    responses(
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Carts cannot be deleted", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn delete_cart(
    Path(cart_id): Path<i32>,
    State(_state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode, ApiError> {
    trace!("Entering delete_cart function for cart {}", cart_id);

    // Denied before any lookup; the rule does not depend on the row.
    warn!("User {} attempted to delete cart {}", user.id, cart_id);
    policy::authorize((&user).into(), Action::Delete, Resource::Cart { buyer_id: user.id })?;
    Ok(StatusCode::NO_CONTENT)
}
