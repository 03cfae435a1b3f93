use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use model::entities::{cart, cart_item, prelude::{Cart, CartItem}};
use model::orders;
use sea_orm::{ColumnTrait, EntityTrait, ModelTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::ToSchema;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::policy::{self, Action, Resource};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};

/// Request model for adding a listing to the cart
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AddCartItemRequest {
    /// Listing to add
    pub listing_id: i32,
    /// Number of units, between 1 and the listing's stock
    pub quantity: i32,
}

/// Request model for changing a cart item's quantity
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateCartItemRequest {
    pub quantity: i32,
}

/// Cart item response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CartItemResponse {
    pub id: i32,
    pub cart_id: i32,
    pub listing_id: i32,
    pub quantity: i32,
}

impl From<cart_item::Model> for CartItemResponse {
    fn from(model: cart_item::Model) -> Self {
        Self {
            id: model.id,
            cart_id: model.cart_id,
            listing_id: model.listing_id,
            quantity: model.quantity,
        }
    }
}

fn cart_item_not_found() -> ApiError {
    ApiError::not_found("CART_ITEM_NOT_FOUND", "Cart item does not exist")
}

/// The actor's own cart. Provisioned at registration, so absence is a
/// data problem, not a user mistake.
async fn own_cart(state: &AppState, user_id: i32) -> Result<cart::Model, ApiError> {
    Cart::find()
        .filter(cart::Column::BuyerId.eq(user_id))
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("CART_NOT_FOUND", "Cart does not exist"))
}

/// Fetch an item together with its parent cart for the ownership check.
async fn find_item(
    state: &AppState,
    cart_item_id: i32,
) -> Result<(cart_item::Model, cart::Model), ApiError> {
    let item = CartItem::find_by_id(cart_item_id)
        .one(&state.db)
        .await?
        .ok_or_else(cart_item_not_found)?;
    let cart = orders::find_cart(&state.db, item.cart_id).await?;
    Ok((item, cart))
}

/// List the authenticated user's cart items
#[utoipa::path(
    get,
    path = "/api/cart-item",
    tag = "cart-items",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Cart items retrieved successfully", body = ApiResponse<Vec<CartItemResponse>>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn get_cart_items(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<Vec<CartItemResponse>>>, ApiError> {
    trace!("Entering get_cart_items function for user {}", user.id);

    let cart = own_cart(&state, user.id).await?;
    let items = CartItem::find()
        .filter(cart_item::Column::CartId.eq(cart.id))
        .all(&state.db)
        .await?;

    debug!("Cart {} holds {} items", cart.id, items.len());
    let response = ApiResponse {
        data: items.into_iter().map(CartItemResponse::from).collect(),
        message: "Cart items retrieved successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Add a listing to the authenticated user's cart
#[utoipa::path(
    post,
    path = "/api/cart-item",
    tag = "cart-items",
    security(("bearer_auth" = [])),
    request_body = AddCartItemRequest,
    responses(
        (status = 201, description = "Item added to cart successfully", body = ApiResponse<CartItemResponse>),
        (status = 400, description = "Inactive listing or quantity out of range", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Listing not found", body = ErrorResponse),
        (status = 409, description = "Listing already in cart", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn add_cart_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<AddCartItemRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CartItemResponse>>), ApiError> {
    trace!("Entering add_cart_item function for user {}", user.id);

    let cart = own_cart(&state, user.id).await?;
    policy::authorize(
        (&user).into(),
        Action::Create,
        Resource::CartItem { cart_buyer_id: cart.buyer_id },
    )?;

    let item = orders::add_item(&state.db, &cart, request.listing_id, request.quantity).await?;

    info!(
        "Listing {} x{} added to cart {} by user {}",
        item.listing_id, item.quantity, cart.id, user.id
    );
    let response = ApiResponse {
        data: CartItemResponse::from(item),
        message: "Item added to cart successfully".to_string(),
        success: true,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Get a specific cart item by ID
#[utoipa::path(
    get,
    path = "/api/cart-item/{cart_item_id}",
    tag = "cart-items",
    security(("bearer_auth" = [])),
    params(
        ("cart_item_id" = i32, Path, description = "Cart item ID"),
    ),
    responses(
        (status = 200, description = "Cart item retrieved successfully", body = ApiResponse<CartItemResponse>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Cart belongs to another user", body = ErrorResponse),
        (status = 404, description = "Cart item not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn get_cart_item(
    Path(cart_item_id): Path<i32>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<CartItemResponse>>, ApiError> {
    trace!("Entering get_cart_item function for item {}", cart_item_id);

    let (item, cart) = find_item(&state, cart_item_id).await?;
    policy::authorize(
        (&user).into(),
        Action::Read,
        Resource::CartItem { cart_buyer_id: cart.buyer_id },
    )?;

    let response = ApiResponse {
        data: CartItemResponse::from(item),
        message: "Cart item retrieved successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Change the quantity of a cart item
#[utoipa::path(
    put,
    path = "/api/cart-item/{cart_item_id}",
    tag = "cart-items",
    security(("bearer_auth" = [])),
    params(
        ("cart_item_id" = i32, Path, description = "Cart item ID"),
    ),
    request_body = UpdateCartItemRequest,
    responses(
        (status = 200, description = "Cart item updated successfully", body = ApiResponse<CartItemResponse>),
        (status = 400, description = "Inactive listing or quantity out of range", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Cart belongs to another user", body = ErrorResponse),
        (status = 404, description = "Cart item not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn update_cart_item(
    Path(cart_item_id): Path<i32>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<UpdateCartItemRequest>,
) -> Result<Json<ApiResponse<CartItemResponse>>, ApiError> {
    trace!("Entering update_cart_item function for item {}", cart_item_id);

    let (item, cart) = find_item(&state, cart_item_id).await?;
    policy::authorize(
        (&user).into(),
        Action::Update,
        Resource::CartItem { cart_buyer_id: cart.buyer_id },
    )?;

    let updated = orders::update_item_quantity(&state.db, item, request.quantity).await?;

    debug!(
        "Cart item {} now holds {} units",
        updated.id, updated.quantity
    );
    let response = ApiResponse {
        data: CartItemResponse::from(updated),
        message: "Cart item updated successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Remove an item from the cart
#[utoipa::path(
    delete,
    path = "/api/cart-item/{cart_item_id}",
    tag = "cart-items",
    security(("bearer_auth" = [])),
    params(
        ("cart_item_id" = i32, Path, description = "Cart item ID"),
    ),
    responses(
        (status = 204, description = "Cart item removed successfully"),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Cart belongs to another user", body = ErrorResponse),
        (status = 404, description = "Cart item not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn delete_cart_item(
    Path(cart_item_id): Path<i32>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode, ApiError> {
    trace!("Entering delete_cart_item function for item {}", cart_item_id);

    let (item, cart) = find_item(&state, cart_item_id).await?;
    policy::authorize(
        (&user).into(),
        Action::Delete,
        Resource::CartItem { cart_buyer_id: cart.buyer_id },
    )?;

    info!("Cart item {} removed from cart {}", item.id, cart.id);
    item.delete(&state.db).await?;
    Ok(StatusCode::NO_CONTENT)
}
