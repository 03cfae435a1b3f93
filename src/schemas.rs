use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};

use crate::auth::AuthConfig;

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Token signing and password hashing configuration
    pub auth: AuthConfig,
}

/// API response wrapper
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// HTTP status code
    pub status_code: u16,
    /// Machine-checkable error code
    pub error: String,
    /// Human-readable error message
    pub message: String,
}

/// Health check response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::refresh,
        crate::handlers::auth::logout,
        crate::handlers::users::get_users,
        crate::handlers::users::get_user,
        crate::handlers::settings::get_settings,
        crate::handlers::settings::update_settings,
        crate::handlers::addresses::get_addresses,
        crate::handlers::addresses::create_address,
        crate::handlers::addresses::get_address,
        crate::handlers::addresses::update_address,
        crate::handlers::addresses::delete_address,
        crate::handlers::categories::get_categories,
        crate::handlers::categories::create_category,
        crate::handlers::categories::get_category,
        crate::handlers::categories::update_category,
        crate::handlers::categories::delete_category,
        crate::handlers::listings::get_listings,
        crate::handlers::listings::create_listing,
        crate::handlers::listings::get_listing,
        crate::handlers::listings::update_listing,
        crate::handlers::listings::delete_listing,
        crate::handlers::favorites::get_favorites,
        crate::handlers::favorites::create_favorite,
        crate::handlers::favorites::delete_favorite,
        crate::handlers::reviews::get_reviews,
        crate::handlers::reviews::submit_review,
        crate::handlers::reviews::get_review,
        crate::handlers::reviews::update_review,
        crate::handlers::reviews::delete_review,
        crate::handlers::carts::get_cart,
        crate::handlers::carts::create_cart,
        crate::handlers::carts::get_cart_by_id,
        crate::handlers::carts::delete_cart,
        crate::handlers::cart_items::get_cart_items,
        crate::handlers::cart_items::add_cart_item,
        crate::handlers::cart_items::get_cart_item,
        crate::handlers::cart_items::update_cart_item,
        crate::handlers::cart_items::delete_cart_item,
        crate::handlers::transactions::get_transactions,
        crate::handlers::transactions::create_transaction,
        crate::handlers::transactions::get_transaction,
        crate::handlers::coupons::get_coupons,
        crate::handlers::coupons::create_coupon,
        crate::handlers::coupons::get_coupon,
        crate::handlers::coupons::update_coupon,
        crate::handlers::coupons::delete_coupon,
        crate::handlers::messages::get_messages,
        crate::handlers::messages::send_message,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            crate::handlers::auth::RegisterRequest,
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::RegisterResponse,
            crate::handlers::auth::LoginResponse,
            crate::handlers::auth::RefreshResponse,
            crate::handlers::auth::LogoutResponse,
            crate::handlers::users::UserResponse,
            ApiResponse<crate::handlers::users::UserResponse>,
            ApiResponse<Vec<crate::handlers::users::UserResponse>>,
            crate::handlers::settings::SettingsResponse,
            crate::handlers::settings::UpdateSettingsRequest,
            ApiResponse<crate::handlers::settings::SettingsResponse>,
            crate::handlers::addresses::AddressResponse,
            crate::handlers::addresses::CreateAddressRequest,
            crate::handlers::addresses::UpdateAddressRequest,
            ApiResponse<crate::handlers::addresses::AddressResponse>,
            ApiResponse<Vec<crate::handlers::addresses::AddressResponse>>,
            crate::handlers::categories::CategoryResponse,
            crate::handlers::categories::CreateCategoryRequest,
            crate::handlers::categories::UpdateCategoryRequest,
            ApiResponse<crate::handlers::categories::CategoryResponse>,
            ApiResponse<Vec<crate::handlers::categories::CategoryResponse>>,
            crate::handlers::listings::ListingResponse,
            crate::handlers::listings::CreateListingRequest,
            crate::handlers::listings::UpdateListingRequest,
            ApiResponse<crate::handlers::listings::ListingResponse>,
            ApiResponse<Vec<crate::handlers::listings::ListingResponse>>,
            crate::handlers::favorites::FavoriteResponse,
            crate::handlers::favorites::CreateFavoriteRequest,
            ApiResponse<crate::handlers::favorites::FavoriteResponse>,
            ApiResponse<Vec<crate::handlers::favorites::FavoriteResponse>>,
            crate::handlers::reviews::ReviewResponse,
            crate::handlers::reviews::SubmitReviewRequest,
            crate::handlers::reviews::UpdateReviewRequest,
            ApiResponse<crate::handlers::reviews::ReviewResponse>,
            ApiResponse<Vec<crate::handlers::reviews::ReviewResponse>>,
            crate::handlers::carts::CartResponse,
            ApiResponse<crate::handlers::carts::CartResponse>,
            crate::handlers::cart_items::CartItemResponse,
            crate::handlers::cart_items::AddCartItemRequest,
            crate::handlers::cart_items::UpdateCartItemRequest,
            ApiResponse<crate::handlers::cart_items::CartItemResponse>,
            ApiResponse<Vec<crate::handlers::cart_items::CartItemResponse>>,
            crate::handlers::transactions::TransactionResponse,
            crate::handlers::transactions::CreateTransactionRequest,
            ApiResponse<crate::handlers::transactions::TransactionResponse>,
            ApiResponse<Vec<crate::handlers::transactions::TransactionResponse>>,
            crate::handlers::coupons::CouponResponse,
            crate::handlers::coupons::CreateCouponRequest,
            crate::handlers::coupons::UpdateCouponRequest,
            ApiResponse<crate::handlers::coupons::CouponResponse>,
            ApiResponse<Vec<crate::handlers::coupons::CouponResponse>>,
            crate::handlers::messages::MessageResponse,
            crate::handlers::messages::SendMessageRequest,
            ApiResponse<crate::handlers::messages::MessageResponse>,
            ApiResponse<Vec<crate::handlers::messages::MessageResponse>>,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration, login, and token lifecycle"),
        (name = "users", description = "User directory endpoints"),
        (name = "settings", description = "Per-user settings endpoints"),
        (name = "addresses", description = "Shipping address endpoints"),
        (name = "categories", description = "Listing category endpoints"),
        (name = "listings", description = "Marketplace listing endpoints"),
        (name = "favorites", description = "Favorited listing endpoints"),
        (name = "reviews", description = "Listing review endpoints"),
        (name = "carts", description = "Shopping cart endpoints"),
        (name = "cart-items", description = "Cart line item endpoints"),
        (name = "transactions", description = "Purchase record endpoints"),
        (name = "coupons", description = "Discount coupon endpoints"),
        (name = "messages", description = "User-to-user message endpoints"),
    ),
    info(
        title = "MarketRust API",
        description = "Marketplace API - listings, carts, purchases, and reviews",
        version = "0.1.0",
        contact(
            name = "MarketRust Team",
            email = "contact@marketrust.dev"
        ),
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Registers the bearer scheme the protected paths reference
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
