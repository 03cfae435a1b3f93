use crate::handlers::{
    addresses::{create_address, delete_address, get_address, get_addresses, update_address},
    auth::{login, logout, refresh, register},
    cart_items::{add_cart_item, delete_cart_item, get_cart_item, get_cart_items, update_cart_item},
    carts::{create_cart, delete_cart, get_cart, get_cart_by_id},
    categories::{create_category, delete_category, get_categories, get_category, update_category},
    coupons::{create_coupon, delete_coupon, get_coupon, get_coupons, update_coupon},
    favorites::{create_favorite, delete_favorite, get_favorites},
    health::health_check,
    listings::{create_listing, delete_listing, get_listing, get_listings, update_listing},
    messages::{get_messages, send_message},
    reviews::{delete_review, get_review, get_reviews, submit_review, update_review},
    settings::{get_settings, update_settings},
    transactions::{create_transaction, get_transaction, get_transactions},
    users::{get_user, get_users},
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Auth routes
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/api/refresh", post(refresh))
        .route("/api/logout", post(logout))
        // User directory routes
        .route("/api/users", get(get_users))
        .route("/api/users/:user_id", get(get_user))
        // Settings routes
        .route("/api/settings", get(get_settings))
        .route("/api/settings", put(update_settings))
        // Address CRUD routes
        .route("/api/addresses", get(get_addresses))
        .route("/api/addresses", post(create_address))
        .route("/api/addresses/:address_id", get(get_address))
        .route("/api/addresses/:address_id", put(update_address))
        .route("/api/addresses/:address_id", delete(delete_address))
        // Category CRUD routes
        .route("/api/categories", get(get_categories))
        .route("/api/categories", post(create_category))
        .route("/api/categories/:category_id", get(get_category))
        .route("/api/categories/:category_id", put(update_category))
        .route("/api/categories/:category_id", delete(delete_category))
        // Listing CRUD routes; PATCH and PUT share the merge-style handler
        .route("/api/listings", get(get_listings))
        .route("/api/listings", post(create_listing))
        .route("/api/listings/:listing_id", get(get_listing))
        .route("/api/listings/:listing_id", put(update_listing))
        .route("/api/listings/:listing_id", patch(update_listing))
        .route("/api/listings/:listing_id", delete(delete_listing))
        // Favorite routes
        .route("/api/favorites", get(get_favorites))
        .route("/api/favorites", post(create_favorite))
        .route("/api/favorites/:favorite_id", delete(delete_favorite))
        // Review routes
        .route("/api/reviews", get(get_reviews))
        .route("/api/reviews", post(submit_review))
        .route("/api/reviews/:review_id", get(get_review))
        .route("/api/reviews/:review_id", put(update_review))
        .route("/api/reviews/:review_id", delete(delete_review))
        // Cart routes
        .route("/api/cart", get(get_cart))
        .route("/api/cart", post(create_cart))
        .route("/api/cart/:cart_id", get(get_cart_by_id))
        .route("/api/cart/:cart_id", delete(delete_cart))
        // Cart item routes
        .route("/api/cart-item", get(get_cart_items))
        .route("/api/cart-item", post(add_cart_item))
        .route("/api/cart-item/:cart_item_id", get(get_cart_item))
        .route("/api/cart-item/:cart_item_id", put(update_cart_item))
        .route("/api/cart-item/:cart_item_id", delete(delete_cart_item))
        // Transaction ledger routes (append-only)
        .route("/api/transactions", get(get_transactions))
        .route("/api/transactions", post(create_transaction))
        .route("/api/transactions/:transaction_id", get(get_transaction))
        // Coupon CRUD routes
        .route("/api/coupons", get(get_coupons))
        .route("/api/coupons", post(create_coupon))
        .route("/api/coupons/:coupon_id", get(get_coupon))
        .route("/api/coupons/:coupon_id", put(update_coupon))
        .route("/api/coupons/:coupon_id", delete(delete_coupon))
        // Direct message routes
        .route("/api/messages", get(get_messages))
        .route("/api/messages", post(send_message))
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
