//! The cart engine: item addition, quantity updates and the validation
//! taxonomy around them.
//!
//! A cart item is a single persistent record; its existence means "in
//! cart". Quantity is always checked against the listing's live stock, and
//! stock is only validated here, never reserved. Duplicate (cart, listing)
//! pairs are refused both by an application check and by the storage
//! layer's unique index, so the concurrent add race collapses into
//! [`CartItemError::DuplicateCartItem`].

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, Set, SqlErr,
};
use thiserror::Error;
use tracing::debug;

use crate::entities::prelude::*;
use crate::entities::{cart, cart_item, listing};

#[derive(Debug, Error)]
pub enum CartItemError {
    #[error("Cart does not exist")]
    CartNotFound,
    #[error("Listing does not exist")]
    ListingNotFound,
    #[error("Listing is not active")]
    ListingInactive,
    #[error("Item already exists in cart")]
    DuplicateCartItem,
    #[error("Quantity cannot be less than 1")]
    QuantityTooSmall,
    #[error("Quantity is greater than the available quantity")]
    QuantityExceedsStock,
    #[error(transparent)]
    Db(#[from] DbErr),
}

impl CartItemError {
    /// Stable machine-readable code for the API error body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::CartNotFound => "CART_NOT_FOUND",
            Self::ListingNotFound => "LISTING_NOT_FOUND",
            Self::ListingInactive => "LISTING_INACTIVE",
            Self::DuplicateCartItem => "DUPLICATE_CART_ITEM",
            Self::QuantityTooSmall | Self::QuantityExceedsStock => "QUANTITY_OUT_OF_RANGE",
            Self::Db(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

/// Resolve a cart id, mapping absence onto [`CartItemError::CartNotFound`].
pub async fn find_cart(db: &DatabaseConnection, cart_id: i32) -> Result<cart::Model, CartItemError> {
    Cart::find_by_id(cart_id)
        .one(db)
        .await?
        .ok_or(CartItemError::CartNotFound)
}

fn check_quantity(listing: &listing::Model, quantity: i32) -> Result<(), CartItemError> {
    if quantity < 1 {
        return Err(CartItemError::QuantityTooSmall);
    }
    if quantity > listing.quantity {
        return Err(CartItemError::QuantityExceedsStock);
    }
    Ok(())
}

/// Add a listing to a cart.
///
/// The listing must exist and be active, the quantity must fall in
/// `1..=listing.quantity`, and the (cart, listing) pair must be new. The
/// duplicate check is repeated by the unique index, so a racing insert maps
/// onto [`CartItemError::DuplicateCartItem`] rather than a database error.
pub async fn add_item(
    db: &DatabaseConnection,
    cart: &cart::Model,
    listing_id: i32,
    quantity: i32,
) -> Result<cart_item::Model, CartItemError> {
    let listing = Listing::find_by_id(listing_id)
        .one(db)
        .await?
        .ok_or(CartItemError::ListingNotFound)?;
    if !listing.active {
        return Err(CartItemError::ListingInactive);
    }
    check_quantity(&listing, quantity)?;

    let already_there = CartItem::find()
        .filter(cart_item::Column::CartId.eq(cart.id))
        .filter(cart_item::Column::ListingId.eq(listing.id))
        .one(db)
        .await?
        .is_some();
    if already_there {
        return Err(CartItemError::DuplicateCartItem);
    }

    debug!(
        "Adding listing {} x{} to cart {}",
        listing.id, quantity, cart.id
    );
    cart_item::ActiveModel {
        cart_id: Set(cart.id),
        listing_id: Set(listing.id),
        quantity: Set(quantity),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|err| match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => CartItemError::DuplicateCartItem,
        _ => CartItemError::Db(err),
    })
}

/// Change the quantity of an existing cart item, re-checking the bounds
/// against the listing's current stock.
pub async fn update_item_quantity(
    db: &DatabaseConnection,
    item: cart_item::Model,
    new_quantity: i32,
) -> Result<cart_item::Model, CartItemError> {
    let listing = Listing::find_by_id(item.listing_id)
        .one(db)
        .await?
        .ok_or(CartItemError::ListingNotFound)?;
    if !listing.active {
        return Err(CartItemError::ListingInactive);
    }
    check_quantity(&listing, new_quantity)?;

    let mut updated = item.into_active_model();
    updated.quantity = Set(new_quantity);
    Ok(updated.update(db).await?)
}
