//! Listing validation and the stock/active coupling.
//!
//! Every listing write funnels through [`validate_listing`] and
//! [`derive_active`] so the "quantity == 0 implies inactive" rule holds no
//! matter which handler performed the save. Both are pure functions; the
//! handlers own the persistence.

use rust_decimal::Decimal;
use thiserror::Error;

/// Pre-persistence validation failures. A failed check blocks the write
/// entirely; nothing is partially saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ListingValidationError {
    #[error("Price cannot be negative")]
    PriceNegative,
    #[error("Quantity cannot be negative")]
    QuantityNegative,
    #[error("Listing must have an owner")]
    OwnerRequired,
}

impl ListingValidationError {
    /// Stable machine-readable code for the API error body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::PriceNegative => "PRICE_NEGATIVE",
            Self::QuantityNegative => "QUANTITY_NEGATIVE",
            Self::OwnerRequired => "OWNER_REQUIRED",
        }
    }
}

/// Validate listing fields before any write.
pub fn validate_listing(
    price: Decimal,
    quantity: i32,
    owner_id: Option<i32>,
) -> Result<(), ListingValidationError> {
    if price < Decimal::ZERO {
        return Err(ListingValidationError::PriceNegative);
    }
    if quantity < 0 {
        return Err(ListingValidationError::QuantityNegative);
    }
    if owner_id.is_none() {
        return Err(ListingValidationError::OwnerRequired);
    }
    Ok(())
}

/// Re-derive the `active` flag for a save.
///
/// `previous` is `(quantity, active)` of the stored row, or `None` on
/// create. `requested` is an explicit flag supplied by the caller, if any.
///
/// Rules, in order:
/// - zero stock always deactivates, whatever was requested;
/// - with stock, an explicit request wins (manual deactivation is allowed);
/// - with stock and no request, a listing that was inactive purely because
///   it had run out is re-activated by the restock;
/// - otherwise the stored flag is kept, so a manual deactivation survives
///   a restock.
///
/// Idempotent: feeding a consistent listing back through changes nothing.
pub fn derive_active(quantity: i32, previous: Option<(i32, bool)>, requested: Option<bool>) -> bool {
    if quantity == 0 {
        return false;
    }
    if let Some(flag) = requested {
        return flag;
    }
    match previous {
        // Inactive with zero stock means deactivated by stock, not by hand.
        Some((0, false)) => true,
        Some((_, was_active)) => was_active,
        None => true,
    }
}
