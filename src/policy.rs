//! Request authorization, decided in one place.
//!
//! Handlers resolve the rows they need, then ask [`authorize`] whether the
//! actor may act on them. The function is pure so every rule can be tested
//! without a database or an HTTP stack.

use model::entities::user;

/// What the actor is trying to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

/// The resource being acted on, reduced to the fields the rules need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Cart { buyer_id: i32 },
    CartItem { cart_buyer_id: i32 },
    Review { author_id: i32, listing_owner_id: i32 },
    NewReview { listing_owner_id: i32 },
    Favorite { owner_id: i32 },
    Address { owner_id: i32 },
    Listing,
    Coupon,
    Message,
}

/// The acting user, reduced to what the rules need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: i32,
    pub is_staff: bool,
}

impl From<&user::Model> for Actor {
    fn from(user: &user::Model) -> Self {
        Self { id: user.id, is_staff: user.is_staff }
    }
}

/// Why a request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Denial {
    #[error("Cart does not belong to the user")]
    CartNotOwned,
    #[error("You do not have permission to perform this action.")]
    CartDeleteForbidden,
    #[error("You cannot review your own listing.")]
    OwnListing,
    #[error("You do not have permission to perform this action.")]
    NotOwner,
    #[error("You do not have permission to perform this action.")]
    StaffOnly,
}

impl Denial {
    pub fn code(&self) -> &'static str {
        match self {
            Self::CartNotOwned => "CART_NOT_OWNED",
            Self::CartDeleteForbidden => "CART_DELETE_FORBIDDEN",
            Self::OwnListing => "OWN_LISTING_REVIEW",
            Self::NotOwner => "NOT_OWNER",
            Self::StaffOnly => "STAFF_ONLY",
        }
    }
}

/// Decide whether `actor` may perform `action` on `resource`.
///
/// Rules:
/// - Carts are never deletable, by anyone. Reads are buyer-only.
/// - Cart items follow the parent cart's buyer.
/// - Reviews: never on the actor's own listing; edits and deletes are
///   author-only.
/// - Favorites and addresses: mutations are owner-only.
/// - Listings: any authenticated actor may mutate (ownership is recorded
///   but not enforced).
/// - Coupons: mutations are staff-only, reads are open.
pub fn authorize(actor: Actor, action: Action, resource: Resource) -> Result<(), Denial> {
    match resource {
        Resource::Cart { buyer_id } => match action {
            Action::Delete => Err(Denial::CartDeleteForbidden),
            Action::Read => owned_cart(actor, buyer_id),
            Action::Create | Action::Update => Ok(()),
        },
        Resource::CartItem { cart_buyer_id } => owned_cart(actor, cart_buyer_id),
        Resource::NewReview { listing_owner_id } => not_own_listing(actor, listing_owner_id),
        Resource::Review { author_id, listing_owner_id } => match action {
            Action::Update => {
                not_own_listing(actor, listing_owner_id)?;
                authored(actor, author_id)
            }
            Action::Delete => authored(actor, author_id),
            Action::Read | Action::Create => Ok(()),
        },
        Resource::Favorite { owner_id } | Resource::Address { owner_id } => match action {
            Action::Update | Action::Delete => authored(actor, owner_id),
            Action::Read | Action::Create => Ok(()),
        },
        Resource::Listing | Resource::Message => Ok(()),
        Resource::Coupon => match action {
            Action::Read => Ok(()),
            Action::Create | Action::Update | Action::Delete => staff_only(actor),
        },
    }
}

fn owned_cart(actor: Actor, buyer_id: i32) -> Result<(), Denial> {
    if actor.id == buyer_id { Ok(()) } else { Err(Denial::CartNotOwned) }
}

fn not_own_listing(actor: Actor, listing_owner_id: i32) -> Result<(), Denial> {
    if actor.id == listing_owner_id { Err(Denial::OwnListing) } else { Ok(()) }
}

fn authored(actor: Actor, owner_id: i32) -> Result<(), Denial> {
    if actor.id == owner_id { Ok(()) } else { Err(Denial::NotOwner) }
}

fn staff_only(actor: Actor) -> Result<(), Denial> {
    if actor.is_staff { Ok(()) } else { Err(Denial::StaffOnly) }
}
