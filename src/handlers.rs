pub mod addresses;
pub mod auth;
pub mod cart_items;
pub mod carts;
pub mod categories;
pub mod coupons;
pub mod favorites;
pub mod health;
pub mod listings;
pub mod messages;
pub mod reviews;
pub mod settings;
pub mod transactions;
pub mod users;
