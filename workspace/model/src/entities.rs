//! This file serves as the root for all SeaORM entity modules.
//! We define the data models for the marketplace application here:
//! identity (users, settings, addresses), catalog (categories, listings),
//! orders (carts, cart items, transactions, coupons), social surfaces
//! (favorites, reviews, messages) and the refresh token ledger backing
//! the session lifecycle.

pub mod address;
pub mod cart;
pub mod cart_item;
pub mod category;
pub mod coupon;
pub mod favorite;
pub mod listing;
pub mod message;
pub mod refresh_token;
pub mod review;
pub mod settings;
pub mod transaction;
pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::address::Entity as Address;
    pub use super::cart::Entity as Cart;
    pub use super::cart_item::Entity as CartItem;
    pub use super::category::Entity as Category;
    pub use super::coupon::Entity as Coupon;
    pub use super::favorite::Entity as Favorite;
    pub use super::listing::Entity as Listing;
    pub use super::message::Entity as Message;
    pub use super::refresh_token::Entity as RefreshToken;
    pub use super::review::Entity as Review;
    pub use super::settings::Entity as Settings;
    pub use super::transaction::Entity as Transaction;
    pub use super::user::Entity as User;
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use migration::{Migrator, MigratorTrait};
    use rust_decimal::Decimal;
    use sea_orm::{
        ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, DbErr,
        EntityTrait, ModelTrait, QueryFilter, Set, SqlErr,
    };

    use super::*;
    use prelude::*;

    async fn setup_db() -> Result<DatabaseConnection, DbErr> {
        // Connect to the SQLite database
        let db = Database::connect("sqlite::memory:").await?;

        // Enable foreign keys
        db.execute_unprepared("PRAGMA foreign_keys = ON;").await?;

        // Try to apply migrations first
        Migrator::up(&db, None).await.expect("Migrations failed.");
        Ok(db)
    }

    async fn seed_user(db: &DatabaseConnection, email: &str) -> Result<user::Model, DbErr> {
        let defaults = settings::ActiveModel {
            dark_mode: Set(false),
            is_default: Set(true),
            ..Default::default()
        }
        .insert(db)
        .await?;

        let now = Utc::now();
        user::ActiveModel {
            email: Set(email.to_string()),
            password_hash: Set("hash".to_string()),
            first_name: Set("Test".to_string()),
            last_name: Set("User".to_string()),
            is_staff: Set(false),
            is_superuser: Set(false),
            settings_id: Set(defaults.id),
            created: Set(now),
            modified: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    async fn seed_listing(
        db: &DatabaseConnection,
        owner: &user::Model,
        title: &str,
        quantity: i32,
    ) -> Result<listing::Model, DbErr> {
        listing::ActiveModel {
            owner_id: Set(owner.id),
            category_id: Set(None),
            title: Set(title.to_string()),
            description: Set("A thing for sale".to_string()),
            image: Set(None),
            price: Set(Decimal::new(1999, 2)),
            quantity: Set(quantity),
            active: Set(quantity > 0),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    #[tokio::test]
    async fn test_entity_graph() -> Result<(), DbErr> {
        let db = setup_db().await?;

        let alice = seed_user(&db, "alice@example.com").await?;
        let bob = seed_user(&db, "bob@example.com").await?;

        let listing = seed_listing(&db, &bob, "Brass lamp", 5).await?;
        assert!(!listing.is_out_of_stock());

        let cart = cart::ActiveModel {
            buyer_id: Set(alice.id),
            created: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let item = cart_item::ActiveModel {
            cart_id: Set(cart.id),
            listing_id: Set(listing.id),
            quantity: Set(2),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        // Walk the relations back up
        let found_cart = item.find_related(Cart).one(&db).await?.unwrap();
        assert_eq!(found_cart.buyer_id, alice.id);
        let found_listing = item.find_related(Listing).one(&db).await?.unwrap();
        assert_eq!(found_listing.title, "Brass lamp");

        // Deleting the listing cascades into the cart item
        listing.delete(&db).await?;
        let remaining = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .all(&db)
            .await?;
        assert!(remaining.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_cart_item_rejected_by_storage() -> Result<(), DbErr> {
        let db = setup_db().await?;

        let buyer = seed_user(&db, "buyer@example.com").await?;
        let seller = seed_user(&db, "seller@example.com").await?;
        let listing = seed_listing(&db, &seller, "Clock", 3).await?;

        let cart = cart::ActiveModel {
            buyer_id: Set(buyer.id),
            created: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        cart_item::ActiveModel {
            cart_id: Set(cart.id),
            listing_id: Set(listing.id),
            quantity: Set(1),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        // The (cart, listing) pair is unique at the storage layer, so the
        // check-then-insert race cannot admit a duplicate row.
        let err = cart_item::ActiveModel {
            cart_id: Set(cart.id),
            listing_id: Set(listing.id),
            quantity: Set(2),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap_err();
        assert!(matches!(
            err.sql_err(),
            Some(SqlErr::UniqueConstraintViolation(_))
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_favorite_rejected_by_storage() -> Result<(), DbErr> {
        let db = setup_db().await?;

        let fan = seed_user(&db, "fan@example.com").await?;
        let seller = seed_user(&db, "shop@example.com").await?;
        let listing = seed_listing(&db, &seller, "Teapot", 1).await?;

        favorite::ActiveModel {
            user_id: Set(fan.id),
            listing_id: Set(listing.id),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let err = favorite::ActiveModel {
            user_id: Set(fan.id),
            listing_id: Set(listing.id),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap_err();
        assert!(matches!(
            err.sql_err(),
            Some(SqlErr::UniqueConstraintViolation(_))
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_settings_survive_user_delete() -> Result<(), DbErr> {
        let db = setup_db().await?;

        let user = seed_user(&db, "ephemeral@example.com").await?;
        let settings_id = user.settings_id;

        user.delete(&db).await?;

        let row = Settings::find_by_id(settings_id).one(&db).await?;
        assert!(row.is_some(), "settings row must outlive its user");

        Ok(())
    }

    #[tokio::test]
    async fn test_one_cart_per_buyer() -> Result<(), DbErr> {
        let db = setup_db().await?;

        let buyer = seed_user(&db, "single@example.com").await?;

        cart::ActiveModel {
            buyer_id: Set(buyer.id),
            created: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let err = cart::ActiveModel {
            buyer_id: Set(buyer.id),
            created: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap_err();
        assert!(matches!(
            err.sql_err(),
            Some(SqlErr::UniqueConstraintViolation(_))
        ));

        Ok(())
    }
}
