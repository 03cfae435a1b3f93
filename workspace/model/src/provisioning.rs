//! User provisioning and the settings copy-on-write scheme.
//!
//! Creating a user is an explicit use-case function, not a storage hook: one
//! transaction normalizes the email, links the shared default settings row
//! and creates the user's cart. Nothing here is reachable from a model
//! `save`, so there are no hidden side effects to reason about.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, Set, SqlErr, TransactionTrait,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::entities::prelude::*;
use crate::entities::{cart, settings, user};

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("The Email field must be set")]
    EmailRequired,
    #[error("The Password field must be set")]
    PasswordRequired,
    #[error("User with this email already exists.")]
    EmailTaken,
    #[error(transparent)]
    Db(#[from] DbErr),
}

/// Input for [`create_user`]. The password arrives pre-hashed; this crate
/// never sees plaintext credentials.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

/// Emails compare and store as trimmed lowercase.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Fetch the shared default settings row, creating it on first use.
pub async fn default_settings<C: ConnectionTrait>(db: &C) -> Result<settings::Model, DbErr> {
    if let Some(row) = Settings::find()
        .filter(settings::Column::IsDefault.eq(true))
        .one(db)
        .await?
    {
        return Ok(row);
    }

    debug!("No default settings row yet, creating one");
    settings::ActiveModel {
        dark_mode: Set(false),
        is_default: Set(true),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Create a user together with their settings link and cart, atomically.
///
/// The email uniqueness check runs inside the transaction and is backed by
/// the unique index, so a racing insert surfaces as [`ProvisionError::EmailTaken`]
/// instead of a raw database error.
pub async fn create_user(
    db: &DatabaseConnection,
    new_user: NewUser,
) -> Result<user::Model, ProvisionError> {
    let email = normalize_email(&new_user.email);
    if email.is_empty() {
        return Err(ProvisionError::EmailRequired);
    }
    if new_user.password_hash.is_empty() {
        return Err(ProvisionError::PasswordRequired);
    }

    let txn = db.begin().await?;

    if User::find()
        .filter(user::Column::Email.eq(&email))
        .one(&txn)
        .await?
        .is_some()
    {
        return Err(ProvisionError::EmailTaken);
    }

    let defaults = default_settings(&txn).await?;

    let now = Utc::now();
    let created = user::ActiveModel {
        email: Set(email.clone()),
        password_hash: Set(new_user.password_hash),
        first_name: Set(new_user.first_name),
        last_name: Set(new_user.last_name),
        is_staff: Set(new_user.is_staff),
        is_superuser: Set(new_user.is_superuser),
        settings_id: Set(defaults.id),
        created: Set(now),
        modified: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|err| match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => ProvisionError::EmailTaken,
        _ => ProvisionError::Db(err),
    })?;

    cart::ActiveModel {
        buyer_id: Set(created.id),
        created: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!("Provisioned user {} ({})", created.id, email);
    Ok(created)
}

/// Create a staff + superuser account through the same provisioning path.
pub async fn create_superuser(
    db: &DatabaseConnection,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
) -> Result<user::Model, ProvisionError> {
    create_user(
        db,
        NewUser {
            email,
            password_hash,
            first_name,
            last_name,
            is_staff: true,
            is_superuser: true,
        },
    )
    .await
}

/// Apply a settings change for one user, copy-on-write.
///
/// A row shared with any other user, and the default row in particular, is
/// never mutated: the change forks a private non-default copy and re-points
/// the user at it. Only a row owned exclusively by this user is updated in
/// place. Matching values are a no-op.
pub async fn update_settings(
    db: &DatabaseConnection,
    user: &user::Model,
    dark_mode: bool,
) -> Result<settings::Model, ProvisionError> {
    let txn = db.begin().await?;

    let current = Settings::find_by_id(user.settings_id)
        .one(&txn)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("settings row {}", user.settings_id)))?;

    if current.dark_mode == dark_mode {
        return Ok(current);
    }

    let shared_with_others = User::find()
        .filter(user::Column::SettingsId.eq(current.id))
        .filter(user::Column::Id.ne(user.id))
        .count(&txn)
        .await?
        > 0;

    let row = if current.is_default || shared_with_others {
        debug!(
            "Settings row {} is shared, forking a private copy for user {}",
            current.id, user.id
        );
        let forked = settings::ActiveModel {
            dark_mode: Set(dark_mode),
            is_default: Set(false),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut owner = user.clone().into_active_model();
        owner.settings_id = Set(forked.id);
        owner.modified = Set(Utc::now());
        owner.update(&txn).await?;

        forked
    } else {
        let mut own = current.into_active_model();
        own.dark_mode = Set(dark_mode);
        own.update(&txn).await?
    };

    txn.commit().await?;
    Ok(row)
}
