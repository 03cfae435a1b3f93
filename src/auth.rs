//! Token issuance and verification, password hashing, and the
//! authenticated-user extractor.
//!
//! Access tokens travel as `Authorization: Bearer` headers and live for
//! minutes; refresh tokens travel only in an http-only cookie and are
//! backed by a `refresh_tokens` row keyed by jti, so rotation and logout
//! can revoke them server-side.

use anyhow::anyhow;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use model::entities::{prelude::RefreshToken, refresh_token, user};

use crate::error::ApiError;
use crate::schemas::AppState;

pub const MISSING_CREDENTIALS: &str = "Authentication credentials were not provided.";
pub const BAD_ACCESS_TOKEN: &str = "Given token not valid for any token type";
pub const BAD_REFRESH_TOKEN: &str = "Token is invalid or expired";

/// Token signing and password hashing configuration.
#[derive(Clone)]
pub struct AuthConfig {
    secret: String,
    pub access_token_lifetime: Duration,
    pub refresh_token_lifetime: Duration,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("access_token_lifetime", &self.access_token_lifetime)
            .field("refresh_token_lifetime", &self.refresh_token_lifetime)
            .finish()
    }
}

impl AuthConfig {
    pub fn new(secret: impl Into<String>, access_secs: i64, refresh_secs: i64) -> Self {
        Self {
            secret: secret.into(),
            access_token_lifetime: Duration::seconds(access_secs),
            refresh_token_lifetime: Duration::seconds(refresh_secs),
        }
    }

    /// Read the signing configuration from the environment.
    ///
    /// `JWT_SECRET` has no safe default; a placeholder is used so local
    /// development works, with a warning.
    pub fn from_env() -> Self {
        let secret = match std::env::var("JWT_SECRET") {
            Ok(value) if !value.is_empty() => value,
            _ => {
                warn!("JWT_SECRET is not set, using an insecure development secret");
                "insecure-development-secret".to_string()
            }
        };
        Self::new(
            secret,
            env_secs("ACCESS_TOKEN_LIFETIME_SECS", 900),
            env_secs("REFRESH_TOKEN_LIFETIME_SECS", 604_800),
        )
    }

    fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(self.secret.as_bytes())
    }

    fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(self.secret.as_bytes())
    }
}

fn env_secs(name: &str, default: i64) -> i64 {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: i32,
    pub exp: i64,
    pub iat: i64,
    /// Unique token id; refresh tokens key their database row on it.
    pub jti: String,
    pub token_type: TokenType,
}

/// A freshly signed token together with its claims.
#[derive(Debug)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
    pub expires_at: DateTime<Utc>,
}

pub fn issue_token(
    config: &AuthConfig,
    user_id: i32,
    token_type: TokenType,
    now: DateTime<Utc>,
) -> Result<IssuedToken, ApiError> {
    let lifetime = match token_type {
        TokenType::Access => config.access_token_lifetime,
        TokenType::Refresh => config.refresh_token_lifetime,
    };
    let expires_at = now + lifetime;
    let claims = Claims {
        sub: user_id,
        exp: expires_at.timestamp(),
        iat: now.timestamp(),
        jti: Uuid::new_v4().to_string(),
        token_type,
    };
    let token = encode(&Header::new(Algorithm::HS256), &claims, &config.encoding_key())
        .map_err(|error| anyhow!("failed to sign token: {error}"))?;
    Ok(IssuedToken { token, claims, expires_at })
}

/// Check signature, expiry, and token type. `None` means the token is not
/// acceptable; callers decide the wording of the 401.
pub fn verify_token(config: &AuthConfig, token: &str, expected: TokenType) -> Option<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    let data = decode::<Claims>(token, &config.decoding_key(), &validation).ok()?;
    (data.claims.token_type == expected).then_some(data.claims)
}

/// An access/refresh pair for a logged-in user, with the refresh token
/// persisted for later rotation and revocation.
#[derive(Debug)]
pub struct Session {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

pub async fn issue_session(
    db: &DatabaseConnection,
    config: &AuthConfig,
    user_id: i32,
) -> Result<Session, ApiError> {
    let now = Utc::now();
    let access = issue_token(config, user_id, TokenType::Access, now)?;
    let refresh = issue_token(config, user_id, TokenType::Refresh, now)?;

    refresh_token::ActiveModel {
        jti: Set(refresh.claims.jti.clone()),
        user_id: Set(user_id),
        expires_at: Set(refresh.expires_at),
        revoked: Set(false),
        created: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    debug!("Issued session for user {}", user_id);
    Ok(Session { access, refresh })
}

/// Redeem a refresh token: revoke its row and issue a replacement pair.
///
/// The check and the revocation run in one transaction, so a replayed token
/// cannot slip in between them. `None` covers every token-side failure
/// (bad signature, expired, wrong type, unknown jti, already revoked).
pub async fn rotate_session(
    db: &DatabaseConnection,
    config: &AuthConfig,
    token: &str,
) -> Result<Option<Session>, ApiError> {
    let Some(claims) = verify_token(config, token, TokenType::Refresh) else {
        return Ok(None);
    };

    let txn = db.begin().await?;

    let Some(row) = RefreshToken::find()
        .filter(refresh_token::Column::Jti.eq(&claims.jti))
        .one(&txn)
        .await?
    else {
        return Ok(None);
    };

    let now = Utc::now();
    if !row.is_live(now) {
        warn!("Rejected replay of refresh token for user {}", row.user_id);
        return Ok(None);
    }

    let user_id = row.user_id;
    let mut revoked: refresh_token::ActiveModel = row.into();
    revoked.revoked = Set(true);
    revoked.update(&txn).await?;

    let access = issue_token(config, user_id, TokenType::Access, now)?;
    let refresh = issue_token(config, user_id, TokenType::Refresh, now)?;
    refresh_token::ActiveModel {
        jti: Set(refresh.claims.jti.clone()),
        user_id: Set(user_id),
        expires_at: Set(refresh.expires_at),
        revoked: Set(false),
        created: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    debug!("Rotated refresh token for user {}", user_id);
    Ok(Some(Session { access, refresh }))
}

/// Revoke a refresh token without issuing a replacement (logout).
///
/// Returns `false` when the token is not redeemable, for the same reasons
/// [`rotate_session`] returns `None`.
pub async fn revoke_session(
    db: &DatabaseConnection,
    config: &AuthConfig,
    token: &str,
) -> Result<bool, ApiError> {
    let Some(claims) = verify_token(config, token, TokenType::Refresh) else {
        return Ok(false);
    };

    let Some(row) = RefreshToken::find()
        .filter(refresh_token::Column::Jti.eq(&claims.jti))
        .one(db)
        .await?
    else {
        return Ok(false);
    };

    if !row.is_live(Utc::now()) {
        return Ok(false);
    }

    let user_id = row.user_id;
    let mut revoked: refresh_token::ActiveModel = row.into();
    revoked.revoked = Set(true);
    revoked.update(db).await?;
    debug!("Revoked refresh token for user {}", user_id);
    Ok(true)
}

pub fn hash_password(plain: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|error| anyhow!("failed to hash password: {error}").into())
}

/// Constant-time verification against a stored Argon2 hash. A hash that
/// fails to parse counts as a mismatch rather than an error, so login
/// failures stay indistinguishable.
pub fn verify_password(plain: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default().verify_password(plain.as_bytes(), &parsed).is_ok()
}

/// The authenticated user, resolved from the bearer access token.
#[derive(Debug)]
pub struct CurrentUser(pub user::Model);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::NotAuthenticated(MISSING_CREDENTIALS.to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::NotAuthenticated(MISSING_CREDENTIALS.to_string()))?;

        let claims = verify_token(&state.auth, token, TokenType::Access)
            .ok_or_else(|| ApiError::InvalidToken(BAD_ACCESS_TOKEN.to_string()))?;

        let user = user::Entity::find_by_id(claims.sub)
            .one(&state.db)
            .await?
            .ok_or_else(|| ApiError::InvalidToken(BAD_ACCESS_TOKEN.to_string()))?;

        Ok(Self(user))
    }
}
