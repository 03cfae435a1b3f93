use axum::{extract::State, http::StatusCode, response::Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use model::entities::{prelude::User, user};
use model::provisioning::{self, NewUser};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::{
    AuthConfig, BAD_REFRESH_TOKEN, CurrentUser, hash_password, issue_session, revoke_session,
    rotate_session, verify_password,
};
use crate::error::ApiError;
use crate::schemas::{AppState, ErrorResponse};

/// Cookie carrying the refresh token. Never readable from scripts.
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Request body for registering a new user
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct RegisterRequest {
    /// Email address (unique, used for login)
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    /// Password
    pub password: String,
    /// Password, repeated
    pub confirm_password: String,
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
}

/// Request body for logging in
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct LoginRequest {
    /// Email address
    pub email: String,
    /// Password
    pub password: String,
}

/// Registration response body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub message: String,
    pub response: String,
}

/// Login response body; the refresh token travels in the cookie only
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub message: String,
    pub response: String,
    pub access_token: String,
}

/// Token refresh response body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RefreshResponse {
    pub response: String,
    pub access_token: String,
}

/// Logout response body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LogoutResponse {
    pub detail: String,
}

fn refresh_cookie(config: &AuthConfig, token: String) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, token))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(config.refresh_token_lifetime.num_seconds()))
        .build()
}

fn removal_cookie() -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, "")).path("/").build()
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = RegisterResponse),
        (status = 400, description = "Invalid registration data", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    trace!("Entering register function");

    if request.validate().is_err() {
        return Err(ApiError::validation("INVALID_EMAIL", "Enter a valid email address."));
    }
    if request.password != request.confirm_password {
        return Err(ApiError::validation(
            "PASSWORD_MISMATCH",
            "Confirm password does not match with password",
        ));
    }

    let password_hash = hash_password(&request.password)?;
    let created = provisioning::create_user(
        &state.db,
        NewUser {
            email: request.email,
            password_hash,
            first_name: request.first_name,
            last_name: request.last_name,
            is_staff: false,
            is_superuser: false,
        },
    )
    .await?;

    info!("Registered user {} ({})", created.id, created.email);
    let response = RegisterResponse {
        message: "User registered successfully".to_string(),
        response: "OK".to_string(),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Log a user in
#[utoipa::path(
    post,
    path = "/api/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "User logged in successfully", body = LoginResponse),
        (status = 400, description = "Credentials rejected", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    trace!("Entering login function");

    let email = provisioning::normalize_email(&request.email);
    let user = User::find()
        .filter(user::Column::Email.eq(&email))
        .one(&state.db)
        .await?;

    // One generic failure for unknown email and wrong password alike.
    let matched = user
        .as_ref()
        .is_some_and(|found| verify_password(&request.password, &found.password_hash));
    let Some(user) = user.filter(|_| matched) else {
        debug!("Login rejected");
        return Err(ApiError::validation(
            "INVALID_CREDENTIALS",
            "Unable to log in with provided credentials.",
        ));
    };

    let session = issue_session(&state.db, &state.auth, user.id).await?;
    info!("User {} logged in", user.id);

    let jar = jar.add(refresh_cookie(&state.auth, session.refresh.token));
    let response = LoginResponse {
        message: "User logged in successfully".to_string(),
        response: "OK".to_string(),
        access_token: session.access.token,
    };
    Ok((jar, Json(response)))
}

/// Exchange the refresh cookie for a new token pair
#[utoipa::path(
    post,
    path = "/api/refresh",
    tag = "auth",
    responses(
        (status = 200, description = "Tokens rotated", body = RefreshResponse),
        (status = 401, description = "Refresh token missing, invalid, or already used", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<RefreshResponse>), ApiError> {
    trace!("Entering refresh function");

    let token = jar
        .get(REFRESH_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or_else(|| ApiError::InvalidToken(BAD_REFRESH_TOKEN.to_string()))?;

    let session = rotate_session(&state.db, &state.auth, &token)
        .await?
        .ok_or_else(|| ApiError::InvalidToken(BAD_REFRESH_TOKEN.to_string()))?;

    let jar = jar.add(refresh_cookie(&state.auth, session.refresh.token));
    let response = RefreshResponse {
        response: "OK".to_string(),
        access_token: session.access.token,
    };
    Ok((jar, Json(response)))
}

/// Log the authenticated user out, revoking their refresh token
#[utoipa::path(
    post,
    path = "/api/logout",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "User logged out successfully", body = LogoutResponse),
        (status = 401, description = "Not authenticated or refresh token not redeemable", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    jar: CookieJar,
) -> Result<(CookieJar, Json<LogoutResponse>), ApiError> {
    trace!("Entering logout function");

    let token = jar
        .get(REFRESH_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or_else(|| ApiError::InvalidToken(BAD_REFRESH_TOKEN.to_string()))?;

    if !revoke_session(&state.db, &state.auth, &token).await? {
        warn!("Logout with a dead refresh token for user {}", user.id);
        return Err(ApiError::InvalidToken(BAD_REFRESH_TOKEN.to_string()));
    }

    info!("User {} logged out", user.id);
    let jar = jar.remove(removal_cookie());
    let response = LogoutResponse { detail: "User logged out successfully.".to_string() };
    Ok((jar, Json(response)))
}
