use axum::{extract::State, response::Json};
use model::entities::{prelude::Settings, settings};
use model::provisioning;
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, trace};
use utoipa::ToSchema;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};

/// Settings response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SettingsResponse {
    pub id: i32,
    pub dark_mode: bool,
}

impl From<settings::Model> for SettingsResponse {
    fn from(model: settings::Model) -> Self {
        Self { id: model.id, dark_mode: model.dark_mode }
    }
}

/// Request body for updating the authenticated user's settings
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct UpdateSettingsRequest {
    /// Dark mode preference
    pub dark_mode: bool,
}

/// Get the authenticated user's settings
#[utoipa::path(
    get,
    path = "/api/settings",
    tag = "settings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Settings retrieved successfully", body = ApiResponse<SettingsResponse>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn get_settings(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<SettingsResponse>>, ApiError> {
    trace!("Entering get_settings function for user {}", user.id);

    let settings = Settings::find_by_id(user.settings_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("SETTINGS_NOT_FOUND", "Settings do not exist"))?;

    let response = ApiResponse {
        data: SettingsResponse::from(settings),
        message: "Settings retrieved successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Update the authenticated user's settings
///
/// Users start out sharing one default settings row; the first divergent
/// write forks a private row instead of mutating the shared one.
#[utoipa::path(
    put,
    path = "/api/settings",
    tag = "settings",
    security(("bearer_auth" = [])),
    request_body = UpdateSettingsRequest,
    responses(
        (status = 200, description = "Settings updated successfully", body = ApiResponse<SettingsResponse>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn update_settings(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<UpdateSettingsRequest>,
) -> Result<Json<ApiResponse<SettingsResponse>>, ApiError> {
    trace!("Entering update_settings function for user {}", user.id);

    let updated = provisioning::update_settings(&state.db, &user, request.dark_mode).await?;
    info!("Settings for user {} now row {}", user.id, updated.id);

    let response = ApiResponse {
        data: SettingsResponse::from(updated),
        message: "Settings updated successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}
