use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use model::entities::{message, prelude::{Message, User}};
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::policy::{self, Action, Resource};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};

/// Request body for sending a direct message
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct SendMessageRequest {
    /// Receiving user
    pub recipient_id: i32,
    #[validate(length(min = 1, message = "Message body cannot be empty"))]
    pub body: String,
}

/// Message response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub id: i32,
    pub sender_id: i32,
    pub recipient_id: i32,
    pub body: String,
    pub created: DateTime<Utc>,
}

impl From<message::Model> for MessageResponse {
    fn from(model: message::Model) -> Self {
        Self {
            id: model.id,
            sender_id: model.sender_id,
            recipient_id: model.recipient_id,
            body: model.body,
            created: model.created,
        }
    }
}

/// List the authenticated user's messages
///
/// Returns messages the user sent or received.
#[utoipa::path(
    get,
    path = "/api/messages",
    tag = "messages",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Messages retrieved successfully", body = ApiResponse<Vec<MessageResponse>>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn get_messages(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<Vec<MessageResponse>>>, ApiError> {
    trace!("Entering get_messages function for user {}", user.id);

    let messages = Message::find()
        .filter(
            Condition::any()
                .add(message::Column::SenderId.eq(user.id))
                .add(message::Column::RecipientId.eq(user.id)),
        )
        .all(&state.db)
        .await?;

    debug!("User {} has {} messages", user.id, messages.len());
    let response = ApiResponse {
        data: messages.into_iter().map(MessageResponse::from).collect(),
        message: "Messages retrieved successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Send a direct message to another user
#[utoipa::path(
    post,
    path = "/api/messages",
    tag = "messages",
    security(("bearer_auth" = [])),
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message sent successfully", body = ApiResponse<MessageResponse>),
        (status = 400, description = "Empty message body", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Recipient not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn send_message(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MessageResponse>>), ApiError> {
    trace!("Entering send_message function for user {}", user.id);

    request
        .validate()
        .map_err(|_| ApiError::validation("EMPTY_BODY", "Message body cannot be empty"))?;

    policy::authorize((&user).into(), Action::Create, Resource::Message)?;

    let recipient = User::find_by_id(request.recipient_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("USER_NOT_FOUND", "User does not exist"))?;

    let sent = message::ActiveModel {
        sender_id: Set(user.id),
        recipient_id: Set(recipient.id),
        body: Set(request.body),
        created: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("User {} sent message {} to user {}", user.id, sent.id, recipient.id);
    let response = ApiResponse {
        data: MessageResponse::from(sent),
        message: "Message sent successfully".to_string(),
        success: true,
    };
    Ok((StatusCode::CREATED, Json(response)))
}
