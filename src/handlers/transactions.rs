use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use model::entities::{prelude::{Listing, Transaction}, transaction};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, trace};
use utoipa::ToSchema;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};

/// Request body for recording a sale
///
/// Everything else is derived server-side: the seller from the listing,
/// the buyer from the access token and the total from the current price.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateTransactionRequest {
    /// Listing being purchased
    pub listing_id: i32,
    /// Number of units sold
    pub quantity: i32,
}

/// Transaction response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    pub id: i32,
    pub buyer_id: i32,
    pub seller_id: i32,
    pub listing_id: i32,
    pub quantity: i32,
    pub total: Decimal,
    pub created: DateTime<Utc>,
}

impl From<transaction::Model> for TransactionResponse {
    fn from(model: transaction::Model) -> Self {
        Self {
            id: model.id,
            buyer_id: model.buyer_id,
            seller_id: model.seller_id,
            listing_id: model.listing_id,
            quantity: model.quantity,
            total: model.total,
            created: model.created,
        }
    }
}

fn transaction_not_found() -> ApiError {
    ApiError::not_found("TRANSACTION_NOT_FOUND", "Transaction does not exist")
}

/// Rows where the user appears on either side of the sale.
fn involves(user_id: i32) -> Condition {
    Condition::any()
        .add(transaction::Column::BuyerId.eq(user_id))
        .add(transaction::Column::SellerId.eq(user_id))
}

/// List the authenticated user's transactions
///
/// Returns sales where the user is the buyer or the seller.
#[utoipa::path(
    get,
    path = "/api/transactions",
    tag = "transactions",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Transactions retrieved successfully", body = ApiResponse<Vec<TransactionResponse>>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn get_transactions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<Vec<TransactionResponse>>>, ApiError> {
    trace!("Entering get_transactions function for user {}", user.id);

    let transactions = Transaction::find()
        .filter(involves(user.id))
        .all(&state.db)
        .await?;

    let response = ApiResponse {
        data: transactions.into_iter().map(TransactionResponse::from).collect(),
        message: "Transactions retrieved successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Record a sale
///
/// The ledger is append-only. Stock is not decremented here; the listing
/// keeps its quantity and the row only documents the sale.
#[utoipa::path(
    post,
    path = "/api/transactions",
    tag = "transactions",
    security(("bearer_auth" = [])),
    request_body = CreateTransactionRequest,
    responses(
        (status = 201, description = "Transaction created successfully", body = ApiResponse<TransactionResponse>),
        (status = 400, description = "Quantity out of range", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Listing not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn create_transaction(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TransactionResponse>>), ApiError> {
    trace!("Entering create_transaction function for user {}", user.id);

    if request.quantity < 1 {
        return Err(ApiError::validation(
            "QUANTITY_OUT_OF_RANGE",
            "Quantity cannot be less than 1",
        ));
    }

    let listing = Listing::find_by_id(request.listing_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("LISTING_NOT_FOUND", "Listing does not exist"))?;

    let total = listing.price * Decimal::from(request.quantity);
    let recorded = transaction::ActiveModel {
        buyer_id: Set(user.id),
        seller_id: Set(listing.owner_id),
        listing_id: Set(listing.id),
        quantity: Set(request.quantity),
        total: Set(total),
        created: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!(
        "User {} bought {} x{} from user {} for {}",
        recorded.buyer_id, recorded.listing_id, recorded.quantity, recorded.seller_id, recorded.total
    );
    let response = ApiResponse {
        data: TransactionResponse::from(recorded),
        message: "Transaction created successfully".to_string(),
        success: true,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Get a specific transaction by ID
///
/// Only visible to its buyer or seller; anyone else sees a 404.
#[utoipa::path(
    get,
    path = "/api/transactions/{transaction_id}",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(
        ("transaction_id" = i32, Path, description = "Transaction ID"),
    ),
    responses(
        (status = 200, description = "Transaction retrieved successfully", body = ApiResponse<TransactionResponse>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Transaction not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn get_transaction(
    Path(transaction_id): Path<i32>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<TransactionResponse>>, ApiError> {
    trace!("Entering get_transaction function for transaction {}", transaction_id);

    let found = Transaction::find_by_id(transaction_id)
        .filter(involves(user.id))
        .one(&state.db)
        .await?
        .ok_or_else(transaction_not_found)?;

    let response = ApiResponse {
        data: TransactionResponse::from(found),
        message: "Transaction retrieved successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}
