use crate::category::normalize;
use crate::error::StoreError;
use crate::models::{CreateExpenseRequest, ErrorResponse, Expense, MessageResponse};
use crate::storage::ExpenseStorage;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub storage: ExpenseStorage,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(status: StatusCode, error: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

impl From<StoreError> for (StatusCode, Json<ErrorResponse>) {
    fn from(err: StoreError) -> Self {
        let status = match &err {
            StoreError::Unavailable { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            StoreError::ValidationFailure { .. } => StatusCode::BAD_REQUEST,
            StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        };
        error_response(status, err)
    }
}

pub fn build_router(storage: ExpenseStorage) -> Router {
    let state = Arc::new(AppState { storage });

    let api = Router::new()
        .route("/expenses", get(list_expenses).post(create_expense))
        .route("/expenses/:id", delete(delete_expense))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// GET /api/expenses
#[tracing::instrument(skip(state))]
async fn list_expenses(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Expense>>, ApiError> {
    let expenses = state.storage.list_all().await.map_err(|e| {
        tracing::warn!("Failed to list expenses: {}", e);
        ApiError::from(e)
    })?;
    Ok(Json(expenses))
}

/// POST /api/expenses
#[tracing::instrument(skip(state, payload))]
async fn create_expense(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateExpenseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    if !state.storage.is_connected() {
        return Err(StoreError::Unavailable { detail: None }.into());
    }

    let Json(payload) = payload
        .map_err(|rejection| error_response(StatusCode::BAD_REQUEST, rejection.body_text()))?;

    let Some(name) = payload.name else {
        return Err(error_response(StatusCode::BAD_REQUEST, "name is required"));
    };
    let Some(amount) = payload.amount else {
        return Err(error_response(StatusCode::BAD_REQUEST, "amount is required"));
    };

    let category = normalize(payload.category.as_deref());
    let expense = Expense::new(name, amount, Some(category.to_string()), None);

    let id = state.storage.create(expense).await.map_err(|e| {
        tracing::warn!("Failed to create expense: {}", e);
        ApiError::from(e)
    })?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Expense added successfully".to_string(),
            id: Some(id),
        }),
    ))
}

/// DELETE /api/expenses/:id
#[tracing::instrument(skip(state))]
async fn delete_expense(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.storage.delete(&id).await.map_err(|e| {
        tracing::warn!("Failed to delete expense {}: {}", id, e);
        ApiError::from(e)
    })?;

    Ok(Json(MessageResponse {
        message: "Expense deleted successfully".to_string(),
        id: None,
    }))
}
