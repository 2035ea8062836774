//! Recurring expense endpoints: template lifecycle, on-demand generation,
//! pending scan and the monthly sweep.

use super::{AppState, error::ApiError};
use crate::{
    core::{
        caller::Caller,
        monthly::{self, GenerationSummary},
        period::Period,
        recurring::{self, NewRecurringExpense, PendingItem, RecurringExpenseUpdate},
    },
    entities::{RecurringExpenseModel, TransactionModel},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub month: u32,
    pub year: i32,
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub month: u32,
    pub year: i32,
    /// Unsigned amount replacing the template's default for this month
    #[serde(default)]
    pub amount: Option<f64>,
}

/// Whether the current month still needs a sweep.
#[derive(Debug, Serialize)]
pub struct GenerationStatus {
    pub due: bool,
    pub last_generation: Option<Period>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub unlinked: u64,
}

pub async fn list(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<RecurringExpenseModel>>, ApiError> {
    Ok(Json(
        recurring::list_recurring_expenses(&state.db, &caller).await?,
    ))
}

pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    Json(input): Json<NewRecurringExpense>,
) -> Result<(StatusCode, Json<RecurringExpenseModel>), ApiError> {
    let created = recurring::create_recurring_expense(&state.db, &caller, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<RecurringExpenseModel>, ApiError> {
    Ok(Json(
        recurring::get_recurring_expense(&state.db, &caller, id).await?,
    ))
}

pub async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
    Json(update): Json<RecurringExpenseUpdate>,
) -> Result<Json<RecurringExpenseModel>, ApiError> {
    Ok(Json(
        recurring::update_recurring_expense(&state.db, &caller, id, update).await?,
    ))
}

pub async fn delete(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let unlinked = recurring::delete_recurring_expense(&state.db, &caller, id).await?;
    Ok(Json(DeleteResponse { unlinked }))
}

pub async fn generate(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
    Json(request): Json<GenerateRequest>,
) -> Result<(StatusCode, Json<TransactionModel>), ApiError> {
    let created = recurring::generate(
        &state.db,
        &caller,
        id,
        request.month,
        request.year,
        request.amount,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn pending(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<MonthQuery>,
) -> Result<Json<Vec<PendingItem>>, ApiError> {
    Ok(Json(
        recurring::list_pending(&state.db, &caller, query.month, query.year).await?,
    ))
}

pub async fn generate_due(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<MonthQuery>,
) -> Result<Json<GenerationSummary>, ApiError> {
    Ok(Json(
        monthly::generate_due(&state.db, &caller, request.month, request.year).await?,
    ))
}

pub async fn generation_due(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<GenerationStatus>, ApiError> {
    let today = chrono::Utc::now().date_naive();
    let due = monthly::is_generation_due(&state.db, &caller, today).await?;
    let last_generation = monthly::get_last_generation_period(&state.db, &caller).await?;
    Ok(Json(GenerationStatus {
        due,
        last_generation,
    }))
}
