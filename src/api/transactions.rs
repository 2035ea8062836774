//! Transaction endpoints, including promotion to a recurring expense.

use super::{AppState, error::ApiError, period_from_query};
use crate::{
    core::{
        caller::Caller,
        promote::{self, Promotion},
        transaction::{self, NewTransaction, TransactionFilter, TransactionUpdate},
    },
    entities::TransactionModel,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub category_id: Option<i64>,
    pub origin: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PromoteRequest {
    pub day_of_month: Option<i32>,
    #[serde(default = "default_auto_generate")]
    pub auto_generate: bool,
}

const fn default_auto_generate() -> bool {
    true
}

pub async fn list(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<TransactionModel>>, ApiError> {
    let filter = TransactionFilter {
        period: period_from_query(query.month, query.year)?,
        category_id: query.category_id,
        origin: query.origin,
    };
    Ok(Json(
        transaction::list_transactions(&state.db, &caller, &filter).await?,
    ))
}

pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    Json(input): Json<NewTransaction>,
) -> Result<(StatusCode, Json<TransactionModel>), ApiError> {
    let created = transaction::create_transaction(&state.db, &state.rules, &caller, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<TransactionModel>, ApiError> {
    Ok(Json(transaction::get_transaction(&state.db, &caller, id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
    Json(update): Json<TransactionUpdate>,
) -> Result<Json<TransactionModel>, ApiError> {
    Ok(Json(
        transaction::update_transaction(&state.db, &caller, id, update).await?,
    ))
}

pub async fn delete(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    transaction::delete_transaction(&state.db, &caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn promote(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
    Json(request): Json<PromoteRequest>,
) -> Result<(StatusCode, Json<Promotion>), ApiError> {
    let promotion = promote::promote(
        &state.db,
        &caller,
        id,
        request.day_of_month,
        request.auto_generate,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(promotion)))
}
