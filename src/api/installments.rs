//! Installment endpoints.

use super::{AppState, error::ApiError};
use crate::{
    core::{
        caller::Caller,
        installment::{self, InstallmentWithTransactions, NewInstallment},
    },
    entities::InstallmentModel,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub removed: u64,
}

pub async fn list(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<InstallmentModel>>, ApiError> {
    Ok(Json(installment::list_installments(&state.db, &caller).await?))
}

pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    Json(input): Json<NewInstallment>,
) -> Result<(StatusCode, Json<InstallmentWithTransactions>), ApiError> {
    let created = installment::create_installment(&state.db, &caller, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<InstallmentWithTransactions>, ApiError> {
    Ok(Json(
        installment::get_installment(&state.db, &caller, id).await?,
    ))
}

pub async fn delete(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let removed = installment::delete_installment(&state.db, &caller, id).await?;
    Ok(Json(DeleteResponse { removed }))
}
