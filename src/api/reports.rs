//! Summaries and the CSV download.

use super::{AppState, error::ApiError, period_from_query};
use crate::core::{
    caller::Caller,
    export,
    report::{self, MonthTotals, MonthlySummary},
};
use axum::{
    Json,
    extract::{Query, State},
    http::header,
    response::IntoResponse,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub month: u32,
    pub year: i32,
}

#[derive(Debug, Deserialize)]
pub struct YearQuery {
    pub year: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    pub month: Option<u32>,
    pub year: Option<i32>,
}

pub async fn monthly(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<MonthQuery>,
) -> Result<Json<MonthlySummary>, ApiError> {
    Ok(Json(
        report::monthly_summary(&state.db, &caller, query.month, query.year).await?,
    ))
}

pub async fn yearly(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<YearQuery>,
) -> Result<Json<Vec<MonthTotals>>, ApiError> {
    Ok(Json(
        report::yearly_overview(&state.db, &caller, query.year).await?,
    ))
}

pub async fn export_csv(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let period = period_from_query(query.month, query.year)?;
    let body = export::export_csv(&state.db, &caller, period).await?;
    let filename = period.map_or_else(
        || "transacoes.csv".to_string(),
        |period| format!("transacoes-{period}.csv"),
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    ))
}
