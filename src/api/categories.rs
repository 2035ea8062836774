//! Category and category rule endpoints.

use super::{AppState, error::ApiError};
use crate::{
    core::{caller::Caller, category},
    entities::{CategoryModel, CategoryRuleModel},
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewRule {
    pub keyword: String,
    pub category_id: i64,
}

pub async fn list(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<CategoryModel>>, ApiError> {
    Ok(Json(category::list_categories(&state.db, &caller).await?))
}

pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    Json(input): Json<NewCategory>,
) -> Result<(StatusCode, Json<CategoryModel>), ApiError> {
    let created = category::create_category(&state.db, &caller, &input.name, input.color).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn delete(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    category::delete_category(&state.db, &state.rules, &caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_rules(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<CategoryRuleModel>>, ApiError> {
    Ok(Json(category::list_rules(&state.db, &caller).await?))
}

pub async fn create_rule(
    State(state): State<AppState>,
    caller: Caller,
    Json(input): Json<NewRule>,
) -> Result<(StatusCode, Json<CategoryRuleModel>), ApiError> {
    let created =
        category::create_rule(&state.db, &state.rules, &caller, &input.keyword, input.category_id)
            .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn delete_rule(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    category::delete_rule(&state.db, &state.rules, &caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
