//! Per-account settings endpoints.

use super::{AppState, error::ApiError};
use crate::core::{caller::Caller, settings};
use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Deserialize, Serialize)]
pub struct SettingValue {
    pub value: String,
}

/// A setting as read back; `value` is null when the key was never written.
#[derive(Debug, Serialize)]
pub struct SettingEntry {
    pub key: String,
    pub value: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<BTreeMap<String, String>>, ApiError> {
    Ok(Json(settings::list_settings(&state.db, &caller).await?))
}

pub async fn get(
    State(state): State<AppState>,
    caller: Caller,
    Path(key): Path<String>,
) -> Result<Json<SettingEntry>, ApiError> {
    let value = settings::get_setting(&state.db, &caller, &key).await?;
    Ok(Json(SettingEntry { key, value }))
}

pub async fn put(
    State(state): State<AppState>,
    caller: Caller,
    Path(key): Path<String>,
    Json(input): Json<SettingValue>,
) -> Result<Json<SettingValue>, ApiError> {
    settings::set_setting(&state.db, &caller, &key, &input.value).await?;
    Ok(Json(input))
}
