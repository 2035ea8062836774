//! Request extractors.

use super::{AppState, error::ApiError};
use crate::core::caller::Caller;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Resolves the caller from the header set by the session provider.
///
/// A missing, blank or non-UTF-8 header is rejected with 401 before the
/// handler runs.
impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(state.config.session_header.as_str())
            .and_then(|value| value.to_str().ok());
        Ok(Self::from_session(user_id)?)
    }
}
