//! Mapping of core errors onto HTTP responses.
//!
//! Every error body is JSON with an `error` message in Portuguese; some variants
//! add fields the client needs to react (`existing`, `hint`, ...). Unexpected
//! failures are logged in full and answered with a generic 500.

use crate::errors::Error;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

/// Error returned by every handler.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

fn not_found_message(entity: &str) -> &'static str {
    match entity {
        "Transaction" => "Transação não encontrada",
        "RecurringExpense" => "Despesa recorrente não encontrada",
        "Installment" => "Parcelamento não encontrado",
        "Category" => "Categoria não encontrada",
        "CategoryRule" => "Regra de categorização não encontrada",
        _ => "Registro não encontrado",
    }
}

impl ApiError {
    fn status_and_body(self) -> (StatusCode, Value) {
        match self.0 {
            Error::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "Não autorizado" }),
            ),
            Error::NotFound { entity, id } => (
                StatusCode::NOT_FOUND,
                json!({ "error": not_found_message(entity), "id": id }),
            ),
            Error::Conflict {
                recurring_expense_id,
                period,
                existing,
            } => (
                StatusCode::CONFLICT,
                json!({
                    "error": format!("Esta despesa recorrente já possui uma transação em {period}"),
                    "recurring_expense_id": recurring_expense_id,
                    "existing": existing,
                }),
            ),
            Error::PolicyViolation { message, .. } => {
                tracing::debug!("Policy violation: {message}");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    json!({
                        "error": "A geração automática está desativada para esta despesa recorrente",
                        "hint": "Ative a geração automática na despesa recorrente para gerá-la sob demanda",
                    }),
                )
            }
            Error::AlreadyLinked {
                transaction_id,
                recurring_expense_id,
            } => (
                StatusCode::CONFLICT,
                json!({
                    "error": "Esta transação já está vinculada a uma despesa recorrente",
                    "transaction_id": transaction_id,
                    "recurring_expense_id": recurring_expense_id,
                }),
            ),
            Error::IncompatibleKind { transaction_id } => (
                StatusCode::CONFLICT,
                json!({
                    "error": "Transações parceladas não podem se tornar recorrentes",
                    "transaction_id": transaction_id,
                }),
            ),
            Error::InstallmentMember {
                transaction_id,
                installment_id,
            } => (
                StatusCode::CONFLICT,
                json!({
                    "error": "Esta transação faz parte de um parcelamento; exclua o parcelamento inteiro",
                    "transaction_id": transaction_id,
                    "installment_id": installment_id,
                }),
            ),
            Error::InvalidAmount { amount } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Valor inválido", "detail": amount.to_string() }),
            ),
            Error::Validation { message } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Dados inválidos", "detail": message }),
            ),
            err => {
                tracing::error!("Unexpected error while handling request: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Erro interno do servidor" }),
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}
