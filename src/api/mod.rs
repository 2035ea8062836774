//! JSON HTTP interface.
//!
//! Handlers are thin: they resolve the [`Caller`](crate::core::caller::Caller)
//! from the session header, call one core operation and serialize its result.
//! Errors go through [`error::ApiError`].

/// Category and category rule endpoints
pub mod categories;
/// Core error to HTTP response mapping
pub mod error;
/// Caller extraction from the session header
pub mod extract;
/// Installment endpoints
pub mod installments;
/// Recurring expense endpoints
pub mod recurring;
/// Reports and CSV export
pub mod reports;
/// Settings endpoints
pub mod settings;
/// Transaction endpoints
pub mod transactions;

use crate::{
    cache::CategoryRuleCache,
    config::settings::AppConfig,
    core::period::Period,
    errors::{Error, Result},
};
use axum::{
    Router,
    extract::{MatchedPath, Request},
    routing::{delete, get, post},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub rules: Arc<CategoryRuleCache>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(db: DatabaseConnection, config: AppConfig) -> Self {
        Self {
            db,
            rules: Arc::new(CategoryRuleCache::new()),
            config: Arc::new(config),
        }
    }
}

/// Builds an optional month filter from `month`/`year` query parameters.
/// Both must be given together.
pub(crate) fn period_from_query(month: Option<u32>, year: Option<i32>) -> Result<Option<Period>> {
    match (month, year) {
        (Some(month), Some(year)) => Period::new(month, year).map(Some),
        (None, None) => Ok(None),
        _ => Err(Error::validation("month and year must be given together")),
    }
}

/// Builds the application router with request tracing.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/api/transactions",
            get(transactions::list).post(transactions::create),
        )
        .route(
            "/api/transactions/{id}",
            get(transactions::get)
                .put(transactions::update)
                .delete(transactions::delete),
        )
        .route("/api/transactions/{id}/promote", post(transactions::promote))
        .route(
            "/api/recurring",
            get(recurring::list).post(recurring::create),
        )
        .route("/api/recurring/pending", get(recurring::pending))
        .route("/api/recurring/generate-due", post(recurring::generate_due))
        .route("/api/recurring/generation-due", get(recurring::generation_due))
        .route(
            "/api/recurring/{id}",
            get(recurring::get)
                .put(recurring::update)
                .delete(recurring::delete),
        )
        .route("/api/recurring/{id}/generate", post(recurring::generate))
        .route(
            "/api/installments",
            get(installments::list).post(installments::create),
        )
        .route(
            "/api/installments/{id}",
            get(installments::get).delete(installments::delete),
        )
        .route(
            "/api/categories",
            get(categories::list).post(categories::create),
        )
        .route(
            "/api/categories/{id}",
            delete(categories::delete),
        )
        .route(
            "/api/category-rules",
            get(categories::list_rules).post(categories::create_rule),
        )
        .route(
            "/api/category-rules/{id}",
            delete(categories::delete_rule),
        )
        .route("/api/settings", get(settings::list))
        .route("/api/settings/{key}", get(settings::get).put(settings::put))
        .route("/api/reports/monthly", get(reports::monthly))
        .route("/api/reports/yearly", get(reports::yearly))
        .route("/api/export/csv", get(reports::export_csv))
        .with_state(state);

    let tracing_layer = TraceLayer::new_for_http().make_span_with(|req: &Request| {
        let method = req.method();
        let uri = req.uri();

        let matched_path = req
            .extensions()
            .get::<MatchedPath>()
            .map(MatchedPath::as_str);

        tracing::debug_span!("request", %method, %uri, matched_path)
    });

    api.layer(tracing_layer)
}

/// Resolves when the process receives Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("Received terminate signal, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        entities::{RecurringExpenseModel, TransactionModel},
        test_utils::*,
    };
    use axum::http::{HeaderName, HeaderValue, StatusCode};
    use axum_test::TestServer;
    use serde_json::{Value, json};

    const USER_HEADER: HeaderName = HeaderName::from_static("x-user-id");

    async fn test_server() -> Result<TestServer> {
        let db = setup_test_db().await?;
        let app = build_router(AppState::new(db, AppConfig::default()));
        Ok(TestServer::try_new(app).unwrap())
    }

    fn alice() -> HeaderValue {
        HeaderValue::from_static("alice")
    }

    #[test]
    fn test_period_from_query() {
        assert!(period_from_query(None, None).unwrap().is_none());
        assert_eq!(
            period_from_query(Some(2), Some(2024)).unwrap(),
            Some(Period::new(2, 2024).unwrap())
        );
        assert!(matches!(
            period_from_query(Some(2), None),
            Err(Error::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_session_header_is_unauthorized() -> Result<()> {
        let server = test_server().await?;

        let response = server.get("/api/transactions").await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

        let response = server
            .get("/api/transactions")
            .add_header(USER_HEADER, HeaderValue::from_static("  "))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_and_list_transactions() -> Result<()> {
        let server = test_server().await?;

        let response = server
            .post("/api/transactions")
            .add_header(USER_HEADER, alice())
            .json(&json!({
                "description": "Mercado",
                "amount": 120.5,
                "date": "2024-02-10",
                "transaction_type": "EXPENSE",
                "origin": "Nubank",
            }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        let created: TransactionModel = response.json();
        assert!((created.amount + 120.5).abs() < f64::EPSILON);

        let listed: Vec<TransactionModel> = server
            .get("/api/transactions")
            .add_query_param("month", 2)
            .add_query_param("year", 2024)
            .add_header(USER_HEADER, alice())
            .await
            .json();
        assert_eq!(listed.len(), 1);

        let other: Vec<TransactionModel> = server
            .get("/api/transactions")
            .add_header(USER_HEADER, HeaderValue::from_static("bob"))
            .await
            .json();
        assert!(other.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_generate_twice_returns_conflict_with_existing() -> Result<()> {
        let server = test_server().await?;

        let template: RecurringExpenseModel = server
            .post("/api/recurring")
            .add_header(USER_HEADER, alice())
            .json(&json!({
                "description": "Aluguel",
                "default_amount": 200.0,
                "day_of_month": 31,
                "transaction_type": "EXPENSE",
                "origin": "Nubank",
            }))
            .await
            .json();

        let path = format!("/api/recurring/{}/generate", template.id);
        let first = server
            .post(&path)
            .add_header(USER_HEADER, alice())
            .json(&json!({ "month": 2, "year": 2023 }))
            .await;
        assert_eq!(first.status_code(), StatusCode::CREATED);
        let generated: TransactionModel = first.json();
        assert_eq!(generated.date, date(2023, 2, 28));

        let second = server
            .post(&path)
            .add_header(USER_HEADER, alice())
            .json(&json!({ "month": 2, "year": 2023 }))
            .await;
        assert_eq!(second.status_code(), StatusCode::CONFLICT);
        let body: Value = second.json();
        assert_eq!(body["existing"]["id"], json!(generated.id));
        Ok(())
    }

    #[tokio::test]
    async fn test_generate_manual_template_is_policy_violation() -> Result<()> {
        let server = test_server().await?;

        let template: RecurringExpenseModel = server
            .post("/api/recurring")
            .add_header(USER_HEADER, alice())
            .json(&json!({
                "description": "Luz",
                "default_amount": 150.0,
                "day_of_month": 15,
                "transaction_type": "EXPENSE",
                "origin": "Nubank",
                "auto_generate": false,
            }))
            .await
            .json();

        let response = server
            .post(&format!("/api/recurring/{}/generate", template.id))
            .add_header(USER_HEADER, alice())
            .json(&json!({ "month": 1, "year": 2024 }))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = response.json();
        assert!(body["hint"].is_string());

        let pending: Value = server
            .get("/api/recurring/pending")
            .add_query_param("month", 1)
            .add_query_param("year", 2024)
            .add_header(USER_HEADER, alice())
            .await
            .json();
        assert_eq!(pending.as_array().map(Vec::len), Some(1));
        Ok(())
    }

    #[tokio::test]
    async fn test_generation_due_clears_after_sweep() -> Result<()> {
        let server = test_server().await?;
        let today = Period::of(chrono::Utc::now().date_naive());

        let before: Value = server
            .get("/api/recurring/generation-due")
            .add_header(USER_HEADER, alice())
            .await
            .json();
        assert_eq!(before, json!({ "due": true, "last_generation": null }));

        let sweep = server
            .post("/api/recurring/generate-due")
            .add_header(USER_HEADER, alice())
            .json(&json!({ "month": today.month(), "year": today.year() }))
            .await;
        assert_eq!(sweep.status_code(), StatusCode::OK);

        let after: Value = server
            .get("/api/recurring/generation-due")
            .add_header(USER_HEADER, alice())
            .await
            .json();
        assert_eq!(after["due"], json!(false));
        assert!(!after["last_generation"].is_null());
        Ok(())
    }

    #[tokio::test]
    async fn test_foreign_resource_is_not_found() -> Result<()> {
        let server = test_server().await?;

        let created: TransactionModel = server
            .post("/api/transactions")
            .add_header(USER_HEADER, alice())
            .json(&json!({
                "description": "Cinema",
                "amount": 40.0,
                "date": "2024-02-10",
                "transaction_type": "EXPENSE",
                "origin": "Nubank",
            }))
            .await
            .json();

        let response = server
            .post(&format!("/api/transactions/{}/promote", created.id))
            .add_header(USER_HEADER, HeaderValue::from_static("bob"))
            .json(&json!({}))
            .await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn test_export_csv_download() -> Result<()> {
        let server = test_server().await?;

        let response = server
            .get("/api/export/csv")
            .add_header(USER_HEADER, alice())
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(
            response.header("content-type"),
            HeaderValue::from_static("text/csv; charset=utf-8")
        );
        assert_eq!(
            response.text(),
            "Data;Descricao;Valor;Tipo;Categoria;Origem;Fixa;Parcelada\n"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_settings_round_trip() -> Result<()> {
        let server = test_server().await?;

        server
            .put("/api/settings/currency")
            .add_header(USER_HEADER, alice())
            .json(&json!({ "value": "BRL" }))
            .await;

        let body: Value = server
            .get("/api/settings/currency")
            .add_header(USER_HEADER, alice())
            .await
            .json();
        assert_eq!(body, json!({ "key": "currency", "value": "BRL" }));
        Ok(())
    }
}
