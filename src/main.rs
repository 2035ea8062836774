use dotenvy::dotenv;
use finance_tracker::{
    api::{self, AppState},
    config,
    errors::Result,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file (as early as possible)
    dotenv().ok(); // Make it non-fatal, env vars can be set externally
    info!("Attempted to load .env file.");

    // 3. Load the main application configuration
    let app_config = config::settings::load_app_configuration()?;
    info!("Successfully processed application configuration.");

    // 4. Connect and make sure every table exists
    let db = config::database::create_connection(&app_config.database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    config::database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Serve the API until Ctrl+C or SIGTERM
    let listener = tokio::net::TcpListener::bind(&app_config.bind_address)
        .await
        .inspect_err(|e| error!("Failed to bind {}: {}", app_config.bind_address, e))?;
    info!("HTTP server listening on {}", app_config.bind_address);

    let router = api::build_router(AppState::new(db, app_config));
    axum::serve(listener, router)
        .with_graceful_shutdown(api::shutdown_signal())
        .await?;

    info!("Server stopped.");
    Ok(())
}
