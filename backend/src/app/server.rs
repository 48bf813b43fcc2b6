use std::error::Error;
use std::net::SocketAddr;
use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app;
use crate::auth;
use crate::cfg;
use crate::core;
use crate::services::sms;

/// Upper bound for calls to Daraja and Twilio
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Application-level error type
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigLoadingFailed(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    DatabaseOperationFailed(#[from] core::DbError),

    #[error("Migration error: {0}")]
    MigrationFailed(#[from] app::MigrationError),

    #[error("CLI error: {0}")]
    CliOperationFailed(#[from] app::CliError),

    #[error("JWT setup error: {0}")]
    JwtSetupFailed(#[from] auth::JwtError),

    #[error("Network address parsing error: {0}")]
    AddressParsingFailed(#[from] std::net::AddrParseError),

    #[error("Server error: {0}")]
    ServerStartingFailed(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    HttpClientError(#[from] reqwest::Error),
}

pub async fn create_db_context(db_settings: &cfg::DatabaseSettings) -> Result<core::DbContext, core::DbError> {
    let options = db_settings.connect_options().map_err(core::DbError::ConnectionFailed)?;
    SqlitePoolOptions::new()
        .max_connections(db_settings.max_connections.max(1))
        .connect_with(options)
        .await
        .map_err(core::DbError::ConnectionFailed)
}

pub async fn run() {
    if let Err(e) = run_app().await {
        eprintln!("❌ {e}\n");

        let mut source = e.source();
        while let Some(err) = source {
            eprintln!("Caused by: {err}");
            source = err.source();
        }

        std::process::exit(1);
    }
}

async fn run_app() -> Result<(), AppError> {
    let settings = cfg::AppSettings::new()?;
    init_tracing(&settings.server);

    // one-shot CLI commands exit before the server starts
    let db = create_db_context(&settings.database).await?;
    if app::run_cli(&db).await? {
        return Ok(());
    }
    app::run_migrations(&db).await?;

    let address = settings.get_server_address().parse::<SocketAddr>()?;
    let listener = tokio::net::TcpListener::bind(address).await?;
    log_startup(&settings, address);

    let context = build_context(db, settings)?;
    axum::serve(listener, app::create_router(context))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing(server: &cfg::ServerSettings) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&server.log_directives))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wires the signing key and the outbound HTTP collaborators around the pool.
fn build_context(db: core::DbContext, settings: cfg::AppSettings) -> Result<core::ArcContext, AppError> {
    let jwt = auth::JwtContext::new(&settings.jwt, &auth::get_jwt_secret()?);
    let http_client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
    let sms_sender = sms::create_sms_sender(&settings.sms, http_client.clone());
    if settings.mpesa.callback_url.is_empty() {
        tracing::warn!("mpesa.callback_url is not set, STK push requests will be refused");
    }
    Ok(core::Context::new(db, jwt, http_client, sms_sender, settings))
}

fn log_startup(settings: &cfg::AppSettings, address: SocketAddr) {
    tracing::info!("🚀 starting rentdesk");
    tracing::info!("   app_env: {}", cfg::AppSettings::get_app_run_env());
    tracing::info!("   cfg_dir: {}", cfg::AppSettings::get_config_full_path());
    tracing::info!("   logging: {}", settings.server.log_directives);
    tracing::info!("   db:      {}", settings.database.url);
    tracing::info!("   tz:      UTC{}", settings.server.local_offset());
    tracing::info!("   mpesa:   {} ({})", settings.mpesa.environment, settings.mpesa.base_url());
    tracing::info!("   sms:     {}", settings.sms.provider);
    tracing::info!("   address: http://{}", address);
}

/// Tokio signal handler that will wait for a user to press CTRL+C.
/// We use this in our `Server` method `with_graceful_shutdown`.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received, shutting down gracefully"),
        Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
    }
}
