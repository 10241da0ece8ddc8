use axum_helpers::server::{create_production_app, health_router};
use clap::{Parser, Subcommand};
use core_config::tracing::{init_tracing, install_color_eyre};
use database::postgres::{DatabaseConnection, PostgresConfig};
use domain_catalog::{PgCatalogRepository, ensure_schema, populate_products};
use std::time::Duration;
use tracing::{info, warn};

mod api;
mod config;
mod state;

use config::Config;
use state::AppState;

#[derive(Parser)]
#[command(name = "catalog_api")]
#[command(about = "Product catalog API with filtered listing and bulk writes")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy, Default)]
enum Commands {
    /// Start the HTTP server (default)
    #[default]
    Serve,

    /// Create the reference categories and products, then exit
    PopulateProducts,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Install color-eyre first for colored error output (before any fallible operations)
    install_color_eyre();

    let cli = Cli::parse();

    // Load configuration from environment variables
    let config = Config::from_env()?;

    // Initialize tracing with ErrorLayer for span trace capture
    init_tracing(&config.environment);

    match cli.command.unwrap_or_default() {
        Commands::Serve => {
            let db = connect_store(&config).await?;
            serve(AppState { config, db }).await
        }
        Commands::PopulateProducts => {
            // Seeding the in-memory store would be lost on exit.
            let database = config.require_database("populate-products")?;
            let db = connect_postgres(database, &config).await?;
            populate(db).await
        }
    }
}

/// Connect to PostgreSQL and bootstrap the tables, or `None` for the
/// in-memory store when no database is configured.
async fn connect_store(config: &Config) -> eyre::Result<Option<DatabaseConnection>> {
    let Some(database) = &config.database else {
        warn!("DATABASE_URL is not set, using the in-memory store (data is lost on exit)");
        return Ok(None);
    };

    Ok(Some(connect_postgres(database, config).await?))
}

async fn connect_postgres(database: &PostgresConfig, config: &Config) -> eyre::Result<DatabaseConnection> {
    let db = database::postgres::connect_from_config_with_retry(database.clone(), Some(config.retry.clone()))
        .await
        .map_err(|e| eyre::eyre!("PostgreSQL connection failed: {}", e))?;

    ensure_schema(&db)
        .await
        .map_err(|e| eyre::eyre!("Schema bootstrap failed: {}", e))?;

    Ok(db)
}

async fn serve(state: AppState) -> eyre::Result<()> {
    let api_routes = api::routes(&state);

    let router = axum_helpers::create_router(api_routes, &state.config.cors)
        .map_err(|e| eyre::eyre!("Invalid HTTP configuration: {}", e))?;

    // - /health: liveness check with app name/version
    // - /ready: readiness check against the store
    let app = router
        .merge(health_router(state.config.app))
        .merge(api::ready_router(state.clone()));

    info!("Starting catalog API with graceful shutdown (30s timeout)");

    let AppState { config, db } = state;
    create_production_app(
        app,
        &config.server,
        Duration::from_secs(30),
        async move {
            if let Some(db) = db {
                info!("Shutting down: closing database connections");
                match db.close().await {
                    Ok(_) => info!("PostgreSQL connection closed successfully"),
                    Err(e) => tracing::error!("Error closing PostgreSQL: {}", e),
                }
            }
        },
    )
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Catalog API shutdown complete");
    Ok(())
}

async fn populate(db: DatabaseConnection) -> eyre::Result<()> {
    let report = populate_products(&PgCatalogRepository::new(db.clone()))
        .await
        .map_err(|e| eyre::eyre!("Seeding failed: {}", e))?;

    info!(
        categories_created = report.categories_created,
        products_created = report.products_created,
        products_skipped = report.products_skipped,
        "Reference data populated"
    );

    db.close()
        .await
        .map_err(|e| eyre::eyre!("Error closing PostgreSQL: {}", e))?;
    Ok(())
}
