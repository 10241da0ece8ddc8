//! Shared application state.

/// Cloned into the readiness router and the shutdown cleanup
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded from environment variables
    pub config: crate::config::Config,
    /// PostgreSQL connection pool, when `DATABASE_URL` is configured
    pub db: Option<database::postgres::DatabaseConnection>,
}
