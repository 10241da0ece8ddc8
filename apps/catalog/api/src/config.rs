use core_config::{AppInfo, FromEnv, app_info, cors::CorsConfig, server::ServerConfig};
use database::common::RetryConfig;
use database::postgres::PostgresConfig;
use domain_catalog::PaginationConfig;

pub use core_config::Environment;

/// Application-specific configuration
/// Composes shared config components from the `config` library
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub environment: Environment,
    pub server: ServerConfig,
    pub cors: CorsConfig,
    /// `None` when `DATABASE_URL` is unset; the in-memory store is used instead
    pub database: Option<PostgresConfig>,
    pub retry: RetryConfig,
    pub pagination: PaginationConfig,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let server = ServerConfig::from_env()?; // Uses defaults: HOST=0.0.0.0, PORT=8080
        let cors = CorsConfig::from_env()?;
        let database = match std::env::var_os("DATABASE_URL") {
            Some(_) => Some(PostgresConfig::from_env()?),
            None => None,
        };
        let retry = RetryConfig::from_env()?;
        let pagination = PaginationConfig::from_env()?;

        Ok(Self {
            app: app_info!(),
            environment,
            server,
            cors,
            database,
            retry,
            pagination,
        })
    }

    /// PostgreSQL settings for commands that must persist their writes.
    pub fn require_database(&self, command: &str) -> eyre::Result<&PostgresConfig> {
        self.database
            .as_ref()
            .ok_or_else(|| eyre::eyre!("{} requires DATABASE_URL", command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_database() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", None::<&str>),
                ("PORT", None),
                ("PAGE_SIZE", None),
                ("APP_ENV", None),
            ],
            || {
                let config = Config::from_env().unwrap();

                assert!(config.database.is_none());
                assert_eq!(config.server.port, 8080);
                assert_eq!(config.pagination, PaginationConfig::default());
                assert_eq!(config.environment, Environment::Development);
                assert_eq!(config.app.name, "catalog_api");
            },
        );
    }

    #[test]
    fn test_database_url_selects_postgres() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgresql://localhost/catalog")),
                ("DB_MAX_CONNECTIONS", Some("7")),
            ],
            || {
                let config = Config::from_env().unwrap();
                let database = config.database.unwrap();

                assert_eq!(database.url(), "postgresql://localhost/catalog");
                assert_eq!(database.max_connections, 7);
            },
        );
    }

    #[test]
    fn test_require_database_without_url() {
        temp_env::with_var("DATABASE_URL", None::<&str>, || {
            let config = Config::from_env().unwrap();
            let err = config.require_database("populate-products").unwrap_err();

            assert_eq!(err.to_string(), "populate-products requires DATABASE_URL");
        });
    }

    #[test]
    fn test_require_database_with_url() {
        temp_env::with_var("DATABASE_URL", Some("postgresql://localhost/catalog"), || {
            let config = Config::from_env().unwrap();

            assert!(config.require_database("populate-products").is_ok());
        });
    }

    #[test]
    fn test_invalid_page_size_fails() {
        temp_env::with_vars(
            [("DATABASE_URL", None::<&str>), ("PAGE_SIZE", Some("zero"))],
            || {
                assert!(Config::from_env().is_err());
            },
        );
    }
}
