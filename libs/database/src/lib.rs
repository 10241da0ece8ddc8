//! PostgreSQL connection management and repository helpers on top of SeaORM.
//!
//! # Features
//!
//! - `postgres` (default) - connectors, health check and [`BaseRepository`]
//! - `config` - `core_config::FromEnv` for [`postgres::PostgresConfig`] and [`common::RetryConfig`]
//!
//! ```ignore
//! use database::{common::RetryConfig, postgres};
//! use core_config::FromEnv;
//!
//! let config = postgres::PostgresConfig::from_env()?;
//! let db = postgres::connect_from_config_with_retry(config, Some(RetryConfig::from_env()?)).await?;
//! postgres::check_health(&db).await?;
//! ```

pub mod common;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "postgres")]
pub mod repository;

pub use common::{DatabaseError, DatabaseResult};

#[cfg(feature = "postgres")]
pub use repository::BaseRepository;
