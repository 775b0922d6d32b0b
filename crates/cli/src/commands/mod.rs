//! Subcommand implementations.

pub mod admin;
pub mod migrate;
pub mod seed;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use stride_server::config::ConfigError;
use stride_server::db::RepositoryError;
use stride_server::error::AppError;
use stride_server::services::auth::AuthError;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("{0}")]
    Repository(#[from] RepositoryError),

    #[error("{0}")]
    Auth(#[from] AuthError),

    #[error("{0}")]
    App(#[from] AppError),

    #[error("Invalid role: {0}. Valid roles: admin, super_admin")]
    InvalidRole(String),

    #[error("No account with email {0}")]
    UnknownUser(String),

    #[error("Could not read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Shiprocket client: {0}")]
    Shiprocket(#[from] stride_server::shiprocket::ShiprocketError),
}

/// Connect using `DATABASE_URL` (a `.env` file is honoured).
pub async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    Ok(stride_server::db::create_pool(&database_url).await?)
}
