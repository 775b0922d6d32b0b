//! Site settings repository.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::PgPool;

use stride_core::UserId;

use super::RepositoryError;
use crate::models::settings::SiteSetting;

#[derive(Debug, sqlx::FromRow)]
struct SettingRow {
    key: String,
    value: JsonValue,
    updated_by: Option<i32>,
    updated_at: DateTime<Utc>,
}

impl From<SettingRow> for SiteSetting {
    fn from(row: SettingRow) -> Self {
        Self {
            key: row.key,
            value: row.value,
            updated_by: row.updated_by.map(UserId::new),
            updated_at: row.updated_at,
        }
    }
}

pub struct SettingsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SettingsRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<SiteSetting>, RepositoryError> {
        let rows = sqlx::query_as::<_, SettingRow>(
            "SELECT key, value, updated_by, updated_at FROM site_settings ORDER BY key",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, key: &str) -> Result<Option<SiteSetting>, RepositoryError> {
        let row = sqlx::query_as::<_, SettingRow>(
            "SELECT key, value, updated_by, updated_at FROM site_settings WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn upsert(
        &self,
        key: &str,
        value: &JsonValue,
        updated_by: Option<UserId>,
    ) -> Result<SiteSetting, RepositoryError> {
        let row = sqlx::query_as::<_, SettingRow>(
            "INSERT INTO site_settings (key, value, updated_by) VALUES ($1, $2, $3)
             ON CONFLICT (key) DO UPDATE
             SET value = EXCLUDED.value, updated_by = EXCLUDED.updated_by, updated_at = now()
             RETURNING key, value, updated_by, updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(updated_by)
        .fetch_one(self.pool)
        .await?;
        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the key does not exist.
    pub async fn delete(&self, key: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM site_settings WHERE key = $1")
            .bind(key)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
