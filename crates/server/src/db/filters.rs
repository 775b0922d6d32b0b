//! Storefront filter facet repository.

use sqlx::PgPool;

use stride_core::{FilterId, FilterKind};

use super::RepositoryError;
use crate::models::filter::{Filter, FilterInput};

#[derive(Debug, sqlx::FromRow)]
struct FilterRow {
    id: i32,
    name: String,
    kind: FilterKind,
    options: Vec<String>,
    position: i32,
    is_active: bool,
}

impl From<FilterRow> for Filter {
    fn from(row: FilterRow) -> Self {
        Self {
            id: FilterId::new(row.id),
            name: row.name,
            kind: row.kind,
            options: row.options,
            position: row.position,
            is_active: row.is_active,
        }
    }
}

pub struct FilterRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> FilterRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Filters in display order; `active_only` for the storefront.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, active_only: bool) -> Result<Vec<Filter>, RepositoryError> {
        let rows = sqlx::query_as::<_, FilterRow>(
            "SELECT id, name, kind, options, position, is_active FROM filters
             WHERE is_active OR NOT $1
             ORDER BY position, id",
        )
        .bind(active_only)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, input: &FilterInput) -> Result<Filter, RepositoryError> {
        let row = sqlx::query_as::<_, FilterRow>(
            "INSERT INTO filters (name, kind, options, position, is_active)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, name, kind, options, position, is_active",
        )
        .bind(&input.name)
        .bind(input.kind)
        .bind(&input.options)
        .bind(input.position)
        .bind(input.is_active)
        .fetch_one(self.pool)
        .await?;
        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the filter does not exist.
    pub async fn update(&self, id: FilterId, input: &FilterInput) -> Result<Filter, RepositoryError> {
        let row = sqlx::query_as::<_, FilterRow>(
            "UPDATE filters SET name = $2, kind = $3, options = $4, position = $5, is_active = $6
             WHERE id = $1
             RETURNING id, name, kind, options, position, is_active",
        )
        .bind(id)
        .bind(&input.name)
        .bind(input.kind)
        .bind(&input.options)
        .bind(input.position)
        .bind(input.is_active)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;
        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the filter does not exist.
    pub async fn delete(&self, id: FilterId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM filters WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Set positions from the order of `ids`. Unlisted filters keep theirs.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn reorder(&self, ids: &[i32]) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE filters f SET position = o.ord - 1
             FROM unnest($1::int[]) WITH ORDINALITY AS o(id, ord)
             WHERE f.id = o.id",
        )
        .bind(ids)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}
