//! Review repository.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use stride_core::{ProductId, ReviewId, ReviewStatus, UserId};

use super::{Page, Pagination, RepositoryError};
use crate::models::review::{Review, ReviewInput, ReviewQuery};

#[derive(Debug, sqlx::FromRow)]
struct ReviewRow {
    id: i32,
    product_id: i32,
    user_id: i32,
    author_name: String,
    rating: i16,
    title: String,
    body: String,
    status: ReviewStatus,
    created_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: ReviewId::new(row.id),
            product_id: ProductId::new(row.product_id),
            user_id: UserId::new(row.user_id),
            author_name: row.author_name,
            rating: row.rating,
            title: row.title,
            body: row.body,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

const SELECT: &str = "SELECT r.id, r.product_id, r.user_id, \
     COALESCE(NULLIF(u.name, ''), 'Customer') AS author_name, \
     r.rating, r.title, r.body, r.status, r.created_at \
     FROM reviews r JOIN users u ON u.id = r.user_id WHERE TRUE";

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &ReviewQuery) {
    if let Some(status) = query.status {
        qb.push(" AND r.status = ").push_bind(status);
    }
    if let Some(product_id) = query.product_id {
        qb.push(" AND r.product_id = ").push_bind(product_id);
    }
}

pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Submit a review. New reviews wait for moderation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already reviewed the
    /// product.
    pub async fn create(
        &self,
        product_id: ProductId,
        user_id: UserId,
        input: &ReviewInput,
    ) -> Result<ReviewId, RepositoryError> {
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO reviews (product_id, user_id, rating, title, body)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(product_id)
        .bind(user_id)
        .bind(input.rating)
        .bind(input.title.trim())
        .bind(input.body.trim())
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "you have already reviewed this product"))?;
        Ok(ReviewId::new(id))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!("{SELECT} AND r.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// Approved reviews for a product page, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn approved_for_product(
        &self,
        product_id: ProductId,
        limit: i64,
    ) -> Result<Vec<Review>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReviewRow>(&format!(
            "{SELECT} AND r.product_id = $1 AND r.status = 'approved'
             ORDER BY r.created_at DESC LIMIT $2"
        ))
        .bind(product_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Approved rating counts per star value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn rating_counts(&self, product_id: ProductId) -> Result<Vec<(i16, i64)>, RepositoryError> {
        let counts = sqlx::query_as::<_, (i16, i64)>(
            "SELECT rating, COUNT(*) FROM reviews
             WHERE product_id = $1 AND status = 'approved'
             GROUP BY rating",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;
        Ok(counts)
    }

    /// Moderation queue listing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        query: &ReviewQuery,
        pagination: Pagination,
    ) -> Result<Page<Review>, RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM reviews r WHERE TRUE");
        push_filters(&mut count, query);
        let total = count.build_query_scalar::<i64>().fetch_one(self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(SELECT);
        push_filters(&mut qb, query);
        qb.push(" ORDER BY r.created_at DESC, r.id DESC LIMIT ")
            .push_bind(pagination.limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());
        let rows = qb.build_query_as::<ReviewRow>().fetch_all(self.pool).await?;
        Ok(Page::new(rows.into_iter().map(Into::into).collect(), total, pagination))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review does not exist.
    pub async fn set_status(&self, id: ReviewId, status: ReviewStatus) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE reviews SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review does not exist.
    pub async fn delete(&self, id: ReviewId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
