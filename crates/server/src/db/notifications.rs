//! Push token and broadcast history repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use stride_core::{NotificationId, PushTokenId, UserId};

use super::{Page, Pagination, RepositoryError};
use crate::models::notification::{Audience, NotificationRecord, PushToken};

#[derive(Debug, sqlx::FromRow)]
struct PushTokenRow {
    id: i32,
    user_id: Option<i32>,
    token: String,
    platform: String,
    created_at: DateTime<Utc>,
    last_seen_at: DateTime<Utc>,
}

impl From<PushTokenRow> for PushToken {
    fn from(row: PushTokenRow) -> Self {
        Self {
            id: PushTokenId::new(row.id),
            user_id: row.user_id.map(UserId::new),
            token: row.token,
            platform: row.platform,
            created_at: row.created_at,
            last_seen_at: row.last_seen_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: i32,
    title: String,
    body: String,
    audience: String,
    data: Option<serde_json::Value>,
    sent_count: i32,
    failed_count: i32,
    sent_by: Option<i32>,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for NotificationRecord {
    type Error = RepositoryError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let audience = row
            .audience
            .parse::<Audience>()
            .map_err(RepositoryError::DataCorruption)?;
        Ok(Self {
            id: NotificationId::new(row.id),
            title: row.title,
            body: row.body,
            audience,
            data: row.data,
            sent_count: row.sent_count,
            failed_count: row.failed_count,
            sent_by: row.sent_by.map(UserId::new),
            created_at: row.created_at,
        })
    }
}

/// A broadcast to record in the history.
#[derive(Debug)]
pub struct NewNotification<'n> {
    pub title: &'n str,
    pub body: &'n str,
    pub audience: Audience,
    pub data: Option<&'n serde_json::Value>,
    pub sent_count: i32,
    pub failed_count: i32,
    pub sent_by: Option<UserId>,
}

pub struct NotificationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NotificationRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Register a device, or refresh it and re-link it to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn upsert_token(
        &self,
        token: &str,
        platform: &str,
        user_id: Option<UserId>,
    ) -> Result<PushToken, RepositoryError> {
        let row = sqlx::query_as::<_, PushTokenRow>(
            "INSERT INTO push_tokens (token, platform, user_id) VALUES ($1, $2, $3)
             ON CONFLICT (token) DO UPDATE
             SET platform = EXCLUDED.platform,
                 user_id = COALESCE(EXCLUDED.user_id, push_tokens.user_id),
                 last_seen_at = now()
             RETURNING id, user_id, token, platform, created_at, last_seen_at",
        )
        .bind(token)
        .bind(platform)
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;
        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete_token(&self, token: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM push_tokens WHERE token = $1")
            .bind(token)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Drop tokens Expo reported as no longer registered.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete_tokens(&self, tokens: &[String]) -> Result<u64, RepositoryError> {
        if tokens.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM push_tokens WHERE token = ANY($1)")
            .bind(tokens)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Tokens for a broadcast audience.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn tokens_for(&self, audience: Audience) -> Result<Vec<String>, RepositoryError> {
        let filter = match audience {
            Audience::All => "TRUE",
            Audience::Registered => "user_id IS NOT NULL",
            Audience::Guests => "user_id IS NULL",
        };
        let tokens = sqlx::query_scalar::<_, String>(&format!(
            "SELECT token FROM push_tokens WHERE {filter} ORDER BY id"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(tokens)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn record(
        &self,
        notification: &NewNotification<'_>,
    ) -> Result<NotificationRecord, RepositoryError> {
        let row = sqlx::query_as::<_, NotificationRow>(
            "INSERT INTO notification_history
                (title, body, audience, data, sent_count, failed_count, sent_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id, title, body, audience, data, sent_count, failed_count, sent_by,
                       created_at",
        )
        .bind(notification.title)
        .bind(notification.body)
        .bind(notification.audience.as_str())
        .bind(notification.data)
        .bind(notification.sent_count)
        .bind(notification.failed_count)
        .bind(notification.sent_by)
        .fetch_one(self.pool)
        .await?;
        row.try_into()
    }

    /// Broadcast history, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn history(
        &self,
        pagination: Pagination,
    ) -> Result<Page<NotificationRecord>, RepositoryError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notification_history")
            .fetch_one(self.pool)
            .await?;
        let rows = sqlx::query_as::<_, NotificationRow>(
            "SELECT id, title, body, audience, data, sent_count, failed_count, sent_by, created_at
             FROM notification_history
             ORDER BY created_at DESC, id DESC
             LIMIT $1 OFFSET $2",
        )
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(self.pool)
        .await?;
        let items = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(items, total, pagination))
    }
}
