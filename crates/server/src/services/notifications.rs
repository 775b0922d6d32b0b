//! Device registration and admin push broadcasts.

use tracing::instrument;

use stride_core::UserId;

use crate::db::notifications::NewNotification;
use crate::db::{NotificationRepository, Page, Pagination};
use crate::error::{AppError, Result};
use crate::models::notification::{
    BroadcastRequest, NotificationRecord, PushToken, PushTokenInput,
};
use crate::state::AppState;

const MAX_TITLE: usize = 100;
const MAX_BODY: usize = 500;

pub struct NotificationService<'a> {
    state: &'a AppState,
}

impl<'a> NotificationService<'a> {
    #[must_use]
    pub const fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    fn repo(&self) -> NotificationRepository<'_> {
        NotificationRepository::new(self.state.pool())
    }

    /// Register a device token, linking it to the customer when signed in.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for a token that is not an Expo token.
    pub async fn register(&self, input: &PushTokenInput, user: Option<UserId>) -> Result<PushToken> {
        if !input.is_expo_token() {
            return Err(AppError::BadRequest("invalid Expo push token".to_string()));
        }
        let platform = input.platform.trim().to_ascii_lowercase();
        Ok(self
            .repo()
            .upsert_token(input.token.trim(), &platform, user)
            .await?)
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if the delete fails.
    pub async fn unregister(&self, token: &str) -> Result<()> {
        Ok(self.repo().delete_token(token.trim()).await?)
    }

    /// Send a notification to an audience and record it.
    ///
    /// Tokens Expo reports as unregistered are removed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for an empty or oversized message.
    #[instrument(skip(self, request), fields(audience = %request.audience))]
    pub async fn broadcast(
        &self,
        request: &BroadcastRequest,
        sender: UserId,
    ) -> Result<NotificationRecord> {
        let title = request.title.trim();
        let body = request.body.trim();
        validate_message(title, body)?;

        let tokens = self.repo().tokens_for(request.audience).await?;
        let data = request.payload();
        let report = self
            .state
            .push()
            .broadcast(&tokens, title, body, data.as_ref())
            .await;

        if !report.invalid_tokens.is_empty() {
            let removed = self.repo().delete_tokens(&report.invalid_tokens).await?;
            tracing::info!(removed, "Removed unregistered push tokens");
        }

        let record = self
            .repo()
            .record(&NewNotification {
                title,
                body,
                audience: request.audience,
                data: data.as_ref(),
                sent_count: report.sent,
                failed_count: report.failed,
                sent_by: Some(sender),
            })
            .await?;

        tracing::info!(
            tokens = tokens.len(),
            sent = report.sent,
            failed = report.failed,
            "Broadcast finished"
        );
        Ok(record)
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn history(&self, pagination: Pagination) -> Result<Page<NotificationRecord>> {
        Ok(self.repo().history(pagination).await?)
    }
}

fn validate_message(title: &str, body: &str) -> Result<()> {
    if title.is_empty() || body.is_empty() {
        return Err(AppError::BadRequest(
            "title and body are required".to_string(),
        ));
    }
    if title.chars().count() > MAX_TITLE {
        return Err(AppError::BadRequest(format!(
            "title must be at most {MAX_TITLE} characters"
        )));
    }
    if body.chars().count() > MAX_BODY {
        return Err(AppError::BadRequest(format!(
            "body must be at most {MAX_BODY} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_message() {
        assert!(validate_message("Sale", "40% off runners").is_ok());
        assert!(validate_message("", "body").is_err());
        assert!(validate_message("title", "").is_err());
        assert!(validate_message(&"t".repeat(MAX_TITLE + 1), "body").is_err());
        assert!(validate_message("title", &"b".repeat(MAX_BODY + 1)).is_err());
    }
}
