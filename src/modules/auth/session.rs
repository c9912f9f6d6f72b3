use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::interface::{AuthError, Result, TokenRepository};
use super::model::TokenRecord;

/// Server-side record of the currently-valid token pair per (user, client
/// app type), enabling revocation independent of token expiry.
///
/// The whole feature sits behind a flag. When disabled every operation is a
/// no-op that reports success: "tracking disabled" means "everything is
/// valid", never a hard dependency.
pub struct SessionTracker {
    enabled: bool,
    tokens: Arc<dyn TokenRepository>,
}

impl SessionTracker {
    pub fn new(enabled: bool, tokens: Arc<dyn TokenRepository>) -> Self {
        Self { enabled, tokens }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Overwrites the active record for (user, app type). Last writer wins:
    /// a second login for the same client silently invalidates the first
    /// session's tokens.
    pub async fn save(
        &self,
        user_id: &str,
        access_token: &str,
        refresh_token: &str,
        ip_address: &str,
        app_type: Option<&str>,
    ) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let now = Utc::now();
        let record = TokenRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            ip_address: ip_address.to_string(),
            app_type: app_type.unwrap_or_default().to_string(),
            active: true,
            created_at: now,
            updated_at: now,
        };

        self.tokens.upsert(&record).await
    }

    pub async fn verify_access(
        &self,
        user_id: &str,
        access_token: &str,
    ) -> Result<Option<TokenRecord>> {
        if !self.enabled {
            return Ok(None);
        }

        let record = self
            .tokens
            .get_active_by_user_and_access_token(user_id, access_token)
            .await?;

        match record {
            Some(record) => Ok(Some(record)),
            None => Err(AuthError::Unauthorized),
        }
    }

    pub async fn verify_refresh(
        &self,
        user_id: &str,
        refresh_token: &str,
    ) -> Result<Option<TokenRecord>> {
        if !self.enabled {
            return Ok(None);
        }

        let record = self
            .tokens
            .get_active_by_user_and_refresh_token(user_id, refresh_token)
            .await?;

        match record {
            Some(record) => Ok(Some(record)),
            None => Err(AuthError::RefreshInvalid),
        }
    }

    /// Logout: flips the record inactive, but only after the caller proved
    /// possession of the currently-active access token.
    pub async fn disable(&self, user_id: &str, access_token: &str) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let Some(record) = self.verify_access(user_id, access_token).await? else {
            return Ok(());
        };

        self.tokens.deactivate(&record.id).await
    }
}
