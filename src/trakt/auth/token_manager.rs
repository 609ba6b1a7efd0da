use std::sync::Arc;

use tracing::{debug, info};

use super::{refresh::refresh, AuthContext, Error};

/// Hands out access tokens, refreshing the stored pair when it has expired.
pub struct TokenManager {
    ctx: Arc<AuthContext>,
}

impl TokenManager {
    pub fn new(ctx: Arc<AuthContext>) -> Self {
        Self { ctx }
    }

    /// A usable access token, or `None` when nobody has authorized yet.
    ///
    /// An expired token whose refresh fails is an error, not `None`.
    pub async fn get_access_token(&self) -> Result<Option<String>, Error> {
        // Fresh reads never wait on a writer.
        let record = match self.ctx.store.load().await? {
            Some(record) => record,
            None => {
                debug!(message = "No stored token", backend = self.ctx.store.backend());
                return Ok(None);
            }
        };
        if !record.is_expired() {
            debug!(
                message = "Using preexisting token",
                token_created_at = record.created_at,
                token_expires_in = record.expires_in,
            );
            return Ok(Some(record.access_token));
        }

        let _writer = self.ctx.lock_writes().await;

        // Another caller may have refreshed while we waited.
        let record = match self.ctx.store.load().await? {
            Some(record) if !record.is_expired() => {
                debug!(message = "Token refreshed by another caller");
                return Ok(Some(record.access_token));
            }
            Some(record) => record,
            None => return Ok(None),
        };

        info!(
            message = "Stored token expired, refreshing",
            token_created_at = record.created_at,
            token_expires_in = record.expires_in,
        );

        let new_record = refresh(self.ctx.api.as_ref(), &record, &self.ctx.credentials).await?;
        self.ctx.store.save(&new_record).await?;

        debug!(message = "Got new token", token_created_at = new_record.created_at);

        Ok(Some(new_record.access_token))
    }
}
