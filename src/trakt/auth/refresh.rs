//! Exchange a stored refresh token for a new token pair.

use tracing::{info, warn};

use super::{Credentials, Error, OAuthApi, TokenRecord};

/// Mint a new record from `record.refresh_token`.
///
/// Failures are returned as [`Error::RefreshFailed`] and never retried here:
/// a dead refresh token needs a new device authorization.
pub async fn refresh(
    api: &dyn OAuthApi,
    record: &TokenRecord,
    credentials: &Credentials,
) -> Result<TokenRecord, Error> {
    match api.refresh_token(&record.refresh_token, credentials).await {
        Ok(refreshed) => {
            info!(
                message = "Refreshed access token",
                created_at = refreshed.created_at,
                expires_in = refreshed.expires_in,
            );
            Ok(refreshed)
        }
        Err(err) => {
            warn!(message = "Token refresh rejected", error = %err);
            Err(Error::RefreshFailed(err))
        }
    }
}
