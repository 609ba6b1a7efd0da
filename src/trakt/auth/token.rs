use serde::{Deserialize, Serialize};

use crate::utils::unix_now;

/// Seconds shaved off the nominal lifetime so a token never expires mid-request.
pub const EXPIRY_SKEW_SECS: i64 = 60;

/// The persisted OAuth token pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp (seconds) of issue or last refresh.
    pub created_at: i64,
    /// Lifetime in seconds, counted from `created_at`.
    pub expires_in: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl TokenRecord {
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(unix_now())
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.created_at + self.expires_in - EXPIRY_SKEW_SECS
    }
}

/// Token payload as returned by the OAuth endpoints.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// The amount of time that the access token is valid (in seconds).
    pub expires_in: i64,
    /// Issue time. Stamped locally when the server leaves it out.
    pub created_at: Option<i64>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
}

impl From<TokenResponse> for TokenRecord {
    fn from(res: TokenResponse) -> Self {
        let TokenResponse {
            access_token,
            refresh_token,
            expires_in,
            created_at,
            token_type,
            scope,
        } = res;
        Self {
            access_token,
            refresh_token,
            created_at: created_at.unwrap_or_else(unix_now),
            expires_in,
            token_type,
            scope,
        }
    }
}
