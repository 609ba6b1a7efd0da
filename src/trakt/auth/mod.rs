//! Authorization logic.
//!
//! The device-code flow obtains the first token pair, the token manager
//! hands out access tokens and refreshes them once they expire. Both write
//! through the same [`TokenStore`], serialized by [`AuthContext`].

use std::{fmt, sync::Arc};

use serde::Deserialize;
use tokio::sync::{Mutex, MutexGuard};

pub mod device_flow;
pub mod refresh;
pub mod store;
pub mod token;
pub mod token_manager;

pub use device_flow::{AuthorizationStatus, DeviceFlow};
pub use store::TokenStore;
pub use token::{TokenRecord, TokenResponse};
pub use token_manager::TokenManager;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to get device code: {0}")]
    DeviceCodeRequest(#[source] crate::trakt::Error),
    #[error("device code expired")]
    DeviceCodeExpired,
    #[error("authorization already in progress")]
    AuthorizationInProgress,
    #[error("refresh failed")]
    RefreshFailed(#[source] crate::trakt::Error),
    #[error("token store: {0}")]
    Store(#[from] store::Error),
}

/// Response of the device-code endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceCode {
    pub device_code: String,
    pub user_code: String,
    pub verification_url: String,
    /// Seconds until `device_code` stops being accepted.
    pub expires_in: u64,
    /// Seconds to wait between polls.
    pub interval: u64,
}

impl DeviceCode {
    /// Page the user opens to approve this device.
    pub fn user_url(&self) -> String {
        format!("{}/{}", self.verification_url, self.user_code)
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// The remote OAuth endpoints the auth subsystem depends on.
#[async_trait::async_trait]
pub trait OAuthApi: Send + Sync {
    async fn device_code(&self, client_id: &str) -> Result<DeviceCode, crate::trakt::Error>;

    /// Exchange an approved device code. Fails while approval is pending.
    async fn device_token(
        &self,
        code: &str,
        credentials: &Credentials,
    ) -> Result<TokenRecord, crate::trakt::Error>;

    async fn refresh_token(
        &self,
        refresh_token: &str,
        credentials: &Credentials,
    ) -> Result<TokenRecord, crate::trakt::Error>;
}

/// State shared by the token manager and the device flow.
pub struct AuthContext {
    pub api: Arc<dyn OAuthApi>,
    pub store: TokenStore,
    pub credentials: Credentials,
    writer: Mutex<()>,
}

impl AuthContext {
    pub fn new(api: Arc<dyn OAuthApi>, store: TokenStore, credentials: Credentials) -> Self {
        Self {
            api,
            store,
            credentials,
            writer: Mutex::const_new(()),
        }
    }

    /// Held by anything that may write to the store.
    pub(crate) async fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().await
    }
}
