//! Optional remote key-value store shared by the token store and the catalog cache.

use std::time::Duration;

use crate::utils::ServerError;

#[cfg(test)]
pub(crate) mod test_utils;
pub mod upstash;

pub use upstash::UpstashClient;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("reqwest: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("server: {0}")]
    Server(#[from] ServerError),
    #[error("command failed: {0}")]
    Command(String),
    #[error("serialize: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Minimal JSON key-value interface.
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, Error>;

    /// Overwrite `key`; a `ttl` makes the entry expire server-side.
    async fn set(
        &self,
        key: &str,
        value: &serde_json::Value,
        ttl: Option<Duration>,
    ) -> Result<(), Error>;
}
