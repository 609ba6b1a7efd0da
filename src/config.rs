use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};

use crate::{cache, trakt};

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Application configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,

    // ── Trakt ───────────────────────────────────────────────────────────
    pub client_id: String,
    pub client_secret: String,
    pub trakt_api_url: String,
    /// Applies to every outbound request, token refresh included.
    pub http_timeout: Duration,

    // ── Storage ─────────────────────────────────────────────────────────
    /// Remote key-value store. When absent, tokens go to `tokens_file`
    /// and the catalog cache stays in memory.
    pub kv: Option<KvConfig>,
    pub tokens_file: PathBuf,
    pub cache_ttl: Duration,
}

#[derive(Clone)]
pub struct KvConfig {
    pub url: String,
    pub token: String,
}

impl std::fmt::Debug for KvConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvConfig")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let kv = match (var("KV_REST_API_URL"), var("KV_REST_API_TOKEN")) {
            (Some(url), Some(token)) => Some(KvConfig { url, token }),
            _ => None,
        };

        // Unparsable or zero TTL falls back to the default.
        let cache_ttl = var("CACHE_TTL_SECONDS")
            .and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(cache::DEFAULT_TTL);

        // A zero timeout would fail every request, so it means "default".
        let http_timeout = match var("HTTP_TIMEOUT_SECS") {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .context("Invalid HTTP_TIMEOUT_SECS")?,
            None => 0,
        };
        let http_timeout = match http_timeout {
            0 => DEFAULT_HTTP_TIMEOUT,
            secs => Duration::from_secs(secs),
        };

        Ok(Config {
            port: var("PORT")
                .unwrap_or_else(|| "3000".into())
                .parse()
                .context("Invalid PORT")?,

            client_id: var("TRAKT_CLIENT_ID").context("TRAKT_CLIENT_ID is required")?,
            client_secret: var("TRAKT_CLIENT_SECRET")
                .context("TRAKT_CLIENT_SECRET is required")?,
            trakt_api_url: var("TRAKT_API_URL")
                .unwrap_or_else(|| trakt::DEFAULT_API_URL.into()),
            http_timeout,

            kv,
            tokens_file: var("TOKENS_FILE")
                .unwrap_or_else(|| ".tokens.json".into())
                .into(),
            cache_ttl,
        })
    }
}
