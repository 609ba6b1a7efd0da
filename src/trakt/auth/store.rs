//! Persistence for the single token record.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::TokenRecord;
use crate::kv::{self, KeyValueStore};

/// Key holding the record when the remote store is in use.
pub const TOKENS_KEY: &str = "trakt:tokens";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("kv: {0}")]
    Kv(#[from] kv::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialize: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Where the token record lives. Picked once at startup.
#[derive(Clone)]
pub enum TokenStore {
    Remote(Arc<dyn KeyValueStore>),
    File(PathBuf),
}

impl TokenStore {
    pub fn remote(kv: Arc<dyn KeyValueStore>) -> Self {
        Self::Remote(kv)
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn backend(&self) -> &'static str {
        match self {
            Self::Remote(_) => "remote",
            Self::File(_) => "file",
        }
    }

    /// Load the stored record. A missing or unreadable record is `None`.
    pub async fn load(&self) -> Result<Option<TokenRecord>, Error> {
        match self {
            Self::Remote(kv) => {
                let value = match kv.get(TOKENS_KEY).await? {
                    Some(value) => value,
                    None => return Ok(None),
                };
                match serde_json::from_value(value) {
                    Ok(record) => Ok(Some(record)),
                    Err(err) => {
                        warn!(
                            message = "Ignoring corrupt token record",
                            backend = "remote",
                            error = %err,
                        );
                        Ok(None)
                    }
                }
            }
            Self::File(path) => Ok(load_file(path).await),
        }
    }

    /// Replace the stored record.
    pub async fn save(&self, record: &TokenRecord) -> Result<(), Error> {
        match self {
            Self::Remote(kv) => {
                let value = serde_json::to_value(record)?;
                kv.set(TOKENS_KEY, &value, None).await?;
            }
            Self::File(path) => save_file(path, record).await?,
        }
        debug!(
            message = "Saved token record",
            backend = self.backend(),
            created_at = record.created_at,
        );
        Ok(())
    }
}

async fn load_file(path: &Path) -> Option<TokenRecord> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
        Err(err) => {
            warn!(
                message = "Unable to read token file",
                path = %path.display(),
                error = %err,
            );
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(record) => Some(record),
        Err(err) => {
            warn!(
                message = "Ignoring corrupt token record",
                path = %path.display(),
                error = %err,
            );
            None
        }
    }
}

/// Write next to the target and rename over it so readers never see a partial file.
async fn save_file(path: &Path, record: &TokenRecord) -> Result<(), Error> {
    let serialized = serde_json::to_string_pretty(record)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    // A leftover temp file would keep its old mode, so start from scratch.
    match tokio::fs::remove_file(&tmp).await {
        Err(err) if err.kind() != std::io::ErrorKind::NotFound => return Err(err.into()),
        _ => {}
    }

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(&tmp).await?;
    file.write_all(serialized.as_bytes()).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
