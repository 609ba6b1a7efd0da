//! Catalog result cache: the remote key-value store when configured,
//! otherwise a process-local map.

use std::{collections::HashMap, sync::Arc, time::Duration};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::{sync::Mutex, time::Instant};
use tracing::debug;

use crate::kv::{self, KeyValueStore};

pub const DEFAULT_TTL: Duration = Duration::from_secs(12 * 60 * 60);

pub struct Entry {
    value: Value,
    expires_at: Instant,
}

pub enum Cache {
    Remote {
        kv: Arc<dyn KeyValueStore>,
        ttl: Duration,
    },
    Memory {
        entries: Mutex<HashMap<String, Entry>>,
        ttl: Duration,
    },
}

impl Cache {
    pub fn remote(kv: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self::Remote { kv, ttl }
    }

    pub fn memory(ttl: Duration) -> Self {
        Self::Memory {
            entries: Mutex::default(),
            ttl,
        }
    }

    /// A live entry decoding as `T`. Anything else is a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, kv::Error> {
        let value = match self {
            Self::Remote { kv, .. } => kv.get(key).await?,
            Self::Memory { entries, .. } => {
                let mut entries = entries.lock().await;
                match entries.get(key) {
                    Some(entry) if Instant::now() < entry.expires_at => Some(entry.value.clone()),
                    Some(_) => {
                        entries.remove(key);
                        None
                    }
                    None => None,
                }
            }
        };

        let hit = value.and_then(|value| serde_json::from_value(value).ok());
        debug!(message = "Cache lookup", key, hit = hit.is_some());
        Ok(hit)
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), kv::Error> {
        let value = serde_json::to_value(value)?;
        match self {
            Self::Remote { kv, ttl } => kv.set(key, &value, Some(*ttl)).await?,
            Self::Memory { entries, ttl } => {
                let entry = Entry {
                    value,
                    expires_at: Instant::now() + *ttl,
                };
                entries.lock().await.insert(key.to_owned(), entry);
            }
        }
        Ok(())
    }
}
