use std::{collections::HashMap, time::Duration};

use serde_json::Value;
use tokio::sync::Mutex;

use super::{Error, KeyValueStore};

/// In-process store double. TTLs are ignored.
#[derive(Default)]
pub struct MemoryKv {
    pub values: Mutex<HashMap<String, Value>>,
}

#[async_trait::async_trait]
impl KeyValueStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<Value>, Error> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &Value, _ttl: Option<Duration>) -> Result<(), Error> {
        self.values.lock().await.insert(key.to_owned(), value.clone());
        Ok(())
    }
}
