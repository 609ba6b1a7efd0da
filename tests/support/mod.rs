#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::Mutex;
use trakt_catalogs::{
    cache::Cache,
    core::{default_catalogs, Core},
    kv::{self, KeyValueStore},
    trakt::{
        self,
        auth::{
            AuthContext, Credentials, DeviceCode, DeviceFlow, OAuthApi, TokenManager,
            TokenRecord, TokenStore,
        },
    },
    utils::{unix_now, ServerError},
};
use wiremock::MockServer;

pub fn trakt_client(server: &MockServer) -> trakt::Client {
    trakt::Client {
        client: reqwest::Client::new(),
        base_url: server.uri(),
        client_id: "client-id".into(),
    }
}

pub fn credentials() -> Credentials {
    Credentials {
        client_id: "client-id".into(),
        client_secret: "client-secret".into(),
    }
}

pub fn file_store(dir: &TempDir) -> TokenStore {
    TokenStore::file(dir.path().join(".tokens.json"))
}

pub fn auth_context(server: &MockServer, store: TokenStore) -> Arc<AuthContext> {
    Arc::new(AuthContext::new(
        Arc::new(trakt_client(server)),
        store,
        credentials(),
    ))
}

pub fn core(server: &MockServer, store: TokenStore) -> Core {
    let ctx = auth_context(server, store);
    Core {
        catalogs: default_catalogs(),
        trakt: trakt_client(server),
        tokens: TokenManager::new(Arc::clone(&ctx)),
        device_flow: DeviceFlow::new(ctx),
        cache: Cache::memory(Duration::from_secs(60)),
    }
}

pub fn record(access_token: &str, created_at: i64) -> TokenRecord {
    TokenRecord {
        access_token: access_token.into(),
        refresh_token: format!("{access_token}-refresh"),
        created_at,
        expires_in: 3600,
        token_type: Some("bearer".into()),
        scope: Some("public".into()),
    }
}

pub fn fresh_record(access_token: &str) -> TokenRecord {
    record(access_token, unix_now())
}

/// In-process key-value store. TTLs are ignored.
#[derive(Default)]
pub struct MemoryKv {
    values: Mutex<HashMap<String, Value>>,
}

#[async_trait::async_trait]
impl KeyValueStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<Value>, kv::Error> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &Value, _ttl: Option<Duration>) -> Result<(), kv::Error> {
        self.values.lock().await.insert(key.to_owned(), value.clone());
        Ok(())
    }
}

pub fn memory_store() -> TokenStore {
    TokenStore::remote(Arc::new(MemoryKv::default()))
}

/// OAuth endpoints without a network: issues a fixed device code and
/// approves it on the `approve_on`-th poll, or never.
pub struct ScriptedApi {
    pub expires_in: u64,
    pub interval: u64,
    pub approve_on: Option<usize>,
    pub polls: AtomicUsize,
}

impl ScriptedApi {
    pub fn new(expires_in: u64, interval: u64, approve_on: Option<usize>) -> Arc<Self> {
        Arc::new(Self {
            expires_in,
            interval,
            approve_on,
            polls: AtomicUsize::new(0),
        })
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl OAuthApi for ScriptedApi {
    async fn device_code(&self, _client_id: &str) -> Result<DeviceCode, trakt::Error> {
        Ok(DeviceCode {
            device_code: "device-123".into(),
            user_code: "ABCD1234".into(),
            verification_url: "https://trakt.tv/activate".into(),
            expires_in: self.expires_in,
            interval: self.interval,
        })
    }

    async fn device_token(
        &self,
        _code: &str,
        _credentials: &Credentials,
    ) -> Result<TokenRecord, trakt::Error> {
        let poll = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        match self.approve_on {
            Some(n) if poll >= n => Ok(record("access-1", 1_900_000_000)),
            _ => Err(ServerError { status_code: 400 }.into()),
        }
    }

    async fn refresh_token(
        &self,
        _refresh_token: &str,
        _credentials: &Credentials,
    ) -> Result<TokenRecord, trakt::Error> {
        Err(ServerError { status_code: 401 }.into())
    }
}

pub fn scripted_context(api: Arc<ScriptedApi>, store: TokenStore) -> Arc<AuthContext> {
    Arc::new(AuthContext::new(api, store, credentials()))
}
