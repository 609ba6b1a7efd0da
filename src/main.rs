use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tracing::info;
use trakt_catalogs::{
    api::http::axum::routes,
    cache::Cache,
    core::{default_catalogs, Core},
    kv::{KeyValueStore, UpstashClient},
    trakt::{
        self,
        auth::{AuthContext, Credentials, DeviceFlow, TokenManager, TokenStore},
    },
    Config,
};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trakt_catalogs=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    let reqwest_client = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()?;

    let kv = config.kv.as_ref().map(|kv| {
        Arc::new(UpstashClient {
            client: reqwest_client.clone(),
            url: kv.url.clone(),
            token: kv.token.clone(),
        }) as Arc<dyn KeyValueStore>
    });

    let (token_store, cache) = match kv {
        Some(kv) => (
            TokenStore::remote(Arc::clone(&kv)),
            Cache::remote(kv, config.cache_ttl),
        ),
        None => (
            TokenStore::file(config.tokens_file.clone()),
            Cache::memory(config.cache_ttl),
        ),
    };
    info!(message = "Selected storage", token_store = token_store.backend());

    let trakt_client = trakt::Client {
        client: reqwest_client,
        base_url: config.trakt_api_url.clone(),
        client_id: config.client_id.clone(),
    };

    let credentials = Credentials {
        client_id: config.client_id.clone(),
        client_secret: config.client_secret.clone(),
    };
    let auth = Arc::new(AuthContext::new(
        Arc::new(trakt_client.clone()),
        token_store,
        credentials,
    ));

    let core = Arc::new(Core {
        catalogs: default_catalogs(),
        trakt: trakt_client,
        tokens: TokenManager::new(Arc::clone(&auth)),
        device_flow: DeviceFlow::new(auth),
        cache,
    });

    let app = routes(Router::new(), Arc::clone(&core));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!("Server running on port {}", config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    core.device_flow.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}
