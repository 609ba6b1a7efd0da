//! Redis over the Upstash REST protocol.
//!
//! Each command is posted as a JSON array (`["GET", key]`) and answered with
//! `{"result": ...}` or `{"error": "..."}`. Values are stored as JSON text.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::Error;
use crate::utils::check_status;

#[derive(Clone)]
pub struct UpstashClient {
    pub client: reqwest::Client,
    pub url: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
struct CommandResponse {
    #[serde(default)]
    result: Value,
    error: Option<String>,
}

impl UpstashClient {
    async fn command(&self, args: Vec<Value>) -> Result<Value, Error> {
        let res = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&args)
            .send()
            .await?;
        check_status(&res)?;
        let body: CommandResponse = res.json().await?;
        if let Some(error) = body.error {
            return Err(Error::Command(error));
        }
        Ok(body.result)
    }
}

#[async_trait::async_trait]
impl super::KeyValueStore for UpstashClient {
    async fn get(&self, key: &str) -> Result<Option<Value>, Error> {
        let result = self.command(vec!["GET".into(), key.into()]).await?;
        let raw = match result {
            Value::Null => {
                debug!(message = "Key not found", key);
                return Ok(None);
            }
            Value::String(raw) => raw,
            other => return Ok(Some(other)),
        };
        // Plain strings written by other clients are not JSON.
        let value = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
        Ok(Some(value))
    }

    async fn set(&self, key: &str, value: &Value, ttl: Option<Duration>) -> Result<(), Error> {
        let mut args: Vec<Value> = vec![
            "SET".into(),
            key.into(),
            serde_json::to_string(value)?.into(),
        ];
        if let Some(ttl) = ttl {
            args.push("EX".into());
            args.push(ttl.as_secs().max(1).into());
        }
        self.command(args).await?;
        Ok(())
    }
}
