//! Trakt API client.

use reqwest::Method;
use serde::Serialize;
use tracing::debug;

use self::auth::{Credentials, DeviceCode, TokenRecord, TokenResponse};
use crate::{
    core::MediaKind,
    utils::{check_status, ServerError},
};

pub mod auth;

pub const DEFAULT_API_URL: &str = "https://api.trakt.tv";
const API_VERSION: &str = "2";
/// Out-of-band redirect marker required by the token endpoint.
const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("reqwest: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("server: {0}")]
    Server(#[from] ServerError),
}

#[derive(Clone)]
pub struct Client {
    pub client: reqwest::Client,
    pub base_url: String,
    pub client_id: String,
}

impl Client {
    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.build_url(path))
            .header("trakt-api-version", API_VERSION)
            .header("trakt-api-key", &self.client_id)
    }

    async fn exec(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, Error> {
        let res = builder.send().await?;
        check_status(&res)?;
        Ok(res)
    }

    async fn parse_json<T>(res: reqwest::Response) -> Result<T, Error>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        res.json().await.map_err(Error::Reqwest)
    }

    async fn post_token<B: Serialize>(&self, path: &str, body: &B) -> Result<TokenRecord, Error> {
        let res = self.exec(self.request(Method::POST, path).json(body)).await?;
        let token: TokenResponse = Self::parse_json(res).await?;
        Ok(token.into())
    }

    /// Personal recommendations for the user owning `access_token`.
    pub async fn recommendations(
        &self,
        kind: MediaKind,
        access_token: &str,
    ) -> Result<Vec<model::Item>, Error> {
        let path = format!("/recommendations/{}", kind.plural_segment());
        let builder = self
            .request(Method::GET, &path)
            .query(&[("limit", "100"), ("extended", "full")])
            .bearer_auth(access_token);
        let res = self.exec(builder).await?;
        Self::parse_json(res).await
    }

    /// Items of a public user list, restricted to one media kind.
    pub async fn list_items(
        &self,
        kind: MediaKind,
        username: &str,
        slug: &str,
    ) -> Result<Vec<model::ListItem>, Error> {
        let path = format!(
            "/users/{username}/lists/{slug}/items/{segment}",
            segment = kind.singular_segment(),
        );
        let builder = self
            .request(Method::GET, &path)
            .query(&[("extended", "full")]);
        let res = self.exec(builder).await?;
        Self::parse_json(res).await
    }
}

#[async_trait::async_trait]
impl auth::OAuthApi for Client {
    async fn device_code(&self, client_id: &str) -> Result<DeviceCode, Error> {
        let body = serde_json::json!({ "client_id": client_id });
        let res = self
            .exec(self.request(Method::POST, "/oauth/device/code").json(&body))
            .await?;
        let code: DeviceCode = Self::parse_json(res).await?;
        debug!(message = "Got device code", expires_in = code.expires_in);
        Ok(code)
    }

    async fn device_token(
        &self,
        code: &str,
        credentials: &Credentials,
    ) -> Result<TokenRecord, Error> {
        let body = serde_json::json!({
            "code": code,
            "client_id": credentials.client_id,
            "client_secret": credentials.client_secret,
        });
        self.post_token("/oauth/device/token", &body).await
    }

    async fn refresh_token(
        &self,
        refresh_token: &str,
        credentials: &Credentials,
    ) -> Result<TokenRecord, Error> {
        let body = serde_json::json!({
            "refresh_token": refresh_token,
            "client_id": credentials.client_id,
            "client_secret": credentials.client_secret,
            "redirect_uri": OOB_REDIRECT_URI,
            "grant_type": "refresh_token",
        });
        self.post_token("/oauth/token", &body).await
    }
}

pub mod model {
    use serde::{Deserialize, Serialize};

    #[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Ids {
        pub imdb: Option<String>,
    }

    /// A movie or show in `extended=full` form.
    #[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Item {
        pub title: Option<String>,
        pub year: Option<u32>,
        #[serde(default)]
        pub ids: Ids,
        pub overview: Option<String>,
        pub rating: Option<f64>,
        pub genres: Option<Vec<String>>,
        /// Minutes.
        pub runtime: Option<u32>,
    }

    #[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct ListItem {
        #[serde(rename = "type")]
        pub kind: String,
        pub movie: Option<Item>,
        pub show: Option<Item>,
    }

    impl ListItem {
        pub fn into_item(self) -> Option<Item> {
            if self.kind == "movie" {
                self.movie
            } else {
                self.show
            }
        }
    }
}
