use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    cache::Cache,
    kv,
    trakt::{
        self,
        auth::{self, DeviceFlow, TokenManager},
        model::{Item, ListItem},
    },
};

pub type CatalogId = String;
pub type CatalogIdRef = str;

pub struct Core {
    pub catalogs: Vec<CatalogEntry>,
    pub trakt: trakt::Client,
    pub tokens: TokenManager,
    pub device_flow: DeviceFlow,
    pub cache: Cache,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Unknown catalog")]
    UnknownCatalog,
    #[error("Not authenticated. Visit /auth to authorize.")]
    NotAuthenticated,
    #[error(transparent)]
    Auth(#[from] auth::Error),
    #[error("Failed to fetch from Trakt")]
    Upstream(#[source] trakt::Error),
    #[error("cache: {0}")]
    Cache(#[from] kv::Error),
}

impl Core {
    pub fn catalog(&self, kind: MediaKind, id: &CatalogIdRef) -> Option<&CatalogEntry> {
        self.catalogs
            .iter()
            .find(|entry| entry.kind == kind && entry.id() == id)
    }

    /// Start a device authorization and return the page the user must visit.
    pub async fn authorize(&self) -> Result<String, auth::Error> {
        self.device_flow.start().await
    }

    pub async fn catalog_metas(
        &self,
        kind: MediaKind,
        id: &CatalogIdRef,
    ) -> Result<Vec<Meta>, CatalogError> {
        let entry = self.catalog(kind, id).ok_or(CatalogError::UnknownCatalog)?;
        let cache_key = entry.id();

        let metas = match &entry.source {
            Source::Recommended => {
                let access_token = self
                    .tokens
                    .get_access_token()
                    .await?
                    .ok_or(CatalogError::NotAuthenticated)?;

                if let Some(cached) = self.cache.get(&cache_key).await? {
                    return Ok(cached);
                }

                self.trakt
                    .recommendations(entry.kind, &access_token)
                    .await
                    .map_err(CatalogError::Upstream)?
                    .into_iter()
                    .map(|item| Meta::from_item(item, entry.kind))
                    .collect::<Vec<_>>()
            }
            Source::List { username, slug } => {
                if let Some(cached) = self.cache.get(&cache_key).await? {
                    return Ok(cached);
                }

                self.trakt
                    .list_items(entry.kind, username, slug)
                    .await
                    .map_err(CatalogError::Upstream)?
                    .into_iter()
                    .filter_map(ListItem::into_item)
                    .map(|item| Meta::from_item(item, entry.kind))
                    .collect::<Vec<_>>()
            }
        };

        info!(message = "Fetched catalog", catalog = %cache_key, metas = metas.len());
        self.cache.set(&cache_key, &metas).await?;
        Ok(metas)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Series,
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown media type")]
pub struct MediaKindParsingError;

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Series => "series",
        }
    }

    /// Trakt's collection path segment (`/recommendations/movies`).
    pub fn plural_segment(self) -> &'static str {
        match self {
            Self::Movie => "movies",
            Self::Series => "shows",
        }
    }

    /// Trakt's item type segment (`/items/movie`).
    pub fn singular_segment(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Series => "show",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = MediaKindParsingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(Self::Movie),
            "series" => Ok(Self::Series),
            _ => Err(MediaKindParsingError),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// The authorized user's personal recommendations.
    Recommended,
    /// A public list, no authorization needed.
    List { username: String, slug: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub kind: MediaKind,
    pub name: String,
    pub source: Source,
}

impl CatalogEntry {
    pub fn recommended(kind: MediaKind, name: &str) -> Self {
        Self {
            kind,
            name: name.to_owned(),
            source: Source::Recommended,
        }
    }

    pub fn list(kind: MediaKind, name: &str, username: &str, slug: &str) -> Self {
        Self {
            kind,
            name: name.to_owned(),
            source: Source::List {
                username: username.to_owned(),
                slug: slug.to_owned(),
            },
        }
    }

    pub fn id(&self) -> CatalogId {
        match &self.source {
            Source::Recommended => format!("trakt-recommended-{}", self.kind),
            Source::List { username, slug } => format!("trakt-list-{username}-{slug}"),
        }
    }
}

pub fn default_catalogs() -> Vec<CatalogEntry> {
    use MediaKind::{Movie, Series};

    vec![
        CatalogEntry::list(
            Movie,
            "Curated Recommendations",
            "testabhi",
            "recommended-movies-couchmoney-tv",
        ),
        CatalogEntry::list(
            Series,
            "Curated Recommendations",
            "testabhi",
            "recommended-shows-couchmoney-tv",
        ),
        CatalogEntry::recommended(Movie, "Trakt Recommendations"),
        CatalogEntry::recommended(Series, "Trakt Recommendations"),
        CatalogEntry::list(Movie, "Trakt Trending", "tvgeniekodi", "trending-movies"),
        CatalogEntry::list(Series, "Trakt Trending", "tvgeniekodi", "trending-shows"),
        CatalogEntry::list(Movie, "Trakt Popular", "justin", "trakt-popular-movies"),
        CatalogEntry::list(Series, "Trakt Popular", "justin", "trakt-popular-tv-shows"),
    ]
}

/// A catalog item in the shape clients render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imdb_rating: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
}

impl Meta {
    pub fn from_item(item: Item, kind: MediaKind) -> Self {
        let id = item.ids.imdb.filter(|imdb| !imdb.is_empty());
        let poster = id
            .as_ref()
            .map(|imdb| format!("https://images.metahub.space/poster/medium/{imdb}/img"));
        Self {
            id,
            kind,
            name: item.title,
            poster,
            description: item.overview,
            release_info: item.year.map(|year| year.to_string()),
            imdb_rating: item.rating.map(format_rating),
            genres: item.genres,
            runtime: item
                .runtime
                .filter(|minutes| *minutes > 0)
                .map(|minutes| format!("{minutes}m")),
        }
    }
}

/// One decimal, ties rounded away from zero.
fn format_rating(rating: f64) -> String {
    format!("{:.1}", (rating * 10.0).round() / 10.0)
}
