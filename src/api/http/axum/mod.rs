use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::{header, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use super::ApiError;
use crate::core::{CatalogError, Core, MediaKind, Meta};

#[derive(Serialize)]
struct CatalogResponse {
    metas: Vec<Meta>,
}

/// Redirects to the verification page of a fresh device authorization.
async fn auth(Extension(core): Extension<Arc<Core>>) -> Result<Response, ApiError> {
    let verification_url = core.authorize().await?;
    Ok((StatusCode::FOUND, [(header::LOCATION, verification_url)]).into_response())
}

async fn catalog(
    Extension(core): Extension<Arc<Core>>,
    Path((kind, file)): Path<(String, String)>,
) -> Result<Json<CatalogResponse>, ApiError> {
    let unknown = || ApiError::Catalog(CatalogError::UnknownCatalog);
    let id = file.strip_suffix(".json").ok_or_else(unknown)?;
    let kind: MediaKind = kind.parse().map_err(|_| unknown())?;

    let metas = core.catalog_metas(kind, id).await?;
    Ok(Json(CatalogResponse { metas }))
}

async fn allow_any_origin(mut res: Response) -> Response {
    res.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    res
}

pub fn routes(router: Router, core: Arc<Core>) -> Router {
    router
        .route("/auth", get(auth))
        .route("/catalog/:type/:id", get(catalog))
        .layer(middleware::map_response(allow_any_origin))
        .layer(Extension(core))
}
