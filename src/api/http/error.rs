use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::{core::CatalogError, trakt::auth};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] auth::Error),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Auth(auth::Error::AuthorizationInProgress) => StatusCode::CONFLICT,
            Self::Auth(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Catalog(err) => match err {
                CatalogError::UnknownCatalog => StatusCode::NOT_FOUND,
                CatalogError::NotAuthenticated => StatusCode::UNAUTHORIZED,
                CatalogError::Upstream(_) => StatusCode::BAD_GATEWAY,
                CatalogError::Auth(_) | CatalogError::Cache(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(message = "Request failed", status = status.as_u16(), error = ?self);
        }
        let body = json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}
