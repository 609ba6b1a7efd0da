pub mod axum;
mod error;

pub use error::ApiError;
