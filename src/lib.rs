//! Trakt catalog gateway.
//!
//! Serves Trakt lists and personal recommendations as catalog JSON. Access
//! to recommendations goes through the device-code authorization in
//! [`trakt::auth`].

pub mod api;
pub mod cache;
pub mod config;
pub mod core;
pub mod kv;
pub mod trakt;
pub mod utils;

pub use config::Config;
