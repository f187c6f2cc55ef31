//! HTTP service around the theft scoring engine

pub mod api;
pub mod config;
pub mod error;

pub use api::{create_router, serve, AppState};
pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
