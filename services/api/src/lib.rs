//! HTTP service for GIF to WebM sticker conversion and GIF editing

pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod state;
pub mod sweeper;
pub mod upload;
pub mod validation;

pub use crate::config::AppConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
