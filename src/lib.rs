pub mod api;
pub mod auth;
pub mod config;
pub mod engine;
pub mod error;
pub mod hosted;
pub mod i18n;
pub mod lifecycle;
pub mod storage;
pub mod types;

pub use config::Config;
pub use error::{ServiceError, ServiceResult};
pub use types::*;
