pub mod error;
pub mod guard;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use guard::{GuardDecision, RouteGuard};
pub use server::{create_router, serve, AppState};
