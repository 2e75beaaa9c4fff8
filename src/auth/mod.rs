pub mod gateway;
pub mod hosted;
pub mod memory;
pub mod provider;
pub mod session;

pub use gateway::AuthGateway;
pub use provider::{AuthError, AuthProvider};
pub use session::{AuthEvent, SessionContext, Subscription, SubscriptionId, REMEMBER_TTL_SECS};
