use async_trait::async_trait;
use thiserror::Error;

use crate::types::{AuthUser, Session};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid login credentials")]
    InvalidCredentials,
    #[error("User already registered")]
    AlreadyRegistered,
    #[error("Invalid or expired session")]
    InvalidSession,
    /// Message returned by the identity provider, shown as-is.
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Identity operations the hosted backend exposes.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The session is present when the provider signs the new identity in
    /// straight away.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(AuthUser, Option<Session>), AuthError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;
    /// `None` when the token is unknown, revoked or expired.
    async fn get_user(&self, access_token: &str) -> Result<Option<AuthUser>, AuthError>;
}
