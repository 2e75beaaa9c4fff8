use regex::Regex;
use std::sync::{Arc, OnceLock};

use crate::auth::provider::{AuthError, AuthProvider};
use crate::auth::session::{SessionContext, Subscription};
use crate::error::{ServiceError, ServiceResult};
use crate::storage::{act_as, Storage};
use crate::types::{AuthUser, Profile, Session};

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
    })
}

/// Sign-up / sign-in / sign-out / current-user, backed by the identity
/// provider and fronted by the shared [`SessionContext`].
#[derive(Clone)]
pub struct AuthGateway {
    provider: Arc<dyn AuthProvider>,
    storage: Arc<dyn Storage>,
    sessions: SessionContext,
}

impl AuthGateway {
    pub fn new(
        provider: Arc<dyn AuthProvider>,
        storage: Arc<dyn Storage>,
        sessions: SessionContext,
    ) -> Self {
        Self {
            provider,
            storage,
            sessions,
        }
    }

    pub fn sessions(&self) -> &SessionContext {
        &self.sessions
    }

    fn validate_credentials(email: &str, password: &str) -> ServiceResult<()> {
        if !email_pattern().is_match(email.trim()) {
            return Err(ServiceError::Validation(format!(
                "'{}' is not a valid email address",
                email
            )));
        }
        if password.is_empty() {
            return Err(ServiceError::Validation("password must not be empty".to_string()));
        }
        Ok(())
    }

    /// Creates the identity, then exactly one profile row with defaults.
    pub async fn sign_up(&self, email: &str, password: &str) -> ServiceResult<(AuthUser, Profile)> {
        Self::validate_credentials(email, password)?;

        let (user, session) = self.provider.sign_up(email, password).await?;
        let profile = Profile::new(user.id);

        let token = session.map(|s| s.access_token);
        if let Err(e) = act_as(token, self.storage.create_profile(&profile)).await {
            log::error!("identity {} created but profile insert failed: {}", user.id, e);
            return Err(e.into());
        }

        log::info!("agent {} signed up", user.email);
        Ok((user, profile))
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> ServiceResult<Session> {
        let session = match self.provider.sign_in(email, password).await {
            Ok(session) => session,
            Err(AuthError::Backend(e)) => return Err(ServiceError::Backend(e)),
            Err(e) => return Err(ServiceError::Unauthorized(e.to_string())),
        };

        log::info!("agent {} signed in", session.user.email);
        self.sessions.register(session.clone());
        Ok(session)
    }

    pub async fn sign_out(&self, access_token: &str) -> ServiceResult<()> {
        self.provider.sign_out(access_token).await?;
        if let Some(session) = self.sessions.remove(access_token) {
            log::info!("agent {} signed out", session.user.email);
        }
        Ok(())
    }

    /// Resolves a token, consulting the provider only on a context miss.
    pub async fn current_user(&self, access_token: &str) -> ServiceResult<Option<AuthUser>> {
        if let Some(user) = self.sessions.lookup(access_token) {
            return Ok(Some(user));
        }

        match self.provider.get_user(access_token).await? {
            Some(user) => {
                self.sessions.remember(access_token, user.clone());
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    pub fn subscribe(&self) -> Subscription {
        self.sessions.subscribe()
    }
}
