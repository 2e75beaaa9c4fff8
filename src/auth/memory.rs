use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::auth::provider::{AuthError, AuthProvider};
use crate::types::{AgentId, AuthUser, Session};

const SESSION_TTL_HOURS: i64 = 1;

#[derive(Debug, Clone)]
struct Identity {
    id: AgentId,
    email: String,
    salt: String,
    password_hash: String,
}

/// In-process identity store with the same contract as the hosted provider.
#[derive(Clone, Default)]
pub struct InMemoryAuth {
    identities: Arc<RwLock<HashMap<String, Identity>>>,
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

fn poisoned() -> AuthError {
    AuthError::Backend(anyhow!("auth store lock poisoned"))
}

impl InMemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthProvider for InMemoryAuth {
    /// Never opens a session; callers sign in afterwards.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(AuthUser, Option<Session>), AuthError> {
        let email = normalize(email);
        let mut identities = self.identities.write().map_err(|_| poisoned())?;
        if identities.contains_key(&email) {
            return Err(AuthError::AlreadyRegistered);
        }

        let salt = Uuid::new_v4().simple().to_string();
        let identity = Identity {
            id: AgentId::new_v4(),
            email: email.clone(),
            password_hash: hash_password(&salt, password),
            salt,
        };
        let user = AuthUser {
            id: identity.id,
            email: identity.email.clone(),
        };
        identities.insert(email, identity);
        Ok((user, None))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let identity = {
            let identities = self.identities.read().map_err(|_| poisoned())?;
            identities.get(&normalize(email)).cloned()
        };

        let identity = match identity {
            Some(i) if hash_password(&i.salt, password) == i.password_hash => i,
            _ => return Err(AuthError::InvalidCredentials),
        };

        let session = Session {
            access_token: Uuid::new_v4().simple().to_string(),
            user: AuthUser {
                id: identity.id,
                email: identity.email,
            },
            expires_at: Some(Utc::now() + Duration::hours(SESSION_TTL_HOURS)),
        };

        let mut sessions = self.sessions.write().map_err(|_| poisoned())?;
        sessions.retain(|_, s| !s.is_expired());
        sessions.insert(session.access_token.clone(), session.clone());
        Ok(session)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let mut sessions = self.sessions.write().map_err(|_| poisoned())?;
        sessions.remove(access_token);
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<Option<AuthUser>, AuthError> {
        let sessions = self.sessions.read().map_err(|_| poisoned())?;
        Ok(sessions
            .get(access_token)
            .filter(|s| !s.is_expired())
            .map(|s| s.user.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let auth = InMemoryAuth::new();
        let (user, session) = auth.sign_up("Agent@Sole.io", "hunter22").await.unwrap();
        assert!(session.is_none());
        assert_eq!(user.email, "agent@sole.io");

        let session = auth.sign_in("agent@sole.io", "hunter22").await.unwrap();
        assert_eq!(session.user.id, user.id);

        let resolved = auth.get_user(&session.access_token).await.unwrap();
        assert_eq!(resolved, Some(user));
    }

    #[tokio::test]
    async fn test_duplicate_sign_up_rejected() {
        let auth = InMemoryAuth::new();
        auth.sign_up("a@sole.io", "pw").await.unwrap();
        let err = auth.sign_up("a@sole.io", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::AlreadyRegistered));
    }

    #[tokio::test]
    async fn test_wrong_password_message() {
        let auth = InMemoryAuth::new();
        auth.sign_up("a@sole.io", "right").await.unwrap();
        let err = auth.sign_in("a@sole.io", "wrong").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid login credentials");
    }

    #[tokio::test]
    async fn test_sign_out_revokes_token() {
        let auth = InMemoryAuth::new();
        auth.sign_up("a@sole.io", "pw").await.unwrap();
        let session = auth.sign_in("a@sole.io", "pw").await.unwrap();

        auth.sign_out(&session.access_token).await.unwrap();
        assert!(auth.get_user(&session.access_token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sign_in_prunes_expired_sessions() {
        let auth = InMemoryAuth::new();
        let (user, _) = auth.sign_up("a@sole.io", "pw").await.unwrap();
        auth.sessions.write().unwrap().insert(
            "stale".to_string(),
            Session {
                access_token: "stale".to_string(),
                user,
                expires_at: Some(Utc::now() - Duration::minutes(5)),
            },
        );

        auth.sign_in("a@sole.io", "pw").await.unwrap();

        let sessions = auth.sessions.read().unwrap();
        assert_eq!(sessions.len(), 1);
        assert!(!sessions.contains_key("stale"));
    }
}
