//! Process-wide session context.
//!
//! Holds every live session keyed by access token and fans auth events out to
//! subscribers. Components ask the context instead of re-querying the
//! identity provider.

use chrono::{Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;

use crate::types::{AuthUser, Session};

pub type SubscriptionId = u64;

/// How long a token resolved through the provider is trusted before the
/// provider is asked again.
pub const REMEMBER_TTL_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuthEvent {
    SignedIn { user: AuthUser },
    SignedOut { user: AuthUser },
}

impl AuthEvent {
    pub fn user(&self) -> &AuthUser {
        match self {
            AuthEvent::SignedIn { user } | AuthEvent::SignedOut { user } => user,
        }
    }
}

struct Inner {
    sessions: RwLock<HashMap<String, Session>>,
    subscribers: RwLock<HashMap<SubscriptionId, mpsc::UnboundedSender<AuthEvent>>>,
    next_id: AtomicU64,
    remember_ttl: Duration,
}

#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<Inner>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::with_remember_ttl(Duration::seconds(REMEMBER_TTL_SECS))
    }
}

/// Live feed of auth events. Dropping it unsubscribes.
pub struct Subscription {
    id: SubscriptionId,
    receiver: mpsc::UnboundedReceiver<AuthEvent>,
    context: SessionContext,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub async fn recv(&mut self) -> Option<AuthEvent> {
        self.receiver.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.context.unsubscribe(self.id);
    }
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_remember_ttl(remember_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                sessions: RwLock::new(HashMap::new()),
                subscribers: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(0),
                remember_ttl,
            }),
        }
    }

    /// Stores a freshly issued session and announces the sign-in.
    pub fn register(&self, session: Session) {
        let user = session.user.clone();
        {
            let mut sessions = self
                .inner
                .sessions
                .write()
                .unwrap_or_else(|e| e.into_inner());
            prune_expired(&mut sessions);
            sessions.insert(session.access_token.clone(), session);
        }
        self.broadcast(AuthEvent::SignedIn { user });
    }

    /// Caches a token the provider vouched for, without announcing anything.
    /// The entry lapses after the remember TTL so revocations elsewhere are
    /// picked up on the next lookup.
    pub fn remember(&self, access_token: &str, user: AuthUser) {
        let mut sessions = self
            .inner
            .sessions
            .write()
            .unwrap_or_else(|e| e.into_inner());
        prune_expired(&mut sessions);
        sessions.insert(
            access_token.to_string(),
            Session {
                access_token: access_token.to_string(),
                user,
                expires_at: Some(Utc::now() + self.inner.remember_ttl),
            },
        );
    }

    pub fn lookup(&self, access_token: &str) -> Option<AuthUser> {
        let expired = {
            let sessions = self
                .inner
                .sessions
                .read()
                .unwrap_or_else(|e| e.into_inner());
            match sessions.get(access_token) {
                Some(session) if !session.is_expired() => return Some(session.user.clone()),
                Some(_) => true,
                None => false,
            }
        };

        if expired {
            let mut sessions = self
                .inner
                .sessions
                .write()
                .unwrap_or_else(|e| e.into_inner());
            sessions.remove(access_token);
        }
        None
    }

    /// Drops a session and announces the sign-out if it was known.
    pub fn remove(&self, access_token: &str) -> Option<Session> {
        let removed = self
            .inner
            .sessions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(access_token);

        if let Some(session) = &removed {
            self.broadcast(AuthEvent::SignedOut {
                user: session.user.clone(),
            });
        }
        removed
    }

    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .subscribers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, sender);

        Subscription {
            id,
            receiver,
            context: self.clone(),
        }
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner
            .subscribers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id)
            .is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn active_sessions(&self) -> usize {
        self.inner
            .sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    fn broadcast(&self, event: AuthEvent) {
        let mut subscribers = self
            .inner
            .subscribers
            .write()
            .unwrap_or_else(|e| e.into_inner());
        subscribers.retain(|_, sender| sender.send(event.clone()).is_ok());
    }
}

fn prune_expired(sessions: &mut HashMap<String, Session>) {
    sessions.retain(|_, session| !session.is_expired());
}
