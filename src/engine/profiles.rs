use std::sync::Arc;

use crate::engine::audit::AuditLog;
use crate::error::{ServiceError, ServiceResult};
use crate::storage::Storage;
use crate::types::{AuthUser, EventType, Profile};

#[derive(Clone)]
pub struct ProfileService {
    storage: Arc<dyn Storage>,
    audit: AuditLog,
}

impl ProfileService {
    pub fn new(storage: Arc<dyn Storage>, audit: AuditLog) -> Self {
        Self { storage, audit }
    }

    pub async fn get(&self, user: &AuthUser) -> ServiceResult<Profile> {
        self.storage
            .get_profile(user.id)
            .await?
            .ok_or_else(|| ServiceError::not_found("profile", user.id))
    }

    /// Only the display name is editable here; the score is earned.
    pub async fn rename(&self, user: &AuthUser, full_name: &str) -> ServiceResult<Profile> {
        let full_name = full_name.trim();
        if full_name.is_empty() {
            return Err(ServiceError::Validation("name must not be empty".to_string()));
        }

        let mut profile = self.get(user).await?;
        if profile.full_name == full_name {
            return Ok(profile);
        }

        let previous = std::mem::replace(&mut profile.full_name, full_name.to_string());
        self.storage.update_profile(&profile).await?;
        self.audit
            .record(
                user,
                EventType::ProfileUpdated,
                None,
                format!("Name changed from '{}' to '{}'", previous, profile.full_name),
            )
            .await?;

        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::InMemoryStore;
    use crate::types::AgentId;

    async fn setup() -> (ProfileService, Arc<InMemoryStore>, AuthUser) {
        let store = Arc::new(InMemoryStore::new());
        let storage = store.clone() as Arc<dyn Storage>;
        let user = AuthUser {
            id: AgentId::new_v4(),
            email: "agent@sole.io".to_string(),
        };
        store.create_profile(&Profile::new(user.id)).await.unwrap();
        let service = ProfileService::new(storage.clone(), AuditLog::new(storage));
        (service, store, user)
    }

    #[tokio::test]
    async fn test_rename_updates_name_only() {
        let (service, store, user) = setup().await;

        let profile = service.rename(&user, "  Ghost  ").await.unwrap();
        assert_eq!(profile.full_name, "Ghost");
        assert_eq!(profile.credibility_score, 50);

        let logs = store.recent_logs(10).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].event_type, EventType::ProfileUpdated);
    }

    #[tokio::test]
    async fn test_rename_rejects_blank() {
        let (service, _, user) = setup().await;
        let err = service.rename(&user, "   ").await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_missing_profile() {
        let (service, _, _) = setup().await;
        let stranger = AuthUser {
            id: AgentId::new_v4(),
            email: "x@sole.io".to_string(),
        };
        assert!(matches!(
            service.get(&stranger).await,
            Err(ServiceError::NotFound { .. })
        ));
    }
}
