use serde::Serialize;
use std::sync::Arc;

use crate::engine::audit::AuditLog;
use crate::engine::board::MissionBoard;
use crate::error::{ServiceError, ServiceResult};
use crate::lifecycle::{MissionEvent, MissionStateMachine, Transition};
use crate::storage::Storage;
use crate::types::{
    AuthUser, EventType, Evidence, EvidenceDraft, Mission, MissionDraft, MissionId,
};

/// Result of a status change, with the new score when one was awarded.
#[derive(Debug, Clone, Serialize)]
pub struct MissionUpdate {
    pub mission: Mission,
    pub credibility_score: Option<u8>,
}

#[derive(Clone)]
pub struct MissionService {
    storage: Arc<dyn Storage>,
    board: MissionBoard,
    audit: AuditLog,
}

impl MissionService {
    pub fn new(storage: Arc<dyn Storage>, audit: AuditLog) -> Self {
        Self {
            board: MissionBoard::new(storage.clone()),
            storage,
            audit,
        }
    }

    pub fn board(&self) -> &MissionBoard {
        &self.board
    }

    /// The agent's missions, newest first.
    pub async fn list(&self, user: &AuthUser) -> ServiceResult<Arc<Vec<Mission>>> {
        self.board.list(user.id).await
    }

    pub async fn create(&self, user: &AuthUser, draft: MissionDraft) -> ServiceResult<Mission> {
        if draft.title.trim().is_empty() {
            return Err(ServiceError::Validation("mission title is required".to_string()));
        }

        let mission = Mission::new(user.id, draft);
        self.storage.create_mission(&mission).await?;
        self.board.invalidate(user.id);

        self.audit
            .record(
                user,
                EventType::MissionCreated,
                Some(mission.id),
                format!("Mission '{}' deployed", mission.title),
            )
            .await?;

        log::info!("agent {} created mission {}", user.email, mission.id);
        Ok(mission)
    }

    /// completed ⇄ pending; anything else not completed goes straight to completed.
    pub async fn toggle(&self, user: &AuthUser, id: MissionId) -> ServiceResult<MissionUpdate> {
        self.apply(user, id, MissionEvent::Toggle, EventType::StatusUpdated)
            .await
    }

    pub async fn start(&self, user: &AuthUser, id: MissionId) -> ServiceResult<MissionUpdate> {
        self.apply(user, id, MissionEvent::Start, EventType::StatusUpdated)
            .await
    }

    pub async fn confirm_verification(
        &self,
        user: &AuthUser,
        id: MissionId,
    ) -> ServiceResult<MissionUpdate> {
        self.apply(
            user,
            id,
            MissionEvent::ConfirmVerification,
            EventType::MissionVerified,
        )
        .await
    }

    pub async fn submit_evidence(
        &self,
        user: &AuthUser,
        id: MissionId,
        draft: EvidenceDraft,
    ) -> ServiceResult<(Mission, Evidence)> {
        draft.validate().map_err(ServiceError::Validation)?;

        let mut mission = self.owned(user, id).await?;
        MissionStateMachine::transition(&mut mission, MissionEvent::SubmitEvidence)?;

        // Status first: a failed status write must not leave an evidence row behind.
        self.storage.update_mission(&mission).await?;
        self.board.invalidate(user.id);

        let evidence = Evidence::new(mission.id, draft, user.email.clone());
        self.storage.create_evidence(&evidence).await?;

        self.audit
            .record(
                user,
                EventType::EvidenceSubmitted,
                Some(mission.id),
                format!("Evidence {} submitted for '{}'", evidence.evidence_url, mission.title),
            )
            .await?;

        Ok((mission, evidence))
    }

    pub async fn evidence(&self, user: &AuthUser, id: MissionId) -> ServiceResult<Vec<Evidence>> {
        let mission = self.owned(user, id).await?;
        Ok(self.storage.list_evidence(mission.id).await?)
    }

    /// Removes a mission. Nothing happens unless `confirmed` is set.
    pub async fn delete(
        &self,
        user: &AuthUser,
        id: MissionId,
        confirmed: bool,
    ) -> ServiceResult<Mission> {
        if !confirmed {
            return Err(ServiceError::ConfirmationRequired);
        }

        let mission = self.owned(user, id).await?;
        if !self.storage.delete_mission(mission.id).await? {
            return Err(ServiceError::not_found("mission", id));
        }
        self.board.invalidate(user.id);

        self.audit
            .record(
                user,
                EventType::MissionDeleted,
                Some(mission.id),
                format!("Mission '{}' permanently deleted", mission.title),
            )
            .await?;

        log::info!("agent {} deleted mission {}", user.email, mission.id);
        Ok(mission)
    }

    /// Missions owned by someone else are indistinguishable from missing ones.
    async fn owned(&self, user: &AuthUser, id: MissionId) -> ServiceResult<Mission> {
        match self.storage.get_mission(id).await? {
            Some(mission) if mission.is_owned_by(&user.id) => Ok(mission),
            _ => Err(ServiceError::not_found("mission", id)),
        }
    }

    async fn apply(
        &self,
        user: &AuthUser,
        id: MissionId,
        event: MissionEvent,
        event_type: EventType,
    ) -> ServiceResult<MissionUpdate> {
        let mut mission = self.owned(user, id).await?;
        let transition = MissionStateMachine::transition(&mut mission, event)?;

        self.storage.update_mission(&mission).await?;
        self.board.invalidate(user.id);

        self.audit
            .record(
                user,
                event_type,
                Some(mission.id),
                format!(
                    "Mission '{}' status {} -> {}",
                    mission.title,
                    transition.from.as_str(),
                    transition.to.as_str()
                ),
            )
            .await?;

        let credibility_score = self.award(user, &transition).await?;
        Ok(MissionUpdate {
            mission,
            credibility_score,
        })
    }

    /// Second, independent write after the status change. A failure here is
    /// reported; the status write is not rolled back.
    async fn award(&self, user: &AuthUser, transition: &Transition) -> ServiceResult<Option<u8>> {
        if !transition.awards_credibility() {
            return Ok(None);
        }

        let result = async {
            let mut profile = self
                .storage
                .get_profile(user.id)
                .await?
                .ok_or_else(|| ServiceError::not_found("profile", user.id))?;
            profile.credibility_score = profile.rewarded_score();
            self.storage.update_profile(&profile).await?;
            Ok::<u8, ServiceError>(profile.credibility_score)
        }
        .await;

        match result {
            Ok(score) => {
                log::info!("agent {} credibility now {}", user.email, score);
                Ok(Some(score))
            }
            Err(e) => {
                log::error!(
                    "mission status saved but credibility update failed for {}: {}",
                    user.email,
                    e
                );
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::InMemoryStore;
    use crate::types::{AgentId, MissionStatus, Profile};

    struct Fixture {
        service: MissionService,
        store: Arc<InMemoryStore>,
        user: AuthUser,
    }

    async fn setup() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let storage = store.clone() as Arc<dyn Storage>;
        let user = AuthUser {
            id: AgentId::new_v4(),
            email: "agent@sole.io".to_string(),
        };
        store.create_profile(&Profile::new(user.id)).await.unwrap();

        Fixture {
            service: MissionService::new(storage.clone(), AuditLog::new(storage)),
            store,
            user,
        }
    }

    fn draft(title: &str) -> MissionDraft {
        MissionDraft {
            title: title.to_string(),
            description: Some("brief".to_string()),
            rank: None,
        }
    }

    #[tokio::test]
    async fn test_create_requires_title() {
        let f = setup().await;
        let err = f.service.create(&f.user, draft("  ")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_list_sees_new_mission() {
        let f = setup().await;
        assert!(f.service.list(&f.user).await.unwrap().is_empty());

        f.service.create(&f.user, draft("Recon")).await.unwrap();
        let missions = f.service.list(&f.user).await.unwrap();
        assert_eq!(missions.len(), 1);
        assert_eq!(missions[0].status, MissionStatus::Pending);
    }

    #[tokio::test]
    async fn test_toggle_awards_and_reverts_without_deduction() {
        let f = setup().await;
        let mission = f.service.create(&f.user, draft("Recon")).await.unwrap();

        let done = f.service.toggle(&f.user, mission.id).await.unwrap();
        assert_eq!(done.mission.status, MissionStatus::Completed);
        assert_eq!(done.credibility_score, Some(60));

        let undone = f.service.toggle(&f.user, mission.id).await.unwrap();
        assert_eq!(undone.mission.status, MissionStatus::Pending);
        assert_eq!(undone.credibility_score, None);

        let profile = f.store.get_profile(f.user.id).await.unwrap().unwrap();
        assert_eq!(profile.credibility_score, 60);
    }

    #[tokio::test]
    async fn test_evidence_then_verification() {
        let f = setup().await;
        let mission = f.service.create(&f.user, draft("Audit")).await.unwrap();

        let (verifying, evidence) = f
            .service
            .submit_evidence(
                &f.user,
                mission.id,
                EvidenceDraft {
                    evidence_url: "https://github.com/sole/ops/pull/3".to_string(),
                    note: Some("see diff".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(verifying.status, MissionStatus::Verifying);
        assert_eq!(evidence.agent_email, "agent@sole.io");

        let confirmed = f
            .service
            .confirm_verification(&f.user, mission.id)
            .await
            .unwrap();
        assert_eq!(confirmed.mission.status, MissionStatus::Completed);
        assert_eq!(confirmed.credibility_score, Some(60));

        let stored = f.service.evidence(&f.user, mission.id).await.unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_evidence_changes_nothing() {
        let f = setup().await;
        let mission = f.service.create(&f.user, draft("Audit")).await.unwrap();

        let err = f
            .service
            .submit_evidence(
                &f.user,
                mission.id,
                EvidenceDraft {
                    evidence_url: "nope".to_string(),
                    note: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let stored = f.store.get_mission(mission.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MissionStatus::Pending);
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let f = setup().await;
        let mission = f.service.create(&f.user, draft("Burn")).await.unwrap();

        let err = f.service.delete(&f.user, mission.id, false).await.unwrap_err();
        assert!(matches!(err, ServiceError::ConfirmationRequired));
        assert!(f.store.get_mission(mission.id).await.unwrap().is_some());

        f.service.delete(&f.user, mission.id, true).await.unwrap();
        assert!(f.service.list(&f.user).await.unwrap().is_empty());

        let deletions = f
            .store
            .recent_logs(50)
            .await
            .unwrap()
            .into_iter()
            .filter(|l| l.event_type == EventType::MissionDeleted)
            .count();
        assert_eq!(deletions, 1);
    }

    #[tokio::test]
    async fn test_foreign_mission_is_not_found() {
        let f = setup().await;
        let mission = f.service.create(&f.user, draft("Mine")).await.unwrap();
        let intruder = AuthUser {
            id: AgentId::new_v4(),
            email: "intruder@sole.io".to_string(),
        };

        assert!(matches!(
            f.service.toggle(&intruder, mission.id).await,
            Err(ServiceError::NotFound { .. })
        ));
        assert!(matches!(
            f.service.delete(&intruder, mission.id, true).await,
            Err(ServiceError::NotFound { .. })
        ));
    }

    /// In-memory store whose mission updates always fail.
    struct ReadOnlyMissions(InMemoryStore);

    #[async_trait::async_trait]
    impl Storage for ReadOnlyMissions {
        async fn create_profile(&self, profile: &Profile) -> anyhow::Result<()> {
            self.0.create_profile(profile).await
        }
        async fn get_profile(&self, id: AgentId) -> anyhow::Result<Option<Profile>> {
            self.0.get_profile(id).await
        }
        async fn update_profile(&self, profile: &Profile) -> anyhow::Result<()> {
            self.0.update_profile(profile).await
        }
        async fn create_mission(&self, mission: &Mission) -> anyhow::Result<()> {
            self.0.create_mission(mission).await
        }
        async fn get_mission(&self, id: MissionId) -> anyhow::Result<Option<Mission>> {
            self.0.get_mission(id).await
        }
        async fn list_missions(&self, agent_id: Option<AgentId>) -> anyhow::Result<Vec<Mission>> {
            self.0.list_missions(agent_id).await
        }
        async fn update_mission(&self, _mission: &Mission) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("permission denied for table missions"))
        }
        async fn delete_mission(&self, id: MissionId) -> anyhow::Result<bool> {
            self.0.delete_mission(id).await
        }
        async fn create_evidence(&self, evidence: &Evidence) -> anyhow::Result<()> {
            self.0.create_evidence(evidence).await
        }
        async fn list_evidence(&self, mission_id: MissionId) -> anyhow::Result<Vec<Evidence>> {
            self.0.list_evidence(mission_id).await
        }
        async fn append_log(&self, entry: &crate::types::LogEntry) -> anyhow::Result<()> {
            self.0.append_log(entry).await
        }
        async fn recent_logs(&self, limit: usize) -> anyhow::Result<Vec<crate::types::LogEntry>> {
            self.0.recent_logs(limit).await
        }
        async fn count_logs(&self) -> anyhow::Result<usize> {
            self.0.count_logs().await
        }
    }

    #[tokio::test]
    async fn test_failed_status_write_stores_no_evidence() {
        let store = Arc::new(ReadOnlyMissions(InMemoryStore::new()));
        let storage = store.clone() as Arc<dyn Storage>;
        let service = MissionService::new(storage.clone(), AuditLog::new(storage));
        let user = AuthUser {
            id: AgentId::new_v4(),
            email: "agent@sole.io".to_string(),
        };

        let mission = service.create(&user, draft("Locked")).await.unwrap();
        let result = service
            .submit_evidence(
                &user,
                mission.id,
                EvidenceDraft {
                    evidence_url: "https://intel.sole.io/shot.png".to_string(),
                    note: None,
                },
            )
            .await;

        assert!(matches!(result, Err(ServiceError::Backend(_))));
        assert!(store.list_evidence(mission.id).await.unwrap().is_empty());
        let stored = store.get_mission(mission.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MissionStatus::Pending);
    }

    #[tokio::test]
    async fn test_missing_profile_surfaces_after_status_write() {
        let store = Arc::new(InMemoryStore::new());
        let storage = store.clone() as Arc<dyn Storage>;
        let service = MissionService::new(storage.clone(), AuditLog::new(storage));
        let user = AuthUser {
            id: AgentId::new_v4(),
            email: "ghost@sole.io".to_string(),
        };

        let mission = service.create(&user, draft("Orphan")).await.unwrap();
        assert!(service.toggle(&user, mission.id).await.is_err());

        let stored = store.get_mission(mission.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MissionStatus::Completed);
    }
}
