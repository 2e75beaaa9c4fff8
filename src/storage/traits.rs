use anyhow::Result;
use async_trait::async_trait;

use crate::types::{AgentId, Evidence, LogEntry, Mission, MissionId, Profile};

/// Row-level access to the backend tables.
///
/// Implementations only move rows; ownership checks, status rules and audit
/// logging live in the engine.
#[async_trait]
pub trait Storage: Send + Sync {
    // Profile operations
    async fn create_profile(&self, profile: &Profile) -> Result<()>;
    async fn get_profile(&self, id: AgentId) -> Result<Option<Profile>>;
    async fn update_profile(&self, profile: &Profile) -> Result<()>;

    // Mission operations
    async fn create_mission(&self, mission: &Mission) -> Result<()>;
    async fn get_mission(&self, id: MissionId) -> Result<Option<Mission>>;
    /// Newest first. `None` lists every agent's missions.
    async fn list_missions(&self, agent_id: Option<AgentId>) -> Result<Vec<Mission>>;
    async fn update_mission(&self, mission: &Mission) -> Result<()>;
    /// Returns whether a row was removed.
    async fn delete_mission(&self, id: MissionId) -> Result<bool>;

    // Evidence
    async fn create_evidence(&self, evidence: &Evidence) -> Result<()>;
    async fn list_evidence(&self, mission_id: MissionId) -> Result<Vec<Evidence>>;

    // Audit log (append-only)
    async fn append_log(&self, entry: &LogEntry) -> Result<()>;
    async fn recent_logs(&self, limit: usize) -> Result<Vec<LogEntry>>;
    async fn count_logs(&self) -> Result<usize>;
}
