use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::storage::traits::Storage;
use crate::types::{AgentId, Evidence, LogEntry, Mission, MissionId, Profile};

#[derive(Clone)]
pub struct InMemoryStore {
    profiles: Arc<RwLock<HashMap<AgentId, Profile>>>,
    missions: Arc<RwLock<Vec<Mission>>>,
    evidence: Arc<RwLock<Vec<Evidence>>>,
    logs: Arc<RwLock<Vec<LogEntry>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            profiles: Arc::new(RwLock::new(HashMap::new())),
            missions: Arc::new(RwLock::new(Vec::new())),
            evidence: Arc::new(RwLock::new(Vec::new())),
            logs: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn read<'a, T>(lock: &'a RwLock<T>, table: &str) -> Result<RwLockReadGuard<'a, T>> {
    lock.read()
        .map_err(|_| anyhow!("{} table lock poisoned", table))
}

fn write<'a, T>(lock: &'a RwLock<T>, table: &str) -> Result<RwLockWriteGuard<'a, T>> {
    lock.write()
        .map_err(|_| anyhow!("{} table lock poisoned", table))
}

/// Newest first; rows inserted later win ties on `created_at`.
fn newest_first<T: Clone>(
    rows: &[T],
    created_at: impl Fn(&T) -> chrono::DateTime<chrono::Utc>,
) -> Vec<T> {
    let mut sorted: Vec<T> = rows.iter().rev().cloned().collect();
    sorted.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    sorted
}

#[async_trait]
impl Storage for InMemoryStore {
    async fn create_profile(&self, profile: &Profile) -> Result<()> {
        let mut profiles = write(&self.profiles, "profiles")?;
        if profiles.contains_key(&profile.id) {
            return Err(anyhow!("duplicate key: profile {} already exists", profile.id));
        }
        profiles.insert(profile.id, profile.clone());
        Ok(())
    }

    async fn get_profile(&self, id: AgentId) -> Result<Option<Profile>> {
        let profiles = read(&self.profiles, "profiles")?;
        Ok(profiles.get(&id).cloned())
    }

    async fn update_profile(&self, profile: &Profile) -> Result<()> {
        let mut profiles = write(&self.profiles, "profiles")?;
        match profiles.get_mut(&profile.id) {
            Some(existing) => {
                *existing = profile.clone();
                Ok(())
            }
            None => Err(anyhow!("profile {} not found", profile.id)),
        }
    }

    async fn create_mission(&self, mission: &Mission) -> Result<()> {
        let mut missions = write(&self.missions, "missions")?;
        missions.push(mission.clone());
        Ok(())
    }

    async fn get_mission(&self, id: MissionId) -> Result<Option<Mission>> {
        let missions = read(&self.missions, "missions")?;
        Ok(missions.iter().find(|m| m.id == id).cloned())
    }

    async fn list_missions(&self, agent_id: Option<AgentId>) -> Result<Vec<Mission>> {
        let missions = read(&self.missions, "missions")?;
        let scoped: Vec<Mission> = missions
            .iter()
            .filter(|m| agent_id.map(|a| m.agent_id == a).unwrap_or(true))
            .cloned()
            .collect();
        Ok(newest_first(&scoped, |m| m.created_at))
    }

    async fn update_mission(&self, mission: &Mission) -> Result<()> {
        let mut missions = write(&self.missions, "missions")?;
        match missions.iter_mut().find(|m| m.id == mission.id) {
            Some(existing) => {
                *existing = mission.clone();
                Ok(())
            }
            None => Err(anyhow!("mission {} not found", mission.id)),
        }
    }

    async fn delete_mission(&self, id: MissionId) -> Result<bool> {
        let mut missions = write(&self.missions, "missions")?;
        let before = missions.len();
        missions.retain(|m| m.id != id);
        Ok(missions.len() != before)
    }

    async fn create_evidence(&self, evidence: &Evidence) -> Result<()> {
        let mut rows = write(&self.evidence, "evidences")?;
        rows.push(evidence.clone());
        Ok(())
    }

    async fn list_evidence(&self, mission_id: MissionId) -> Result<Vec<Evidence>> {
        let rows = read(&self.evidence, "evidences")?;
        let scoped: Vec<Evidence> = rows
            .iter()
            .filter(|e| e.mission_id == mission_id)
            .cloned()
            .collect();
        Ok(newest_first(&scoped, |e| e.created_at))
    }

    async fn append_log(&self, entry: &LogEntry) -> Result<()> {
        let mut logs = write(&self.logs, "logs")?;
        logs.push(entry.clone());
        Ok(())
    }

    async fn recent_logs(&self, limit: usize) -> Result<Vec<LogEntry>> {
        let logs = read(&self.logs, "logs")?;
        let mut recent = newest_first(&logs, |l| l.created_at);
        recent.truncate(limit);
        Ok(recent)
    }

    async fn count_logs(&self) -> Result<usize> {
        let logs = read(&self.logs, "logs")?;
        Ok(logs.len())
    }
}
