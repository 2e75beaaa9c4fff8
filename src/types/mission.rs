use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AgentId, MissionId, MissionStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub id: MissionId,
    pub agent_id: AgentId,
    pub title: String,
    pub description: Option<String>,
    pub rank: Option<String>,
    pub status: MissionStatus,
    pub created_at: DateTime<Utc>,
}

/// Fields an agent fills in when opening a new mission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MissionDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub rank: Option<String>,
}

impl Mission {
    pub fn new(agent_id: AgentId, draft: MissionDraft) -> Self {
        Self {
            id: MissionId::new_v4(),
            agent_id,
            title: draft.title.trim().to_string(),
            description: draft.description.filter(|d| !d.trim().is_empty()),
            rank: draft.rank.filter(|r| !r.trim().is_empty()),
            status: MissionStatus::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn is_owned_by(&self, agent_id: &AgentId) -> bool {
        &self.agent_id == agent_id
    }
}
