use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EventType, LogId, MissionId};

/// Append-only audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: LogId,
    pub agent_email: String,
    pub event_type: EventType,
    pub mission_id: Option<MissionId>,
    pub details: String,
    pub created_at: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(
        agent_email: impl Into<String>,
        event_type: EventType,
        mission_id: Option<MissionId>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            id: LogId::new_v4(),
            agent_email: agent_email.into(),
            event_type,
            mission_id,
            details: details.into(),
            created_at: Utc::now(),
        }
    }
}
