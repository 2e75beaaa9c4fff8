use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EvidenceId, MissionId};

pub const MAX_NOTE_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub id: EvidenceId,
    pub mission_id: MissionId,
    pub evidence_url: String,
    pub note: Option<String>,
    pub agent_email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvidenceDraft {
    pub evidence_url: String,
    #[serde(default)]
    pub note: Option<String>,
}

impl EvidenceDraft {
    /// Returns the user-facing reason the draft is rejected, if any.
    pub fn validate(&self) -> Result<(), String> {
        match reqwest::Url::parse(self.evidence_url.trim()) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
            _ => {
                return Err(
                    "evidence link must be a valid URL (e.g. a pull request or document link)"
                        .to_string(),
                )
            }
        }

        if let Some(note) = &self.note {
            if note.chars().count() > MAX_NOTE_CHARS {
                return Err(format!("note must not exceed {} characters", MAX_NOTE_CHARS));
            }
        }

        Ok(())
    }
}

impl Evidence {
    pub fn new(mission_id: MissionId, draft: EvidenceDraft, agent_email: String) -> Self {
        Self {
            id: EvidenceId::new_v4(),
            mission_id,
            evidence_url: draft.evidence_url.trim().to_string(),
            note: draft.note.filter(|n| !n.trim().is_empty()),
            agent_email,
            created_at: Utc::now(),
        }
    }
}
