pub mod audit;
pub mod evidence;
pub mod mission;
pub mod profile;
pub mod session;

pub use audit::LogEntry;
pub use evidence::{Evidence, EvidenceDraft};
pub use mission::{Mission, MissionDraft};
pub use profile::Profile;
pub use session::{AuthUser, Session};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type AgentId = Uuid;
pub type MissionId = Uuid;
pub type EvidenceId = Uuid;
pub type LogId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissionStatus {
    Pending,    // Created, not started
    Processing, // Being worked on
    Verifying,  // Evidence submitted, awaiting confirmation
    Completed,  // Done, credibility awarded
}

impl MissionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            MissionStatus::Pending => "pending",
            MissionStatus::Processing => "processing",
            MissionStatus::Verifying => "verifying",
            MissionStatus::Completed => "completed",
        }
    }

    /// Older rows were written with upper-case statuses, so matching ignores case.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "pending" => Some(MissionStatus::Pending),
            "processing" => Some(MissionStatus::Processing),
            "verifying" => Some(MissionStatus::Verifying),
            "completed" => Some(MissionStatus::Completed),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        *self == MissionStatus::Completed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    MissionCreated,
    StatusUpdated,
    EvidenceSubmitted,
    MissionVerified,
    MissionDeleted,
    ProfileUpdated,
    Custom(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            EventType::MissionCreated => "MISSION_CREATED",
            EventType::StatusUpdated => "STATUS_UPDATED",
            EventType::EvidenceSubmitted => "EVIDENCE_SUBMITTED",
            EventType::MissionVerified => "MISSION_VERIFIED",
            EventType::MissionDeleted => "MISSION_DELETED",
            EventType::ProfileUpdated => "PROFILE_UPDATED",
            EventType::Custom(other) => other,
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "MISSION_CREATED" => EventType::MissionCreated,
            "STATUS_UPDATED" => EventType::StatusUpdated,
            "EVIDENCE_SUBMITTED" => EventType::EvidenceSubmitted,
            "MISSION_VERIFIED" => EventType::MissionVerified,
            "MISSION_DELETED" => EventType::MissionDeleted,
            "PROFILE_UPDATED" => EventType::ProfileUpdated,
            other => EventType::Custom(other.to_string()),
        }
    }

    pub fn is_destructive(&self) -> bool {
        self.as_str().contains("DELETED")
    }
}

impl Serialize for EventType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(EventType::parse(&value))
    }
}
