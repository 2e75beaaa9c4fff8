use serde::{Deserialize, Serialize};

use crate::error::{ServiceError, ServiceResult};
use crate::types::{Mission, MissionStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionEvent {
    Start,
    Toggle,
    SubmitEvidence,
    ConfirmVerification,
}

impl MissionEvent {
    pub fn as_str(&self) -> &str {
        match self {
            MissionEvent::Start => "start",
            MissionEvent::Toggle => "toggle",
            MissionEvent::SubmitEvidence => "submit_evidence",
            MissionEvent::ConfirmVerification => "confirm_verification",
        }
    }
}

/// Outcome of applying an event to a mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: MissionStatus,
    pub to: MissionStatus,
}

impl Transition {
    /// Only entering `completed` pays out; leaving it never deducts.
    pub fn awards_credibility(&self) -> bool {
        self.to.is_completed() && !self.from.is_completed()
    }
}

pub struct MissionStateMachine;

impl MissionStateMachine {
    pub fn next(status: MissionStatus, event: MissionEvent) -> Option<MissionStatus> {
        let next = match (status, event) {
            (MissionStatus::Pending, MissionEvent::Start) => MissionStatus::Processing,

            (MissionStatus::Completed, MissionEvent::Toggle) => MissionStatus::Pending,
            (
                MissionStatus::Pending | MissionStatus::Processing | MissionStatus::Verifying,
                MissionEvent::Toggle,
            ) => MissionStatus::Completed,

            (
                MissionStatus::Pending | MissionStatus::Processing,
                MissionEvent::SubmitEvidence,
            ) => MissionStatus::Verifying,

            (MissionStatus::Verifying, MissionEvent::ConfirmVerification) => {
                MissionStatus::Completed
            }

            _ => return None,
        };
        Some(next)
    }

    pub fn transition(mission: &mut Mission, event: MissionEvent) -> ServiceResult<Transition> {
        let from = mission.status;
        let to = Self::next(from, event).ok_or_else(|| ServiceError::InvalidTransition {
            status: from,
            action: event.as_str().to_string(),
        })?;

        mission.status = to;
        Ok(Transition { from, to })
    }
}
