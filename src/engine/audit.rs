use std::sync::Arc;

use crate::error::ServiceResult;
use crate::storage::Storage;
use crate::types::{AuthUser, EventType, LogEntry, MissionId};

/// Rows shown on the logs page.
pub const LOGS_PAGE_SIZE: usize = 50;

#[derive(Clone)]
pub struct AuditLog {
    storage: Arc<dyn Storage>,
}

impl AuditLog {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn record(
        &self,
        actor: &AuthUser,
        event_type: EventType,
        mission_id: Option<MissionId>,
        details: impl Into<String>,
    ) -> ServiceResult<LogEntry> {
        let entry = LogEntry::new(actor.email.clone(), event_type, mission_id, details);
        self.storage.append_log(&entry).await?;
        if entry.event_type.is_destructive() {
            log::info!("audit {} by {}", entry.event_type.as_str(), entry.agent_email);
        } else {
            log::debug!("audit {} by {}", entry.event_type.as_str(), entry.agent_email);
        }
        Ok(entry)
    }

    pub async fn recent(&self, limit: usize) -> ServiceResult<Vec<LogEntry>> {
        Ok(self.storage.recent_logs(limit).await?)
    }

    pub async fn count(&self) -> ServiceResult<usize> {
        Ok(self.storage.count_logs().await?)
    }
}
