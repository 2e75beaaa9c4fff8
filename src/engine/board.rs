//! Per-agent mission cache.
//!
//! Storage is the single source of truth. Reads are served from here until a
//! mutation calls [`MissionBoard::invalidate`]; a fetch that races with an
//! invalidation is returned to its caller but never cached.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::ServiceResult;
use crate::storage::Storage;
use crate::types::{AgentId, Mission};

#[derive(Default)]
struct Entry {
    generation: u64,
    missions: Option<Arc<Vec<Mission>>>,
}

#[derive(Clone)]
pub struct MissionBoard {
    storage: Arc<dyn Storage>,
    entries: Arc<RwLock<HashMap<AgentId, Entry>>>,
}

impl MissionBoard {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn list(&self, agent_id: AgentId) -> ServiceResult<Arc<Vec<Mission>>> {
        let generation = {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            match entries.get(&agent_id) {
                Some(Entry {
                    missions: Some(cached),
                    ..
                }) => return Ok(cached.clone()),
                Some(entry) => entry.generation,
                None => 0,
            }
        };

        let fresh = Arc::new(self.storage.list_missions(Some(agent_id)).await?);

        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let entry = entries.entry(agent_id).or_default();
        if entry.generation == generation {
            entry.missions = Some(fresh.clone());
        }
        Ok(fresh)
    }

    pub fn invalidate(&self, agent_id: AgentId) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let entry = entries.entry(agent_id).or_default();
        entry.generation += 1;
        entry.missions = None;
    }

    pub fn is_cached(&self, agent_id: AgentId) -> bool {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .get(&agent_id)
            .map(|e| e.missions.is_some())
            .unwrap_or(false)
    }
}
