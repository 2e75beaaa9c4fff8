use serde::Serialize;

use crate::types::Mission;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_missions: usize,
    pub completed_missions: usize,
    pub log_count: usize,
    /// Percentage, rounded half up.
    pub completion_rate: u8,
}

impl DashboardStats {
    pub fn compute(missions: &[Mission], log_count: usize) -> Self {
        let total = missions.len();
        let completed = missions.iter().filter(|m| m.status.is_completed()).count();

        Self {
            total_missions: total,
            completed_missions: completed,
            log_count,
            completion_rate: completion_rate(completed, total),
        }
    }
}

pub fn completion_rate(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((200 * completed + total) / (2 * total)).min(100) as u8
}
